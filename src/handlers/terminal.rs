use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::inventory::CommandLogStore;
use crate::engine::session_log::{ordered, render_transcript, submit, CommandHistory};
use crate::models::*;
use crate::AppState;

use super::{ApiError, MessageResponse};

/// Send one line to the device; the response is always a log entry
pub async fn send_command(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    Json(req): Json<SendCommandRequest>,
) -> Result<Json<CommandLogEntry>, ApiError> {
    state.store.require_device(&device_id).await?;
    let entry = submit(state.sessions.as_ref(), &state.store, &device_id, &req.command).await?;

    state
        .histories
        .lock()
        .await
        .entry(device_id)
        .or_default()
        .record(&entry.command);

    state.ws_hub.broadcast_command(&entry).await;
    Ok(Json(entry))
}

/// Recall the previous (older) command
pub async fn history_back(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<HistoryRecall>, ApiError> {
    state.store.require_device(&device_id).await?;
    let mut histories = state.histories.lock().await;
    Ok(Json(recall(&mut histories, &device_id, CommandHistory::back)))
}

/// Recall the next (newer) command, or an empty buffer past the newest
pub async fn history_forward(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<HistoryRecall>, ApiError> {
    state.store.require_device(&device_id).await?;
    let mut histories = state.histories.lock().await;
    Ok(Json(recall(&mut histories, &device_id, CommandHistory::forward)))
}

/// Move the cursor of an existing history; devices without one get an empty
/// buffer and no entry is created for them
fn recall(
    histories: &mut HashMap<String, CommandHistory>,
    device_id: &str,
    step: fn(&mut CommandHistory) -> HistoryRecall,
) -> HistoryRecall {
    histories.get_mut(device_id).map_or_else(HistoryRecall::empty, step)
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<usize>,
    #[serde(default)]
    pub order: LogOrder,
}

/// List a device's command log, newest first unless `order=storage`
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<CommandLogEntry>>, ApiError> {
    state.store.require_device(&device_id).await?;
    let entries = state.store.list_logs(&device_id).await?;
    let limit = query.limit.unwrap_or(state.config.log_limit).clamp(1, 1000);
    Ok(Json(ordered(entries, query.order, Some(limit))))
}

/// Download the full transcript as plain text
pub async fn export_logs(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let device = state.store.require_device(&device_id).await?;
    let entries = state.store.list_logs(&device_id).await?;
    let filename = format!(
        "attachment; filename=\"{}-commands-{}.txt\"",
        device.name.replace(|c: char| !c.is_ascii_alphanumeric() && c != '-', "_"),
        chrono::Utc::now().format("%Y%m%d%H%M%S")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        render_transcript(&entries),
    ))
}

/// Clear a device's command log
pub async fn clear_logs(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.store.require_device(&device_id).await?;
    let removed = state.store.clear_logs(&device_id).await?;
    tracing::info!("Cleared {} command log entries for {}", removed, device_id);
    Ok(MessageResponse::new(format!("{} entries removed", removed)))
}
