use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::engine::inventory::Inventory;
use crate::engine::reconciler::{promote, PromotionOutcome, ScanSession};
use crate::models::*;
use crate::session::DeviceSession;
use crate::AppState;

use super::ApiError;

fn scan_response(session: &ScanSession) -> ScanResponse {
    let onts = session.pending();
    ScanResponse {
        device_id: session.device_id.clone(),
        origin: session.origin,
        detected_count: onts.len(),
        already_registered: session.already_registered,
        onts,
    }
}

/// Scan the device for unregistered ONTs, replacing the previous scan
pub async fn scan_device(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<ScanResponse>, ApiError> {
    let device = state.store.require_device(&device_id).await?;
    let result = state.sessions.scan(&device).await?;
    let inventory = state.store.list_onts(&device_id).await?;

    let session = ScanSession::reconcile(
        &device_id,
        result.origin,
        result.onts,
        &inventory,
        device.pon_technology.ont_id_ceiling(),
    );
    let response = scan_response(&session);

    state
        .scans
        .write()
        .await
        .insert(device_id.clone(), Arc::new(Mutex::new(session)));

    state
        .ws_hub
        .broadcast_scan_completed(&device_id, response.origin, response.detected_count)
        .await;
    Ok(Json(response))
}

/// Detections of the latest scan still awaiting registration
pub async fn list_detected(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<ScanResponse>, ApiError> {
    state.store.require_device(&device_id).await?;
    let session = state
        .scan_session(&device_id)
        .await
        .ok_or_else(|| ApiError::not_found("scan for this device"))?;
    let session = session.lock().await;
    Ok(Json(scan_response(&session)))
}

/// Confirm a detected ONT and register it.
/// A rejection is a warning: it is returned with 200 and the scan stays usable.
pub async fn confirm_detected(
    State(state): State<Arc<AppState>>,
    Path((device_id, serial)): Path<(String, String)>,
    Json(req): Json<PromoteOntRequest>,
) -> Result<Json<PromotionOutcome>, ApiError> {
    let device = state.store.require_device(&device_id).await?;
    let session = state
        .scan_session(&device_id)
        .await
        .ok_or_else(|| ApiError::not_found("scan for this device"))?;

    let mut session = session.lock().await;
    let outcome = promote(&mut session, &state.store, &device, &serial, &req).await?;

    if let PromotionOutcome::Registered { ont } = &outcome {
        state.ws_hub.broadcast_ont_registered(ont).await;
    }
    Ok(Json(outcome))
}
