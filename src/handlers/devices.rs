use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::engine::pairing::pair;
use crate::models::*;
use crate::utils::{is_valid_hostname, is_valid_ipv4};
use crate::AppState;

use super::{created, ApiError};

/// Reject device forms the console could not use later
fn validate_device(req: &CreateDeviceRequest) -> Result<(), ApiError> {
    if req.name.trim().is_empty() || req.ip.is_empty() || req.username.is_empty() {
        return Err(ApiError::bad_request("name, ip, and username are required"));
    }
    if !is_valid_ipv4(&req.ip) && !is_valid_hostname(&req.ip) {
        return Err(ApiError::bad_request("ip must be an IPv4 address or hostname"));
    }
    if req.registration_rule.trim().is_empty() {
        return Err(ApiError::bad_request("registration_rule must not be empty"));
    }
    // Defaults are used verbatim when promoting detected ONTs
    pair(
        &ServiceList::Text(req.default_gem_ports.clone()),
        &ServiceList::Text(req.default_vlans.clone()),
    )?;
    Ok(())
}

/// List all devices
pub async fn list_devices(State(state): State<Arc<AppState>>) -> Result<Json<Vec<OltDevice>>, ApiError> {
    Ok(Json(state.store.list_devices().await?))
}

/// Get a single device
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OltDevice>, ApiError> {
    let device = state
        .store
        .get_device(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("device"))?;
    Ok(Json(device))
}

/// Create a new device
pub async fn create_device(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDeviceRequest>,
) -> Result<(StatusCode, Json<OltDevice>), ApiError> {
    validate_device(&req)?;
    let device = state.store.create_device(&req).await?;
    tracing::info!("Created device {} ({})", device.name, device.id);
    Ok(created(device))
}

/// Replace an existing device's settings
pub async fn update_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateDeviceRequest>,
) -> Result<Json<OltDevice>, ApiError> {
    validate_device(&req)?;
    let device = state.store.update_device(&id, &req).await?;
    Ok(Json(device))
}

/// Delete a device with its ONTs and command logs
pub async fn delete_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_device(&id).await?;
    state.sessions.disconnect(&id);
    state.forget_device(&id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Open an SSH session to the device
pub async fn connect_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConnectResult>, ApiError> {
    let device = state.store.require_device(&id).await?;

    let result = match state.sessions.connect(&device).await {
        Ok(()) => {
            if let Err(e) = state.store.update_device_last_connected(&id).await {
                tracing::warn!("Failed to record connect time for {}: {}", id, e);
            }
            ConnectResult {
                success: true,
                message: format!("Connected to {}", device.name),
            }
        }
        Err(e) => {
            tracing::warn!("Connect to {} failed: {}", device.name, e);
            ConnectResult {
                success: false,
                message: e.to_string(),
            }
        }
    };

    state
        .ws_hub
        .broadcast_connection(&id, result.success, &result.message)
        .await;
    Ok(Json(result))
}

/// Close the device's SSH session
pub async fn disconnect_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConnectResult>, ApiError> {
    let device = state.store.require_device(&id).await?;
    let was_connected = state.sessions.disconnect(&id);
    let message = if was_connected {
        format!("Disconnected from {}", device.name)
    } else {
        format!("{} was not connected", device.name)
    };
    state.ws_hub.broadcast_connection(&id, false, &message).await;
    Ok(Json(ConnectResult {
        success: true,
        message,
    }))
}

/// Report whether the device has a live session
pub async fn device_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConnectionStatus>, ApiError> {
    use crate::session::DeviceSession;

    state.store.require_device(&id).await?;
    let is_connected = state.sessions.is_connected(&id).await;
    Ok(Json(ConnectionStatus {
        device_id: id,
        is_connected,
    }))
}
