use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::engine::allocator::AddressPools;
use crate::engine::inventory::Inventory;
use crate::engine::registration::request_from_form;
use crate::models::*;
use crate::AppState;

use super::{created, ApiError};

/// List the registered ONTs of a device
pub async fn list_onts(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<Vec<OntRecord>>, ApiError> {
    state.store.require_device(&device_id).await?;
    Ok(Json(state.store.list_onts(&device_id).await?))
}

/// Register an ONT from the operator's form
pub async fn create_ont(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    Json(req): Json<CreateOntRequest>,
) -> Result<(StatusCode, Json<OntRecord>), ApiError> {
    let device = state.store.require_device(&device_id).await?;
    let inventory = state.store.list_onts(&device_id).await?;

    let registration = request_from_form(&device, &inventory, &req)?;
    let ont = state.store.create_ont(&registration).await?;

    tracing::info!(
        "Registered ONT {} on {} port {} as ONT {}",
        ont.serial_number,
        device.name,
        ont.address,
        ont.ont_id
    );
    state.ws_hub.broadcast_ont_registered(&ont).await;
    Ok(created(ont))
}

#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    pub frame: i64,
    pub board: i64,
    pub port: i64,
}

/// Report the id pool of one port: next free id and a preview of free ids
pub async fn next_ont_id(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    Query(query): Query<AddressQuery>,
) -> Result<Json<NextIdResponse>, ApiError> {
    let address = TopologyAddress::validate(query.frame, query.board, query.port)?;
    let device = state.store.require_device(&device_id).await?;
    let inventory = state.store.list_onts(&device_id).await?;

    let report = AddressPools::from_records(&inventory).report(address, device.pon_technology.ont_id_ceiling());
    if report.next_ont_id.is_none() {
        tracing::warn!("Port {} on {} has no free ONT ID", address, device.name);
    }
    Ok(Json(report))
}

/// Move a record to another lifecycle status
pub async fn update_ont_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateOntStatusRequest>,
) -> Result<Json<OntRecord>, ApiError> {
    let ont = state.store.update_ont_status(&id, req.status).await?;
    Ok(Json(ont))
}

/// Remove a registered ONT, freeing its id
pub async fn delete_ont(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    state.store.delete_ont(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
