use async_trait::async_trait;

use crate::models::{CommandLogEntry, OntRecord, RegistrationRequest};

use super::EngineResult;

/// Registered-ONT inventory of each device.
///
/// `create_ont` must fail with `EngineError::Conflict` instead of storing a
/// second record with the same serial or the same id on the same port.
#[async_trait]
pub trait Inventory: Send + Sync {
    async fn list_onts(&self, device_id: &str) -> EngineResult<Vec<OntRecord>>;

    async fn create_ont(&self, req: &RegistrationRequest) -> EngineResult<OntRecord>;

    async fn delete_ont(&self, id: &str) -> EngineResult<()>;
}

/// Append-only command transcript of each device
#[async_trait]
pub trait CommandLogStore: Send + Sync {
    async fn append_log(&self, entry: &CommandLogEntry) -> EngineResult<()>;

    /// Entries of one device, oldest first
    async fn list_logs(&self, device_id: &str) -> EngineResult<Vec<CommandLogEntry>>;

    async fn clear_logs(&self, device_id: &str) -> EngineResult<u64>;
}
