mod command_logs;
mod devices;
mod onts;
pub(crate) mod row_helpers;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use crate::engine::inventory::{CommandLogStore, Inventory};
use crate::engine::{EngineError, EngineResult};
use crate::models::*;

/// Typed error for "resource not found", downcast
/// in the API error handler.
#[derive(Debug)]
pub struct NotFoundError {
    pub resource: &'static str,
    pub id: String,
}

impl NotFoundError {
    pub fn new(resource: &'static str, id: &str) -> Self {
        Self {
            resource,
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} not found: {}", self.resource, self.id)
    }
}

impl std::error::Error for NotFoundError {}

/// Typed error for a write rejected by a unique index
#[derive(Debug)]
pub struct ConflictError {
    pub message: String,
}

impl ConflictError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConflictError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ConflictError {}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Lift a repo error into the engine taxonomy
fn engine_error(err: anyhow::Error) -> EngineError {
    if let Some(nf) = err.downcast_ref::<NotFoundError>() {
        return EngineError::not_found(nf.resource, nf.id.clone());
    }
    if let Some(conflict) = err.downcast_ref::<ConflictError>() {
        return EngineError::Conflict(conflict.message.clone());
    }
    EngineError::Store(err)
}

/// Store handles all database operations, delegating to per-entity repo modules.
#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Create a new database store with configurable pool size
    pub async fn new(db_path: &str) -> Result<Self> {
        Self::with_pool_size(db_path, 5).await
    }

    /// Create a new database store with a specific pool size
    pub async fn with_pool_size(db_path: &str, max_connections: u32) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    // ========== Device Operations ==========

    pub async fn list_devices(&self) -> Result<Vec<OltDevice>> {
        devices::DeviceRepo::list(&self.pool).await
    }

    pub async fn get_device(&self, id: &str) -> Result<Option<OltDevice>> {
        devices::DeviceRepo::get(&self.pool, id).await
    }

    /// Like `get_device`, but a missing device is a `NotFoundError`
    pub async fn require_device(&self, id: &str) -> Result<OltDevice> {
        self.get_device(id)
            .await?
            .ok_or_else(|| NotFoundError::new("Device", id).into())
    }

    pub async fn create_device(&self, req: &CreateDeviceRequest) -> Result<OltDevice> {
        devices::DeviceRepo::create(&self.pool, req).await
    }

    pub async fn update_device(&self, id: &str, req: &CreateDeviceRequest) -> Result<OltDevice> {
        devices::DeviceRepo::update(&self.pool, id, req).await
    }

    pub async fn delete_device(&self, id: &str) -> Result<()> {
        devices::DeviceRepo::delete(&self.pool, id).await
    }

    pub async fn update_device_last_connected(&self, id: &str) -> Result<()> {
        devices::DeviceRepo::update_last_connected(&self.pool, id).await
    }

    // ========== ONT Operations ==========

    pub async fn list_device_onts(&self, device_id: &str) -> Result<Vec<OntRecord>> {
        onts::OntRepo::list_by_device(&self.pool, device_id).await
    }

    pub async fn insert_ont(&self, req: &RegistrationRequest) -> Result<OntRecord> {
        onts::OntRepo::create(&self.pool, req).await
    }

    pub async fn update_ont_status(&self, id: &str, status: OntStatus) -> Result<OntRecord> {
        onts::OntRepo::update_status(&self.pool, id, status).await
    }

    pub async fn remove_ont(&self, id: &str) -> Result<()> {
        onts::OntRepo::delete(&self.pool, id).await
    }

    // ========== Command Log Operations ==========

    pub async fn insert_command_log(&self, entry: &CommandLogEntry) -> Result<()> {
        command_logs::CommandLogRepo::append(&self.pool, entry).await
    }

    pub async fn list_command_logs(&self, device_id: &str) -> Result<Vec<CommandLogEntry>> {
        command_logs::CommandLogRepo::list_by_device(&self.pool, device_id).await
    }

    pub async fn clear_command_logs(&self, device_id: &str) -> Result<u64> {
        command_logs::CommandLogRepo::clear(&self.pool, device_id).await
    }
}

#[async_trait]
impl Inventory for Store {
    async fn list_onts(&self, device_id: &str) -> EngineResult<Vec<OntRecord>> {
        self.list_device_onts(device_id).await.map_err(engine_error)
    }

    async fn create_ont(&self, req: &RegistrationRequest) -> EngineResult<OntRecord> {
        self.insert_ont(req).await.map_err(engine_error)
    }

    async fn delete_ont(&self, id: &str) -> EngineResult<()> {
        self.remove_ont(id).await.map_err(engine_error)
    }
}

#[async_trait]
impl CommandLogStore for Store {
    async fn append_log(&self, entry: &CommandLogEntry) -> EngineResult<()> {
        self.insert_command_log(entry).await.map_err(engine_error)
    }

    async fn list_logs(&self, device_id: &str) -> EngineResult<Vec<CommandLogEntry>> {
        self.list_command_logs(device_id).await.map_err(engine_error)
    }

    async fn clear_logs(&self, device_id: &str) -> EngineResult<u64> {
        self.clear_command_logs(device_id).await.map_err(engine_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::registration::request_from_form;
    use chrono::Utc;

    async fn store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ont-console.db");
        let store = Store::new(path.to_str().unwrap()).await.unwrap();
        (dir, store)
    }

    fn device_request(name: &str) -> CreateDeviceRequest {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "ip": "192.0.2.10",
            "username": "admin",
            "password": "secret",
        }))
        .unwrap()
    }

    fn registration(device_id: &str, address: TopologyAddress, ont_id: u32, serial: &str) -> RegistrationRequest {
        RegistrationRequest {
            device_id: device_id.to_string(),
            address,
            ont_id,
            serial_number: serial.to_string(),
            bindings: vec![
                ServiceBinding { gem_port: 1, vlan: 41, order: 0 },
                ServiceBinding { gem_port: 2, vlan: 42, order: 1 },
            ],
            description: Some("unit 7".into()),
            registration_code: "0-1-3-0".into(),
        }
    }

    #[tokio::test]
    async fn test_device_defaults_and_password_hidden() {
        let (_dir, store) = store().await;
        let device = store.create_device(&device_request("olt-north")).await.unwrap();
        assert_eq!(device.ssh_port, 22);
        assert_eq!(device.pon_technology, PonTechnology::Gpon);
        assert_eq!(device.registration_rule, DEFAULT_REGISTRATION_RULE);
        assert_eq!(device.password, "secret");

        let json = serde_json::to_value(&device).unwrap();
        assert!(json.get("password").is_none());
    }

    #[tokio::test]
    async fn test_ont_round_trip_keeps_binding_order() {
        let (_dir, store) = store().await;
        let device = store.create_device(&device_request("olt-north")).await.unwrap();
        let addr = TopologyAddress::new(0, 1, 3);

        let created = store.create_ont(&registration(&device.id, addr, 0, "HWTC0001")).await.unwrap();
        assert_eq!(created.status, OntStatus::Registering);

        let listed = store.list_onts(&device.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].address, addr);
        assert_eq!(listed[0].bindings.iter().map(|b| b.vlan).collect::<Vec<_>>(), vec![41, 42]);
        assert_eq!(listed[0].description.as_deref(), Some("unit 7"));

        let updated = store.update_ont_status(&created.id, OntStatus::Active).await.unwrap();
        assert_eq!(updated.status, OntStatus::Active);
    }

    #[tokio::test]
    async fn test_unique_indexes_raise_conflict() {
        let (_dir, store) = store().await;
        let device = store.create_device(&device_request("olt-north")).await.unwrap();
        let addr = TopologyAddress::new(0, 1, 3);
        store.create_ont(&registration(&device.id, addr, 0, "HWTC0001")).await.unwrap();

        let same_id = store.create_ont(&registration(&device.id, addr, 0, "HWTC0002")).await;
        assert!(matches!(same_id, Err(EngineError::Conflict(_))));

        let same_serial = store
            .create_ont(&registration(&device.id, TopologyAddress::new(0, 1, 4), 0, "HWTC0001"))
            .await;
        assert!(matches!(same_serial, Err(EngineError::Conflict(_))));

        // Same id on another port is fine
        store
            .create_ont(&registration(&device.id, TopologyAddress::new(0, 1, 4), 0, "HWTC0003"))
            .await
            .unwrap();
        assert_eq!(store.list_onts(&device.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_form_registration_against_store() {
        let (_dir, store) = store().await;
        let device = store.create_device(&device_request("olt-north")).await.unwrap();
        let addr = TopologyAddress::new(0, 1, 3);
        for (id, serial) in [(0, "HWTC0000"), (1, "HWTC0001"), (2, "HWTC0002"), (4, "HWTC0004")] {
            store.create_ont(&registration(&device.id, addr, id, serial)).await.unwrap();
        }

        let form: CreateOntRequest = serde_json::from_value(serde_json::json!({
            "address": {"frame": 0, "board": 1, "port": 3},
            "serial_number": "hwtc0009",
            "gem_ports": "1,2",
            "vlans": [41, 42],
        }))
        .unwrap();
        let inventory = store.list_onts(&device.id).await.unwrap();
        let req = request_from_form(&device, &inventory, &form).unwrap();
        let ont = store.create_ont(&req).await.unwrap();
        assert_eq!(ont.ont_id, 3);
        assert_eq!(ont.registration_code, "0-1-3-3");
    }

    #[tokio::test]
    async fn test_missing_rows_are_not_found() {
        let (_dir, store) = store().await;
        assert!(matches!(store.delete_ont("nope").await, Err(EngineError::NotFound { .. })));
        let err = tokio_test::assert_err!(store.delete_device("nope").await);
        assert!(err.downcast_ref::<NotFoundError>().is_some());
    }

    #[tokio::test]
    async fn test_logs_append_in_order_and_cascade() {
        let (_dir, store) = store().await;
        let device = store.create_device(&device_request("olt-north")).await.unwrap();
        for (i, command) in ["display version", "display board 0", "display version"].iter().enumerate() {
            let entry = CommandLogEntry {
                id: format!("log-{}", i),
                device_id: device.id.clone(),
                command: command.to_string(),
                response: String::new(),
                status: CommandStatus::Success,
                timestamp: Utc::now(),
            };
            store.append_log(&entry).await.unwrap();
            assert_eq!(store.list_logs(&device.id).await.unwrap().len(), i + 1);
        }
        let ids: Vec<_> = store.list_logs(&device.id).await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["log-0", "log-1", "log-2"]);

        store
            .create_ont(&registration(&device.id, TopologyAddress::new(0, 1, 3), 0, "HWTC0001"))
            .await
            .unwrap();
        tokio_test::assert_ok!(store.delete_device(&device.id).await);
        assert!(store.list_logs(&device.id).await.unwrap().is_empty());
        assert!(store.list_onts(&device.id).await.unwrap().is_empty());
    }
}
