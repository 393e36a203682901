//! Device-session collaborator: SSH logins kept per OLT, command execution
//! and ONT discovery scans.

mod autofind;
mod manager;
mod simulated;

pub use autofind::{parse_autofind, AUTOFIND_COMMAND};
pub use manager::SessionManager;
pub use simulated::SimulatedScanner;

use async_trait::async_trait;

use crate::engine::EngineResult;
use crate::models::{OltDevice, ScanOrigin, ScannedOnt};

/// Terminals reported by one scan and where they came from
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub origin: ScanOrigin,
    pub onts: Vec<ScannedOnt>,
}

/// What the engine needs from a device connection
#[async_trait]
pub trait DeviceSession: Send + Sync {
    async fn is_connected(&self, device_id: &str) -> bool;

    /// Live scan when connected, otherwise a simulated one if enabled
    async fn scan(&self, device: &OltDevice) -> EngineResult<ScanResult>;

    /// Raw device output of one command
    async fn send_command(&self, device_id: &str, command: &str) -> EngineResult<String>;
}
