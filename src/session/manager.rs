use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::engine::{EngineError, EngineResult};
use crate::models::{OltDevice, ScanOrigin};
use crate::utils::{ssh_connect, ssh_exec};

use super::{parse_autofind, DeviceSession, ScanResult, SimulatedScanner, AUTOFIND_COMMAND};

type SharedSession = Arc<Mutex<ssh2::Session>>;

/// Keeps one authenticated SSH session per connected device
pub struct SessionManager {
    sessions: Mutex<HashMap<String, SharedSession>>,
    timeout_secs: u64,
    simulate_scan: bool,
    scanner: SimulatedScanner,
}

impl SessionManager {
    pub fn new(timeout_secs: u64, simulate_scan: bool) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout_secs,
            simulate_scan,
            scanner: SimulatedScanner::default(),
        }
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, SharedSession>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn get(&self, device_id: &str) -> Option<SharedSession> {
        self.sessions().get(device_id).cloned()
    }

    /// Log in to the device, replacing any previous session
    pub async fn connect(&self, device: &OltDevice) -> EngineResult<()> {
        let host = device.ip.clone();
        let port = device.ssh_port;
        let user = device.username.clone();
        let pass = device.password.clone();
        let timeout = self.timeout_secs;

        let session = tokio::task::spawn_blocking(move || ssh_connect(&host, port, &user, &pass, timeout))
            .await
            .map_err(|e| EngineError::Device(format!("Task join error: {}", e)))?
            .map_err(EngineError::Device)?;

        self.sessions()
            .insert(device.id.clone(), Arc::new(Mutex::new(session)));
        tracing::info!("Connected to device {} ({}:{})", device.name, device.ip, device.ssh_port);
        Ok(())
    }

    /// Drop the device's session; returns false if it had none
    pub fn disconnect(&self, device_id: &str) -> bool {
        let removed = self.sessions().remove(device_id);
        if let Some(session) = &removed {
            // A command still running holds the lock; the session then closes
            // when that command drops the last reference
            match session.try_lock() {
                Ok(session) => {
                    let _ = session.disconnect(None, "bye", None);
                }
                Err(_) => tracing::debug!("Session of {} busy, closing after the running command", device_id),
            }
            tracing::info!("Disconnected from device {}", device_id);
        }
        removed.is_some()
    }

    pub fn connected_devices(&self) -> Vec<String> {
        self.sessions().keys().cloned().collect()
    }
}

#[async_trait]
impl DeviceSession for SessionManager {
    async fn is_connected(&self, device_id: &str) -> bool {
        self.get(device_id).is_some()
    }

    async fn scan(&self, device: &OltDevice) -> EngineResult<ScanResult> {
        if self.is_connected(&device.id).await {
            let output = self.send_command(&device.id, AUTOFIND_COMMAND).await?;
            let onts = parse_autofind(&output);
            tracing::info!("Live scan of {} found {} ONT(s)", device.name, onts.len());
            return Ok(ScanResult {
                origin: ScanOrigin::Live,
                onts,
            });
        }
        if !self.simulate_scan {
            return Err(EngineError::NotConnected(device.id.clone()));
        }
        let onts = self.scanner.scan();
        tracing::info!("Simulated scan of {} produced {} ONT(s)", device.name, onts.len());
        Ok(ScanResult {
            origin: ScanOrigin::Simulated,
            onts,
        })
    }

    async fn send_command(&self, device_id: &str, command: &str) -> EngineResult<String> {
        let session = self
            .get(device_id)
            .ok_or_else(|| EngineError::NotConnected(device_id.to_string()))?;
        let command = command.to_string();

        tokio::task::spawn_blocking(move || {
            let session = session
                .lock()
                .map_err(|_| "SSH session lock poisoned".to_string())?;
            ssh_exec(&session, &command)
        })
        .await
        .map_err(|e| EngineError::Device(format!("Task join error: {}", e)))?
        .map_err(EngineError::Device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::device;
    use crate::models::PonTechnology;

    #[tokio::test]
    async fn test_disconnected_device_uses_simulation() {
        let manager = SessionManager::new(1, true);
        let dev = device("olt-1", PonTechnology::Gpon);
        assert!(!manager.is_connected("olt-1").await);
        let result = manager.scan(&dev).await.unwrap();
        assert_eq!(result.origin, ScanOrigin::Simulated);
        assert!((3..=5).contains(&result.onts.len()));
    }

    #[tokio::test]
    async fn test_disconnected_device_without_simulation() {
        let manager = SessionManager::new(1, false);
        let dev = device("olt-1", PonTechnology::Gpon);
        let err = manager.scan(&dev).await.unwrap_err();
        assert!(matches!(err, EngineError::NotConnected(_)));
    }

    #[tokio::test]
    async fn test_send_command_requires_session() {
        let manager = SessionManager::new(1, true);
        let err = manager.send_command("olt-1", "display version").await.unwrap_err();
        assert!(matches!(err, EngineError::NotConnected(_)));
        assert!(!manager.disconnect("olt-1"));
    }

    #[tokio::test]
    async fn test_disconnect_does_not_wait_for_busy_session() {
        let manager = SessionManager::new(1, true);
        let session: SharedSession = Arc::new(Mutex::new(tokio_test::assert_ok!(ssh2::Session::new())));
        manager.sessions().insert("olt-1".into(), session.clone());

        let _running = session.lock().unwrap();
        assert!(manager.disconnect("olt-1"));
        assert!(!manager.is_connected("olt-1").await);
    }

    #[tokio::test]
    async fn test_connect_failure_is_device_error() {
        let manager = SessionManager::new(1, true);
        let mut dev = device("olt-1", PonTechnology::Gpon);
        dev.ip = "127.0.0.1".into();
        dev.ssh_port = 1;
        let err = tokio_test::assert_err!(manager.connect(&dev).await);
        assert!(matches!(err, EngineError::Device(_)));
        assert!(manager.connected_devices().is_empty());
    }
}
