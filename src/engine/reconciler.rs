//! Reconciliation of scanned terminals against the registered inventory.
//!
//! A scan only fills a [`ScanSession`]; it never touches the inventory.
//! Each detected serial then moves through [`DetectionState`]:
//!
//! ```text
//! Detected --confirm--> Confirmed --commit--> Registered   (removed from the session)
//!                                   \------> Rejected     (warning, inventory unchanged)
//! ```
//!
//! The commit step re-reads the inventory before creating anything, so a
//! terminal registered meanwhile by someone else is rejected rather than
//! duplicated.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::models::{
    DetectedOnt, OltDevice, OntRecord, PromoteOntRequest, ScanOrigin, ScannedOnt, ServiceBinding, ServiceList,
};

use super::allocator::{AddressPools, AllocationMode};
use super::inventory::Inventory;
use super::pairing::pair;
use super::registration::{checked_description, compose, RegistrationInput};
use super::{EngineError, EngineResult};
use crate::utils::normalize_serial;

/// Why a confirmed detection did not become a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    AlreadyRegistered,
    PoolExhausted,
}

/// Per-serial state within one scan session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionState {
    Detected,
    Confirmed {
        description: Option<String>,
        bindings: Vec<ServiceBinding>,
    },
    Registered {
        record_id: String,
    },
    Rejected {
        reason: RejectReason,
    },
}

#[derive(Debug, Clone)]
pub struct DetectionEntry {
    pub detected: DetectedOnt,
    pub state: DetectionState,
}

/// Result of committing a confirmed detection
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PromotionOutcome {
    Registered { ont: OntRecord },
    Rejected { serial_number: String, reason: RejectReason },
}

/// Detections of one scan against one device
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub device_id: String,
    pub origin: ScanOrigin,
    pub scanned_at: DateTime<Utc>,
    /// Scanned terminals skipped because they were already registered
    pub already_registered: usize,
    entries: Vec<DetectionEntry>,
}

impl ScanSession {
    /// Reconcile a scan result against the device's current inventory.
    ///
    /// Registered serials are dropped, repeated serials keep their first
    /// sighting, and each remaining terminal gets an auto-mode id for its own
    /// port. Suggestions made earlier in the same scan count as taken.
    pub fn reconcile(
        device_id: &str,
        origin: ScanOrigin,
        scanned: Vec<ScannedOnt>,
        inventory: &[OntRecord],
        ceiling: u32,
    ) -> Self {
        let registered: HashSet<&str> = inventory.iter().map(|ont| ont.serial_number.as_str()).collect();
        let mut pools = AddressPools::from_records(inventory);
        let mut seen = HashSet::new();
        let mut already_registered = 0;
        let mut entries = Vec::new();

        for ont in scanned {
            let serial_number = normalize_serial(&ont.serial_number);
            if registered.contains(serial_number.as_str()) {
                already_registered += 1;
                continue;
            }
            if !seen.insert(serial_number.clone()) {
                continue;
            }
            let suggested_ont_id = pools.allocate(ont.address, AllocationMode::Auto, ceiling).ok();
            if let Some(id) = suggested_ont_id {
                pools.reserve(ont.address, id);
            } else {
                tracing::warn!("No free ONT ID on {} for detected {}", ont.address, serial_number);
            }
            entries.push(DetectionEntry {
                detected: DetectedOnt {
                    serial_number,
                    address: ont.address,
                    suggested_ont_id,
                    origin,
                },
                state: DetectionState::Detected,
            });
        }

        Self {
            device_id: device_id.to_string(),
            origin,
            scanned_at: Utc::now(),
            already_registered,
            entries,
        }
    }

    /// Detections still offered for registration
    pub fn pending(&self) -> Vec<DetectedOnt> {
        self.entries
            .iter()
            .filter(|e| matches!(e.state, DetectionState::Detected))
            .map(|e| e.detected.clone())
            .collect()
    }

    pub fn entry(&self, serial: &str) -> Option<&DetectionEntry> {
        let serial = normalize_serial(serial);
        self.entries.iter().find(|e| e.detected.serial_number == serial)
    }

    fn entry_mut(&mut self, serial: &str) -> Option<&mut DetectionEntry> {
        let serial = normalize_serial(serial);
        self.entries.iter_mut().find(|e| e.detected.serial_number == serial)
    }

    /// Detected -> Confirmed. Resolves the bindings the record will carry
    /// (explicit lists, else the device defaults).
    pub fn confirm(&mut self, device: &OltDevice, serial: &str, req: &PromoteOntRequest) -> EngineResult<DetectedOnt> {
        let entry = self
            .entry_mut(serial)
            .filter(|e| matches!(e.state, DetectionState::Detected))
            .ok_or_else(|| EngineError::NotDetected {
                serial: normalize_serial(serial),
            })?;

        let default_gem = ServiceList::Text(device.default_gem_ports.clone());
        let default_vlan = ServiceList::Text(device.default_vlans.clone());
        let bindings = pair(
            req.gem_ports.as_ref().unwrap_or(&default_gem),
            req.vlans.as_ref().unwrap_or(&default_vlan),
        )?;
        let description = checked_description(req.description.clone())?;

        entry.state = DetectionState::Confirmed { description, bindings };
        Ok(entry.detected.clone())
    }

    /// Confirmed -> Registered, removing the entry from the session
    fn mark_registered(&mut self, serial: &str, record_id: &str) {
        if let Some(entry) = self.entry_mut(serial) {
            entry.state = DetectionState::Registered {
                record_id: record_id.to_string(),
            };
        }
        self.entries
            .retain(|e| !matches!(e.state, DetectionState::Registered { .. }));
    }

    /// Confirmed -> Rejected
    fn mark_rejected(&mut self, serial: &str, reason: RejectReason) {
        if let Some(entry) = self.entry_mut(serial) {
            entry.state = DetectionState::Rejected { reason };
        }
    }

    /// Confirmed -> Detected, used when committing failed for a reason the
    /// operator can fix and retry
    fn revert(&mut self, serial: &str) {
        if let Some(entry) = self.entry_mut(serial) {
            entry.state = DetectionState::Detected;
        }
    }
}

/// Confirm a detected terminal and commit it to the inventory.
///
/// Rejections are returned as `Ok(PromotionOutcome::Rejected)`: they are
/// warnings and leave the rest of the scan usable.
pub async fn promote<I>(
    session: &mut ScanSession,
    inventory: &I,
    device: &OltDevice,
    serial: &str,
    req: &PromoteOntRequest,
) -> EngineResult<PromotionOutcome>
where
    I: Inventory + ?Sized,
{
    let detected = session.confirm(device, serial, req)?;
    match commit(session, inventory, device, &detected).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            session.revert(&detected.serial_number);
            Err(e)
        }
    }
}

async fn commit<I>(
    session: &mut ScanSession,
    inventory: &I,
    device: &OltDevice,
    detected: &DetectedOnt,
) -> EngineResult<PromotionOutcome>
where
    I: Inventory + ?Sized,
{
    let Some(DetectionState::Confirmed { description, bindings }) =
        session.entry(&detected.serial_number).map(|e| e.state.clone())
    else {
        return Err(EngineError::NotDetected {
            serial: detected.serial_number.clone(),
        });
    };

    // Re-read: the inventory may have changed since the scan
    let current = inventory.list_onts(&session.device_id).await?;
    let ceiling = device.pon_technology.ont_id_ceiling();
    let pools = AddressPools::from_records(&current);

    // Keep the suggestion while it is still free, otherwise re-allocate
    let mode = match detected.suggested_ont_id {
        Some(id) if id <= ceiling && !pools.used(&detected.address).contains(&id) => AllocationMode::Manual(id),
        _ => AllocationMode::Auto,
    };

    let input = RegistrationInput {
        address: detected.address,
        mode,
        serial_number: detected.serial_number.clone(),
        bindings,
        description,
    };

    let req = match compose(device, &current, input) {
        Ok(req) => req,
        Err(EngineError::AlreadyRegistered { .. }) => {
            return Ok(reject(session, &detected.serial_number, RejectReason::AlreadyRegistered));
        }
        Err(EngineError::PoolExhausted { .. }) => {
            return Ok(reject(session, &detected.serial_number, RejectReason::PoolExhausted));
        }
        Err(e) => return Err(e),
    };

    let record = match inventory.create_ont(&req).await {
        Ok(record) => record,
        Err(EngineError::Conflict(msg)) => {
            tracing::warn!("Inventory conflict while registering {}: {}", req.serial_number, msg);
            // Only a serial clash is a rejection; an id taken at the address
            // goes back to Detected for the operator to confirm again
            let latest = inventory.list_onts(&session.device_id).await?;
            if latest.iter().any(|o| o.serial_number == req.serial_number) {
                return Ok(reject(session, &detected.serial_number, RejectReason::AlreadyRegistered));
            }
            return Err(EngineError::Conflict(msg));
        }
        Err(e) => return Err(e),
    };

    tracing::info!(
        "Registered detected ONT {} on {} as ONT {} ({:?} scan)",
        record.serial_number,
        record.address,
        record.ont_id,
        detected.origin
    );
    session.mark_registered(&detected.serial_number, &record.id);
    Ok(PromotionOutcome::Registered { ont: record })
}

fn reject(session: &mut ScanSession, serial: &str, reason: RejectReason) -> PromotionOutcome {
    tracing::warn!("Detected ONT {} rejected: {:?}", serial, reason);
    session.mark_rejected(serial, reason);
    PromotionOutcome::Rejected {
        serial_number: serial.to_string(),
        reason,
    }
}
