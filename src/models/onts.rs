use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::TopologyAddress;

/// One logical service: a GEM port tagged with a VLAN.
///
/// `order` is the declaration position and drives command generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBinding {
    pub gem_port: u32,
    pub vlan: u32,
    pub order: u32,
}

/// Lifecycle status of a registered ONT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OntStatus {
    Registering,
    Active,
    Offline,
    Error,
}

impl OntStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registering => "registering",
            Self::Active => "active",
            Self::Offline => "offline",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for OntStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OntStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registering" => Ok(Self::Registering),
            "active" => Ok(Self::Active),
            "offline" => Ok(Self::Offline),
            "error" => Ok(Self::Error),
            other => Err(anyhow::anyhow!("unknown ONT status: {}", other)),
        }
    }
}

/// OntRecord is a registered terminal in a device's inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OntRecord {
    pub id: String,
    pub device_id: String,
    pub address: TopologyAddress,
    pub ont_id: u32,
    pub serial_number: String,
    pub bindings: Vec<ServiceBinding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: OntStatus,
    pub registration_code: String,
    pub created_at: DateTime<Utc>,
}

/// RegistrationRequest is the validated input for creating an OntRecord
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub device_id: String,
    pub address: TopologyAddress,
    pub ont_id: u32,
    pub serial_number: String,
    pub bindings: Vec<ServiceBinding>,
    pub description: Option<String>,
    pub registration_code: String,
}

/// A token of a GEM-port or VLAN list as it arrives over JSON
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListToken {
    Number(i64),
    Text(String),
}

/// A GEM-port or VLAN list: either "1,2,3" or [1, "2", 3]
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServiceList {
    Text(String),
    Tokens(Vec<ListToken>),
}

/// CreateOntRequest is the operator's registration form
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOntRequest {
    pub address: TopologyAddress,
    /// Absent or null selects auto allocation
    #[serde(default)]
    pub ont_id: Option<u32>,
    pub serial_number: String,
    pub gem_ports: ServiceList,
    pub vlans: ServiceList,
    #[serde(default)]
    pub description: Option<String>,
}

/// UpdateOntStatusRequest moves a record between lifecycle states
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOntStatusRequest {
    pub status: OntStatus,
}

/// Where a detection came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanOrigin {
    Live,
    Simulated,
}

/// A terminal reported by a scan, before any reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedOnt {
    pub serial_number: String,
    pub address: TopologyAddress,
}

/// DetectedOnt is a scanned terminal absent from the inventory, with the id
/// the allocator suggests for it. `None` means its port has no free id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedOnt {
    pub serial_number: String,
    pub address: TopologyAddress,
    pub suggested_ont_id: Option<u32>,
    pub origin: ScanOrigin,
}

/// Operator's confirmation of a detected ONT
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromoteOntRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub gem_ports: Option<ServiceList>,
    #[serde(default)]
    pub vlans: Option<ServiceList>,
}

/// NextIdResponse reports the id pool of one port
#[derive(Debug, Clone, Serialize)]
pub struct NextIdResponse {
    pub address: TopologyAddress,
    pub next_ont_id: Option<u32>,
    pub ceiling: u32,
    pub used_count: usize,
    pub available_count: usize,
    pub available_ids: Vec<u32>,
}

/// ScanResponse lists the detections still pending for a device
#[derive(Debug, Clone, Serialize)]
pub struct ScanResponse {
    pub device_id: String,
    pub origin: ScanOrigin,
    pub detected_count: usize,
    pub already_registered: usize,
    pub onts: Vec<DetectedOnt>,
}
