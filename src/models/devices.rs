use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// PON technology of an OLT, which fixes the ONT id ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PonTechnology {
    #[default]
    Gpon,
    Epon,
}

impl PonTechnology {
    /// Highest ONT id allowed on one port
    pub const fn ont_id_ceiling(self) -> u32 {
        match self {
            Self::Gpon => 127,
            Self::Epon => 63,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gpon => "gpon",
            Self::Epon => "epon",
        }
    }
}

impl fmt::Display for PonTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PonTechnology {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gpon" => Ok(Self::Gpon),
            "epon" => Ok(Self::Epon),
            other => Err(anyhow::anyhow!("unknown PON technology: {}", other)),
        }
    }
}

/// Default registration code rule: board, port and ONT id
pub const DEFAULT_REGISTRATION_RULE: &str = "0-(B)-(P)-(O)";

/// OltDevice is a head-end device managed by the console
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OltDevice {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub ssh_port: u16,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub pon_technology: PonTechnology,
    pub registration_rule: String,
    /// GEM-port list used when promoting a detected ONT without one
    pub default_gem_ports: String,
    /// VLAN list used when promoting a detected ONT without one
    pub default_vlans: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connected: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// CreateDeviceRequest for creating or replacing devices
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceRequest {
    pub name: String,
    pub ip: String,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub pon_technology: PonTechnology,
    #[serde(default = "default_registration_rule")]
    pub registration_rule: String,
    #[serde(default = "default_gem_ports")]
    pub default_gem_ports: String,
    #[serde(default = "default_vlans")]
    pub default_vlans: String,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_registration_rule() -> String {
    DEFAULT_REGISTRATION_RULE.to_string()
}

fn default_gem_ports() -> String {
    "1".to_string()
}

fn default_vlans() -> String {
    "41".to_string()
}

/// ConnectResult reports the outcome of a connect attempt
#[derive(Debug, Clone, Serialize)]
pub struct ConnectResult {
    pub success: bool,
    pub message: String,
}

/// ConnectionStatus for a device
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub device_id: String,
    pub is_connected: bool,
}
