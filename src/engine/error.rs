use thiserror::Error;

use crate::models::TopologyAddress;

/// Every failure the provisioning engine can report to an operator.
///
/// None of these are fatal: the engine stays usable for the next action and
/// nothing is retried automatically.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A GEM-port or VLAN list contained a token that is not a non-negative integer
    #[error("malformed {list} list: {token:?} is not a number")]
    MalformedList { list: &'static str, token: String },

    #[error("{gem_ports} GEM ports but {vlans} VLANs; each GEM port needs exactly one VLAN")]
    LengthMismatch { gem_ports: usize, vlans: usize },

    #[error("ONT ID {ont_id} is out of range (0-{ceiling})")]
    OutOfRange { ont_id: u32, ceiling: u32 },

    #[error("ONT ID {ont_id} is already used on port {address}")]
    DuplicateId { ont_id: u32, address: TopologyAddress },

    #[error("no free ONT ID left on port {address} (0-{ceiling} all taken)")]
    PoolExhausted { address: TopologyAddress, ceiling: u32 },

    #[error("ONT {serial} is already registered on this device")]
    AlreadyRegistered { serial: String },

    #[error("invalid topology address: {0}")]
    InvalidAddress(String),

    #[error("description is {len} characters, maximum is {max}")]
    DescriptionTooLong { len: usize, max: usize },

    #[error("invalid serial number: {0:?}")]
    InvalidSerial(String),

    /// The serial is not pending in the current scan session
    #[error("ONT {serial} is not pending in the current scan")]
    NotDetected { serial: String },

    #[error("command is empty")]
    EmptyCommand,

    #[error("device {0} is not connected")]
    NotConnected(String),

    /// The device-session collaborator failed (login, timeout, lost channel)
    #[error("device error: {0}")]
    Device(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl EngineError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Stable snake_case code, used in API bodies and websocket payloads
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedList { .. } => "malformed_list",
            Self::LengthMismatch { .. } => "length_mismatch",
            Self::OutOfRange { .. } => "out_of_range",
            Self::DuplicateId { .. } => "duplicate_id",
            Self::PoolExhausted { .. } => "pool_exhausted",
            Self::AlreadyRegistered { .. } => "already_registered",
            Self::InvalidAddress(_) => "invalid_address",
            Self::DescriptionTooLong { .. } => "description_too_long",
            Self::InvalidSerial(_) => "invalid_serial",
            Self::NotDetected { .. } => "not_detected",
            Self::EmptyCommand => "empty_command",
            Self::NotConnected(_) => "not_connected",
            Self::Device(_) => "device",
            Self::Conflict(_) => "conflict",
            Self::NotFound { .. } => "not_found",
            Self::Store(_) => "store",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
