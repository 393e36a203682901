//! ONT provisioning and reconciliation engine.
//!
//! Pure rules live here (pairing, id allocation, reconciliation, command
//! history); storage and device access come in through the traits in
//! [`inventory`] and [`crate::session::DeviceSession`].

pub mod allocator;
mod error;
pub mod inventory;
pub mod pairing;
pub mod reconciler;
pub mod registration;
pub mod session_log;

pub use error::{EngineError, EngineResult};
