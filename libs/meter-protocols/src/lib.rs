//! Meter Protocol Implementations
//!
//! Modbus TCP client stack for single-phase AC power meters behind an
//! RS485-to-TCP gateway.

pub mod error;
pub mod modbus;

pub use error::{ProtocolError, Result};
pub use modbus::{ConnectionParams, ProtocolClient, RegisterList, TransportSession};
