//! Protocol Error Types
//!
//! Error kinds produced by the frame codec, the transport session and the
//! protocol client.

use crate::modbus::exception_description;
use thiserror::Error;

/// Result type for meter-protocols operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Meter protocol errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Connection could not be established (DNS, refused, timeout)
    #[error("Connection error: {0}")]
    Connect(String),

    /// Socket failed mid-operation; the session has been reset
    #[error("IO error: {0}")]
    Io(String),

    /// Response shorter than the frame layout requires
    #[error("Truncated response: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    /// Frame long enough but internally inconsistent
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Exception reported by the device
    #[error("Device exception: function {function:#04X}, code {code:#04X} ({})", exception_description(*.code))]
    DeviceError { function: u8, code: u8 },

    /// Reset command received no bytes at all
    #[error("No response received")]
    NoResponse,

    /// Request rejected before reaching the wire
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response header carried another transaction id
    #[error("Transaction mismatch: expected {expected:#06X}, got {actual:#06X}")]
    TransactionMismatch { expected: u16, actual: u16 },
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        ProtocolError::Io(err.to_string())
    }
}

impl ProtocolError {
    pub fn connect(msg: impl Into<String>) -> Self {
        ProtocolError::Connect(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        ProtocolError::Io(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        ProtocolError::Malformed(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        ProtocolError::InvalidRequest(msg.into())
    }

    /// True when the failure came from the socket rather than the frame content
    pub fn is_transport(&self) -> bool {
        matches!(self, ProtocolError::Connect(_) | ProtocolError::Io(_))
    }
}
