//! metersrv error types

use common::AppError;
use meter_protocols::ProtocolError;
use thiserror::Error;

/// Result type for metersrv operations
pub type Result<T> = std::result::Result<T, MeterSrvError>;

/// metersrv errors
#[derive(Debug, Error)]
pub enum MeterSrvError {
    /// Wire or device failure from the protocol engine
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration loaded but rejected
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// Register block did not have the expected layout
    #[error("Register count mismatch: expected {expected}, got {actual}")]
    RegisterCount { expected: usize, actual: usize },

    /// Prometheus registration or encoding failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl From<figment::Error> for MeterSrvError {
    fn from(err: figment::Error) -> Self {
        MeterSrvError::Config(err.to_string())
    }
}

impl MeterSrvError {
    pub fn validation(msg: impl Into<String>) -> Self {
        MeterSrvError::Validation(msg.into())
    }
}

impl From<MeterSrvError> for AppError {
    fn from(err: MeterSrvError) -> Self {
        match err {
            MeterSrvError::Protocol(ProtocolError::InvalidRequest(msg)) => {
                AppError::bad_request(msg)
            },
            MeterSrvError::Protocol(e) => AppError::bad_gateway("Meter request failed")
                .with_details(e.to_string()),
            MeterSrvError::Validation(msg) => AppError::bad_request(msg),
            other => AppError::internal_error(other.to_string()),
        }
    }
}
