//! Meter services basic library
//!
//! Provides plumbing shared by all meter services:
//! - logging initialization
//! - startup banner and common CLI arguments
//! - shutdown signal handling
//! - API response envelopes

pub mod api_types;
pub mod bootstrap_args;
pub mod logging;
pub mod service_bootstrap;
pub mod shutdown;

// Re-export commonly used API types
pub use api_types::{
    AppError, ComponentHealth, ErrorInfo, ErrorResponse, HealthStatus, ServiceStatus,
    SuccessResponse,
};
pub use bootstrap_args::ServiceArgs;
pub use service_bootstrap::ServiceInfo;

// Re-export common dependencies
pub use anyhow;
pub use clap;
