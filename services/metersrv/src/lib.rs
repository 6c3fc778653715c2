//! metersrv - AC power meter poller and Prometheus exporter
//!
//! Polls a single-phase meter over Modbus TCP, keeps the latest reading in a
//! telemetry cache, and serves it as Prometheus metrics next to a small
//! control API.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod control;
pub mod error;
pub mod metrics;
pub mod poller;
pub mod reading;

/// Service information
pub const SERVICE_NAME: &str = "metersrv";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub use cache::TelemetryCache;
pub use cli::Cli;
pub use config::MeterSrvConfig;
pub use error::{MeterSrvError, Result};
pub use poller::{Poller, PollerConfig, PollerStats, SharedClient};
pub use reading::Reading;
