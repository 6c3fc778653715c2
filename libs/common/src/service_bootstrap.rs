//! Unified service bootstrap utilities
//!
//! Startup banner and logging initialization shared by meter services.

use crate::bootstrap_args::ServiceArgs;
use crate::logging::{self, LogConfig};
use std::path::PathBuf;
use tracing::info;

/// Service metadata for startup
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    /// Service name (e.g., "metersrv")
    pub name: String,
    /// Service version
    pub version: String,
    /// Service description
    pub description: String,
    /// Default API port
    pub default_port: u16,
}

impl ServiceInfo {
    /// Create new service info
    pub fn new(name: impl Into<String>, description: impl Into<String>, default_port: u16) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: description.into(),
            default_port,
        }
    }

    /// Override the version (services pass their own `CARGO_PKG_VERSION`)
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Print unified startup banner for any service
pub fn print_startup_banner(service: &ServiceInfo) {
    let banner = match service.name.as_str() {
        "metersrv" => {
            r#"
 ███╗   ███╗███████╗████████╗███████╗██████╗ ███████╗██████╗ ██╗   ██╗
 ████╗ ████║██╔════╝╚══██╔══╝██╔════╝██╔══██╗██╔════╝██╔══██╗██║   ██║
 ██╔████╔██║█████╗     ██║   █████╗  ██████╔╝███████╗██████╔╝██║   ██║
 ██║╚██╔╝██║██╔══╝     ██║   ██╔══╝  ██╔══██╗╚════██║██╔══██╗╚██╗ ██╔╝
 ██║ ╚═╝ ██║███████╗   ██║   ███████╗██║  ██║███████║██║  ██║ ╚████╔╝
 ╚═╝     ╚═╝╚══════╝   ╚═╝   ╚══════╝╚═╝  ╚═╝╚══════╝╚═╝  ╚═╝  ╚═══╝
            "#
        },
        _ => "",
    };

    if !banner.is_empty() {
        info!("{}", banner);
    }
    info!(" {} v{}", service.name.to_uppercase(), service.version);
    info!(" {}", service.description);
    info!(" Default Port: {}", service.default_port);
    info!("");
}

/// Initialize logging for a service from its common arguments
///
/// Log directory priority: `METER_LOG_DIR` environment variable, then the
/// configured directory. Console only when neither is set.
pub fn init_logging(
    service: &ServiceInfo,
    args: &ServiceArgs,
    log_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let log_dir = std::env::var("METER_LOG_DIR")
        .ok()
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or(log_dir);

    let config = LogConfig {
        service_name: service.name.clone(),
        log_dir,
        level: args.log_level.clone(),
        ansi: !args.no_color,
    };

    logging::init_with_config(config).map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
