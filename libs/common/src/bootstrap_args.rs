//! Common command-line arguments for all meter services
//!
//! Flattened into each service's own `clap` parser.

use clap::Args;
use std::path::PathBuf;

/// Common service startup arguments
#[derive(Debug, Clone, Default, Args)]
pub struct ServiceArgs {
    /// Configuration file (YAML)
    #[arg(short = 'c', long, env = "METER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter (trace, debug, info, warn, error or a full directive)
    #[arg(short = 'l', long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Disable colored output (useful for log files)
    #[arg(long)]
    pub no_color: bool,

    /// Only validate configuration without starting service
    #[arg(long)]
    pub validate: bool,
}

impl ServiceArgs {
    /// Configuration path, falling back to `config/<service>.yaml`
    pub fn config_path(&self, service_name: &str) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("config/{service_name}.yaml")))
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        common: ServiceArgs,
    }

    #[test]
    fn test_default_args() {
        let args = ServiceArgs::default();
        assert!(args.log_level.is_none());
        assert!(!args.no_color);
        assert!(!args.validate);
    }

    #[test]
    fn test_config_path_default() {
        let args = ServiceArgs::default();
        assert_eq!(
            args.config_path("metersrv"),
            PathBuf::from("config/metersrv.yaml")
        );
    }

    #[test]
    fn test_flattened_parse() {
        let cli = TestCli::try_parse_from([
            "svc",
            "--config",
            "/etc/meter.yaml",
            "-l",
            "debug",
            "--no-color",
            "--validate",
        ])
        .unwrap();
        assert_eq!(
            cli.common.config_path("metersrv"),
            PathBuf::from("/etc/meter.yaml")
        );
        assert_eq!(cli.common.log_level.as_deref(), Some("debug"));
        assert!(cli.common.no_color);
        assert!(cli.common.validate);
    }
}
