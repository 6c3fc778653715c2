//! metersrv configuration
//!
//! Sources, lowest priority first: built-in defaults, YAML file,
//! `METERSRV_` environment variables (nested with `__`), CLI overrides.

use crate::error::{MeterSrvError, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use meter_protocols::ConnectionParams;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "METERSRV_";

/// Default API port
pub const DEFAULT_API_PORT: u16 = 9100;

/// Meter gateway connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub host: String,
    pub port: u16,
    /// RS485 slave address behind the gateway
    pub unit_id: u8,
    /// Connect and per-read timeout
    pub timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.200".to_string(),
            port: 8899,
            unit_id: 1,
            timeout_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_secs: u64,
    /// Holding register with the alarm threshold (W)
    pub threshold_address: u16,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            threshold_address: 1,
        }
    }
}

/// HTTP exporter / control API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: DEFAULT_API_PORT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Daily log files go here; console only when unset
    pub dir: Option<PathBuf>,
}

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterSrvConfig {
    /// Label attached to every metric; generated when absent
    pub device_id: Option<String>,
    pub device: DeviceConfig,
    pub polling: PollingConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

impl MeterSrvConfig {
    /// Defaults, then the YAML file (if present), then the environment
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(MeterSrvConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract the configuration and fill in a device id if none was given
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let mut config: MeterSrvConfig = figment.extract()?;
        config.ensure_device_id();
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_figment(Self::figment(path))
    }

    fn ensure_device_id(&mut self) {
        let missing = self
            .device_id
            .as_deref()
            .map(|id| id.trim().is_empty())
            .unwrap_or(true);
        if missing {
            self.device_id = Some(uuid::Uuid::new_v4().to_string());
        }
    }

    pub fn device_id(&self) -> &str {
        self.device_id.as_deref().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.host.trim().is_empty() {
            return Err(MeterSrvError::validation("device.host must not be empty"));
        }
        if self.device.timeout_ms == 0 {
            return Err(MeterSrvError::validation(
                "device.timeout_ms must be greater than 0",
            ));
        }
        if self.polling.interval_secs == 0 {
            return Err(MeterSrvError::validation(
                "polling.interval_secs must be greater than 0",
            ));
        }
        if self.api.enabled && self.api.port == 0 {
            return Err(MeterSrvError::validation(
                "api.port must be greater than 0 when the API is enabled",
            ));
        }
        Ok(())
    }

    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams::new(
            self.device.host.clone(),
            self.device.port,
            Duration::from_millis(self.device.timeout_ms),
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }

    pub fn api_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api.host, self.api.port)
            .parse()
            .map_err(|e| {
                MeterSrvError::validation(format!(
                    "Invalid API bind address {}:{}: {}",
                    self.api.host, self.api.port, e
                ))
            })
    }
}
