//! Command-line interface
//!
//! Device and web flags override the configuration file and environment.

use crate::control::StartupActions;
use clap::Parser;
use common::ServiceArgs;
use figment::{providers::Serialized, Figment};

/// AC power meter poller and Prometheus exporter
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "metersrv", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub common: ServiceArgs,

    /// IP address of the RS485-to-Ethernet gateway
    #[arg(long)]
    pub host: Option<String>,

    /// TCP port of the gateway
    #[arg(long)]
    pub port: Option<u16>,

    /// Modbus slave address
    #[arg(long)]
    pub slave: Option<u8>,

    /// Polling interval in seconds
    #[arg(long)]
    pub interval: Option<u64>,

    /// Reset the energy counter at startup
    #[arg(long)]
    pub reset_energy: bool,

    /// Set the alarm threshold (W) at startup
    #[arg(long, value_name = "WATTS")]
    pub set_alarm: Option<u16>,

    /// Web server host
    #[arg(long)]
    pub web_host: Option<String>,

    /// Web server port
    #[arg(long)]
    pub web_port: Option<u16>,

    /// Disable the web server and print readings to the console
    #[arg(long)]
    pub no_web: bool,
}

impl Cli {
    /// Merge the flags that were given on top of `figment`
    pub fn apply(&self, figment: Figment) -> Figment {
        let mut figment = figment;
        if let Some(host) = &self.host {
            figment = figment.merge(Serialized::default("device.host", host));
        }
        if let Some(port) = self.port {
            figment = figment.merge(Serialized::default("device.port", port));
        }
        if let Some(slave) = self.slave {
            figment = figment.merge(Serialized::default("device.unit_id", slave));
        }
        if let Some(interval) = self.interval {
            figment = figment.merge(Serialized::default("polling.interval_secs", interval));
        }
        if let Some(host) = &self.web_host {
            figment = figment.merge(Serialized::default("api.host", host));
        }
        if let Some(port) = self.web_port {
            figment = figment.merge(Serialized::default("api.port", port));
        }
        if self.no_web {
            figment = figment.merge(Serialized::default("api.enabled", false));
        }
        figment
    }

    pub fn startup_actions(&self) -> StartupActions {
        StartupActions {
            reset_energy: self.reset_energy,
            set_alarm: self.set_alarm,
        }
    }
}
