//! Meter reading decode
//!
//! Input register map (read from address 0, count 10):
//!
//! | index | content                              |
//! |-------|--------------------------------------|
//! | 0     | voltage ×10                          |
//! | 1-2   | current ×1000, 32-bit `low, high`    |
//! | 3-4   | power ×10, 32-bit `low, high`        |
//! | 5-6   | energy Wh, 32-bit `low, high`        |
//! | 7     | frequency ×10                        |
//! | 8     | power factor ×100                    |
//! | 9     | alarm flag (nonzero = active)        |

use crate::error::{MeterSrvError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// First input register of the telemetry block
pub const REGISTER_BLOCK_START: u16 = 0;

/// Number of input registers in the telemetry block
pub const REGISTER_BLOCK_LEN: u16 = 10;

/// Decoded snapshot of one successful poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Reading {
    /// Volts
    pub voltage: f64,
    /// Amperes
    pub current: f64,
    /// Watts
    pub power: f64,
    /// Cumulative watt-hours
    pub energy: u32,
    /// Hertz
    pub frequency: f64,
    pub power_factor: f64,
    pub alarm: bool,
    /// Alarm threshold in whole watts
    pub alarm_threshold: u16,
    /// Unix epoch until the first successful poll
    pub captured_at: DateTime<Utc>,
}

/// Combine a `low, high` register pair into a 32-bit value
fn combine_u32(low: u16, high: u16) -> u32 {
    u32::from(low) | (u32::from(high) << 16)
}

impl Reading {
    /// Decode the ten-register telemetry block
    pub fn from_registers(
        registers: &[u16],
        alarm_threshold: u16,
        captured_at: DateTime<Utc>,
    ) -> Result<Self> {
        let regs: &[u16; REGISTER_BLOCK_LEN as usize] =
            registers
                .try_into()
                .map_err(|_| MeterSrvError::RegisterCount {
                    expected: REGISTER_BLOCK_LEN as usize,
                    actual: registers.len(),
                })?;

        Ok(Self {
            voltage: f64::from(regs[0]) / 10.0,
            current: f64::from(combine_u32(regs[1], regs[2])) / 1000.0,
            power: f64::from(combine_u32(regs[3], regs[4])) / 10.0,
            energy: combine_u32(regs[5], regs[6]),
            frequency: f64::from(regs[7]) / 10.0,
            power_factor: f64::from(regs[8]) / 100.0,
            alarm: regs[9] > 0,
            alarm_threshold,
            captured_at,
        })
    }

    /// True once a poll has published real data
    pub fn is_captured(&self) -> bool {
        self.captured_at.timestamp() > 0
    }

    /// Seconds since the epoch of the capture time
    pub fn captured_at_secs(&self) -> f64 {
        self.captured_at.timestamp_millis() as f64 / 1000.0
    }
}

/// Console block printed in no-web mode
impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- {} ---", self.captured_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "Voltage:         {:.1} V", self.voltage)?;
        writeln!(f, "Current:         {:.3} A", self.current)?;
        writeln!(f, "Power:           {:.1} W", self.power)?;
        writeln!(f, "Energy:          {} Wh", self.energy)?;
        writeln!(f, "Frequency:       {:.1} Hz", self.frequency)?;
        writeln!(f, "Power Factor:    {:.2}", self.power_factor)?;
        writeln!(
            f,
            "Alarm State:     {}",
            if self.alarm { "ALARM" } else { "OK" }
        )?;
        write!(f, "Alarm Threshold: {} W", self.alarm_threshold)
    }
}
