//! Prometheus exposition for the meter
//!
//! Gauges are refreshed from the telemetry cache on every scrape, so the
//! exposed values are always the latest published reading.

use crate::error::Result;
use crate::poller::PollerStats;
use crate::reading::Reading;
use prometheus::{Encoder, GaugeVec, IntCounterVec, Registry, TextEncoder};

/// Metrics for one meter, registered in a service-local registry
#[derive(Clone)]
pub struct MeterMetrics {
    registry: Registry,
    device_id: String,

    voltage: GaugeVec,
    current: GaugeVec,
    power: GaugeVec,
    energy: GaugeVec,
    frequency: GaugeVec,
    power_factor: GaugeVec,
    alarm_state: GaugeVec,
    alarm_threshold: GaugeVec,
    last_updated: GaugeVec,

    polls_total: IntCounterVec,
}

fn device_gauge(registry: &Registry, name: &str, help: &str) -> Result<GaugeVec> {
    let gauge = GaugeVec::new(prometheus::opts!(name, help), &["device"])?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

impl MeterMetrics {
    pub fn new(device_id: impl Into<String>) -> Result<Self> {
        let registry = Registry::new();

        let voltage = device_gauge(
            &registry,
            "ac_power_meter_voltage",
            "The AC power meter voltage. Unit 'V'.",
        )?;
        let current = device_gauge(
            &registry,
            "ac_power_meter_current",
            "The AC power meter current. Unit 'A'.",
        )?;
        let power = device_gauge(
            &registry,
            "ac_power_meter_power",
            "The AC power meter power. Unit 'W'.",
        )?;
        // gauge: the device counter can be reset to zero
        let energy = device_gauge(
            &registry,
            "ac_power_meter_energy",
            "The AC power meter energy. Unit 'Wh'.",
        )?;
        let frequency = device_gauge(
            &registry,
            "ac_power_meter_frequency",
            "The AC power meter frequency. Unit 'Hz'.",
        )?;
        let power_factor = device_gauge(
            &registry,
            "ac_power_meter_power_factor",
            "The AC power meter power factor.",
        )?;
        let alarm_state = device_gauge(
            &registry,
            "ac_power_meter_alarm_state",
            "The AC power meter alarm state. Alarmed 1 else 0.",
        )?;
        let alarm_threshold = device_gauge(
            &registry,
            "ac_power_meter_alarm_threshold",
            "The AC power meter alarm threshold. Unit 'W'.",
        )?;
        let last_updated = device_gauge(
            &registry,
            "ac_power_meter_last_updated",
            "Timestamp of last update. Unit 'seconds since epoch'.",
        )?;

        let polls_total = IntCounterVec::new(
            prometheus::opts!(
                "ac_power_meter_polls_total",
                "Total number of poll cycles by result"
            ),
            &["device", "result"],
        )?;
        registry.register(Box::new(polls_total.clone()))?;

        Ok(Self {
            registry,
            device_id: device_id.into(),
            voltage,
            current,
            power,
            energy,
            frequency,
            power_factor,
            alarm_state,
            alarm_threshold,
            last_updated,
            polls_total,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    fn update(&self, reading: &Reading, stats: &PollerStats) {
        let device = [self.device_id.as_str()];
        self.voltage.with_label_values(&device).set(reading.voltage);
        self.current.with_label_values(&device).set(reading.current);
        self.power.with_label_values(&device).set(reading.power);
        self.energy
            .with_label_values(&device)
            .set(f64::from(reading.energy));
        self.frequency
            .with_label_values(&device)
            .set(reading.frequency);
        self.power_factor
            .with_label_values(&device)
            .set(reading.power_factor);
        self.alarm_state
            .with_label_values(&device)
            .set(if reading.alarm { 1.0 } else { 0.0 });
        self.alarm_threshold
            .with_label_values(&device)
            .set(f64::from(reading.alarm_threshold));
        self.last_updated
            .with_label_values(&device)
            .set(reading.captured_at_secs());

        // Counters only move forward; catch up with the poller's totals
        for (result, total) in [
            ("success", stats.successes()),
            ("failure", stats.failures()),
        ] {
            let counter = self
                .polls_total
                .with_label_values(&[self.device_id.as_str(), result]);
            let seen = counter.get();
            if total > seen {
                counter.inc_by(total - seen);
            }
        }
    }

    /// Refresh from `reading` and encode in the text exposition format
    pub fn render(&self, reading: &Reading, stats: &PollerStats) -> Result<String> {
        self.update(reading, stats);

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Content type of [`MeterMetrics::render`] output
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}
