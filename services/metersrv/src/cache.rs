//! Telemetry cache
//!
//! Single-writer, multi-reader store for the latest [`Reading`]. The poller
//! replaces the whole value; readers get a copy. The alarm threshold has its
//! own atomic so a control-path write is visible before the next poll.

use crate::reading::Reading;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU16, Ordering};

#[derive(Debug, Default)]
pub struct TelemetryCache {
    reading: RwLock<Reading>,
    threshold: AtomicU16,
}

impl TelemetryCache {
    /// Zero reading, zero threshold
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored reading wholesale
    pub fn publish(&self, reading: Reading) {
        let mut slot = self.reading.write();
        *slot = reading;
        self.threshold.store(reading.alarm_threshold, Ordering::Release);
    }

    /// Copy of the current reading with the current threshold
    pub fn snapshot(&self) -> Reading {
        let mut reading = *self.reading.read();
        reading.alarm_threshold = self.get_threshold();
        reading
    }

    pub fn set_threshold(&self, watts: u16) {
        self.threshold.store(watts, Ordering::Release);
    }

    pub fn get_threshold(&self) -> u16 {
        self.threshold.load(Ordering::Acquire)
    }
}
