//! Meter poller
//!
//! Reads the telemetry block on a fixed interval and publishes decoded
//! readings into the [`TelemetryCache`]. Every failure is transient: the
//! cache keeps the last good reading and the next tick tries again.

use crate::cache::TelemetryCache;
use crate::error::Result;
use crate::reading::{Reading, REGISTER_BLOCK_LEN, REGISTER_BLOCK_START};
use chrono::Utc;
use meter_protocols::ProtocolClient;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Protocol client shared by the poller and the control API
///
/// The async mutex serializes wire operations; control calls queue behind a
/// running poll cycle.
pub type SharedClient = Arc<tokio::sync::Mutex<ProtocolClient>>;

/// Failure streak length between repeated warnings
const STREAK_WARN_EVERY: u64 = 10;

/// Poll cycle counters
#[derive(Debug, Default)]
pub struct PollerStats {
    successes: AtomicU64,
    failures: AtomicU64,
    failure_streak: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl PollerStats {
    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        let streak = self.failure_streak.swap(0, Ordering::Relaxed);
        if streak > 0 {
            info!("Meter reachable again after {} failed polls", streak);
        }
        *self.last_error.lock() = None;
    }

    /// Returns the current failure streak
    pub fn record_failure(&self) -> u64 {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.failure_streak.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn set_last_error(&self, message: String) {
        *self.last_error.lock() = Some(message);
    }

    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn failure_streak(&self) -> u64 {
        self.failure_streak.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub threshold_address: u16,
    /// Print each reading to stdout (no-web mode)
    pub console: bool,
}

pub struct Poller {
    client: SharedClient,
    cache: Arc<TelemetryCache>,
    stats: Arc<PollerStats>,
    config: PollerConfig,
}

impl Poller {
    pub fn new(
        client: SharedClient,
        cache: Arc<TelemetryCache>,
        stats: Arc<PollerStats>,
        config: PollerConfig,
    ) -> Self {
        Self {
            client,
            cache,
            stats,
            config,
        }
    }

    /// One poll cycle: telemetry block, then a best-effort threshold refresh
    ///
    /// The cache is only touched when the full block was read and decoded.
    pub async fn poll_once(&self) -> Result<Reading> {
        let result = self.read_reading().await;

        match &result {
            Ok(reading) => {
                self.cache.publish(*reading);
                self.stats.record_success();
                debug!(
                    "Published reading: {:.1}V {:.3}A {:.1}W {}Wh",
                    reading.voltage, reading.current, reading.power, reading.energy
                );
            },
            Err(e) => {
                let streak = self.stats.record_failure();
                self.stats.set_last_error(e.to_string());
                warn!("Poll failed: {}", e);
                if streak % STREAK_WARN_EVERY == 0 {
                    warn!(
                        "Meter unreachable for {} consecutive polls, still retrying every {:?}",
                        streak, self.config.interval
                    );
                }
            },
        }

        result
    }

    async fn read_reading(&self) -> Result<Reading> {
        let mut client = self.client.lock().await;

        let registers = client
            .read_input_registers(REGISTER_BLOCK_START, REGISTER_BLOCK_LEN)
            .await?;
        let mut reading =
            Reading::from_registers(&registers, self.cache.get_threshold(), Utc::now())?;

        match client
            .read_holding_registers(self.config.threshold_address, 1)
            .await
        {
            Ok(values) => {
                if let Some(&watts) = values.first() {
                    reading.alarm_threshold = watts;
                }
            },
            Err(e) => debug!("Threshold refresh failed, keeping previous: {}", e),
        }

        Ok(reading)
    }

    /// Poll until `token` is cancelled, then close the session
    ///
    /// Cancellation is only observed between ticks; a running cycle always
    /// completes.
    pub async fn run(self, token: CancellationToken) {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Polling every {:?}", self.config.interval);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {},
            }

            if let Ok(reading) = self.poll_once().await {
                if self.config.console {
                    println!("{reading}\n");
                }
            }
        }

        self.client.lock().await.close();
        info!("Poller stopped");
    }
}
