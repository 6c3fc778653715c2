//! Poller integration tests against an in-process meter

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use meter_protocols::ProtocolError;
use metersrv::{MeterSrvError, Poller, PollerConfig, PollerStats, Reading, TelemetryCache};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

mod common;
use common::{
    shared_client, unreachable_port, MeterMode, MockMeter, REFERENCE_THRESHOLD, THRESHOLD_ADDRESS,
};

struct Harness {
    poller: Poller,
    client: metersrv::SharedClient,
    cache: Arc<TelemetryCache>,
    stats: Arc<PollerStats>,
}

fn harness(port: u16, interval: Duration) -> Harness {
    let client = shared_client(port);
    let cache = Arc::new(TelemetryCache::new());
    let stats = Arc::new(PollerStats::default());
    let poller = Poller::new(
        client.clone(),
        cache.clone(),
        stats.clone(),
        PollerConfig {
            interval,
            threshold_address: THRESHOLD_ADDRESS,
            console: false,
        },
    );
    Harness {
        poller,
        client,
        cache,
        stats,
    }
}

#[tokio::test]
async fn test_poll_once_publishes_reading() {
    let meter = MockMeter::start().await;
    let h = harness(meter.port, Duration::from_secs(5));

    let reading = h.poller.poll_once().await.unwrap();
    let snapshot = h.cache.snapshot();
    assert_eq!(snapshot, reading);

    assert_eq!(snapshot.voltage, 230.1);
    assert_eq!(snapshot.current, 1.234);
    assert_eq!(snapshot.power, 284.0);
    assert_eq!(snapshot.energy, 56789);
    assert_eq!(snapshot.frequency, 50.0);
    assert_eq!(snapshot.power_factor, 0.98);
    assert!(snapshot.alarm);
    assert_eq!(snapshot.alarm_threshold, REFERENCE_THRESHOLD);
    assert!(snapshot.is_captured());

    assert_eq!(h.stats.successes(), 1);
    assert_eq!(h.stats.failure_streak(), 0);
}

#[tokio::test]
async fn test_device_exception_keeps_last_reading() {
    let meter = MockMeter::start().await;
    let h = harness(meter.port, Duration::from_secs(5));

    let first = h.poller.poll_once().await.unwrap();

    meter.set_mode(MeterMode::Exception(0x04));
    let err = h.poller.poll_once().await.unwrap_err();
    assert!(matches!(
        err,
        MeterSrvError::Protocol(ProtocolError::DeviceError {
            function: 0x04,
            code: 0x04
        })
    ));

    assert_eq!(h.cache.snapshot(), first);
    assert_eq!(h.stats.failures(), 1);
    assert_eq!(h.stats.failure_streak(), 1);
    assert!(h.stats.last_error().is_some());
}

#[tokio::test]
async fn test_truncated_response_leaves_cache_untouched() {
    let meter = MockMeter::start().await;
    meter.set_mode(MeterMode::Truncated);
    let h = harness(meter.port, Duration::from_secs(5));

    let err = h.poller.poll_once().await.unwrap_err();
    assert!(matches!(
        err,
        MeterSrvError::Protocol(ProtocolError::Truncated { .. })
    ));
    assert_eq!(h.cache.snapshot(), Reading::default());
}

#[tokio::test]
async fn test_short_block_skips_threshold_read() {
    let meter = MockMeter::start().await;
    meter.set_mode(MeterMode::ShortRead);
    let h = harness(meter.port, Duration::from_secs(5));

    let err = h.poller.poll_once().await.unwrap_err();
    assert!(matches!(
        err,
        MeterSrvError::RegisterCount {
            expected: 10,
            actual: 9
        }
    ));
    assert_eq!(meter.requests(), 1);
    assert_eq!(h.cache.snapshot(), Reading::default());
    assert_eq!(h.stats.failures(), 1);
}

#[tokio::test]
async fn test_threshold_read_failure_falls_back_to_cache() {
    let meter = MockMeter::start().await;
    meter.set_mode(MeterMode::HoldingException);
    let h = harness(meter.port, Duration::from_secs(5));
    h.cache.set_threshold(1234);

    let reading = h.poller.poll_once().await.unwrap();
    assert_eq!(reading.alarm_threshold, 1234);
    assert_eq!(reading.energy, 56789);
    assert_eq!(h.stats.successes(), 1);
}

#[tokio::test]
async fn test_unreachable_meter_counts_failures() {
    let h = harness(unreachable_port(), Duration::from_secs(5));

    for expected in 1..=3 {
        let err = h.poller.poll_once().await.unwrap_err();
        assert!(matches!(
            err,
            MeterSrvError::Protocol(ProtocolError::Connect(_))
        ));
        assert_eq!(h.stats.failure_streak(), expected);
    }
    assert!(!h.cache.snapshot().is_captured());
}

#[tokio::test]
async fn test_recovery_resets_streak() {
    let meter = MockMeter::start().await;
    meter.set_mode(MeterMode::Exception(0x06));
    let h = harness(meter.port, Duration::from_secs(5));

    assert!(h.poller.poll_once().await.is_err());
    assert!(h.poller.poll_once().await.is_err());
    assert_eq!(h.stats.failure_streak(), 2);

    meter.set_mode(MeterMode::Normal);
    meter.set_input(0, 2205);
    let reading = h.poller.poll_once().await.unwrap();
    assert_eq!(reading.voltage, 220.5);
    assert_eq!(h.stats.failure_streak(), 0);
    assert_eq!(h.stats.failures(), 2);
    assert!(h.stats.last_error().is_none());
}

#[tokio::test]
async fn test_run_polls_until_cancelled() {
    let meter = MockMeter::start().await;
    let h = harness(meter.port, Duration::from_millis(20));
    let token = CancellationToken::new();

    let stats = h.stats.clone();
    let handle = tokio::spawn(h.poller.run(token.child_token()));

    tokio::time::timeout(Duration::from_secs(5), async {
        while stats.successes() < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    token.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    assert!(!h.client.lock().await.is_connected());
    assert!(h.cache.snapshot().is_captured());
}
