//! Control operations on the meter
//!
//! Shared by the start-up actions and the HTTP control API. Errors are
//! returned to the caller; nothing here retries.

use crate::cache::TelemetryCache;
use crate::error::Result;
use crate::poller::SharedClient;
use tracing::{error, info, warn};

/// Write the alarm threshold register and mirror it into the cache
pub async fn set_alarm_threshold(
    client: &SharedClient,
    cache: &TelemetryCache,
    address: u16,
    watts: u16,
) -> Result<()> {
    client
        .lock()
        .await
        .write_single_register(address, watts)
        .await?;
    cache.set_threshold(watts);
    info!("Alarm threshold set to {}W", watts);
    Ok(())
}

/// Zero the cumulative energy counter
pub async fn reset_energy(client: &SharedClient) -> Result<()> {
    client.lock().await.reset_energy_counter().await?;
    info!("Energy counter reset");
    Ok(())
}

/// Read the threshold register once and store it in the cache
pub async fn refresh_threshold(
    client: &SharedClient,
    cache: &TelemetryCache,
    address: u16,
) -> Result<u16> {
    let values = client
        .lock()
        .await
        .read_holding_registers(address, 1)
        .await?;
    let watts = values.first().copied().unwrap_or_default();
    cache.set_threshold(watts);
    Ok(watts)
}

/// One-shot actions requested on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct StartupActions {
    pub reset_energy: bool,
    pub set_alarm: Option<u16>,
}

/// Run start-up actions, then log the current threshold
///
/// Failures are logged; the service keeps starting.
pub async fn run_startup_actions(
    client: &SharedClient,
    cache: &TelemetryCache,
    actions: StartupActions,
    threshold_address: u16,
) {
    if actions.reset_energy {
        if let Err(e) = reset_energy(client).await {
            error!("Failed to reset energy counter: {}", e);
        }
    }

    if let Some(watts) = actions.set_alarm {
        if let Err(e) = set_alarm_threshold(client, cache, threshold_address, watts).await {
            error!("Failed to set alarm threshold: {}", e);
        }
    }

    match refresh_threshold(client, cache, threshold_address).await {
        Ok(watts) => info!("Current alarm threshold: {}W", watts),
        Err(e) => warn!("Failed to read alarm threshold: {}", e),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use meter_protocols::{ConnectionParams, ProtocolClient};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tracing_test::traced_test;

    /// Gateway that echoes every frame back; valid for writes and resets
    async fn spawn_echo() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 256];
                    while let Ok(n) = socket.read(&mut buf).await {
                        if n == 0 || socket.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });
        port
    }

    fn unreachable_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    fn shared_client(port: u16) -> SharedClient {
        Arc::new(tokio::sync::Mutex::new(ProtocolClient::new(
            ConnectionParams::new("127.0.0.1", port, Duration::from_millis(300)),
            1,
        )))
    }

    #[tokio::test]
    async fn test_set_alarm_threshold_updates_cache() {
        let client = shared_client(spawn_echo().await);
        let cache = TelemetryCache::new();

        set_alarm_threshold(&client, &cache, 1, 2500).await.unwrap();
        assert_eq!(cache.get_threshold(), 2500);
        assert_eq!(cache.snapshot().alarm_threshold, 2500);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache() {
        let client = shared_client(unreachable_port());
        let cache = TelemetryCache::new();
        cache.set_threshold(100);

        assert!(set_alarm_threshold(&client, &cache, 1, 2500).await.is_err());
        assert_eq!(cache.get_threshold(), 100);
    }

    #[tokio::test]
    async fn test_reset_energy_acknowledged() {
        let client = shared_client(spawn_echo().await);
        reset_energy(&client).await.unwrap();
    }

    #[tokio::test]
    #[traced_test]
    async fn test_startup_actions_log_failures_and_continue() {
        let client = shared_client(unreachable_port());
        let cache = TelemetryCache::new();
        let actions = StartupActions {
            reset_energy: true,
            set_alarm: Some(1500),
        };

        run_startup_actions(&client, &cache, actions, 1).await;

        assert!(logs_contain("Failed to reset energy counter"));
        assert!(logs_contain("Failed to set alarm threshold"));
        assert!(logs_contain("Failed to read alarm threshold"));
        assert_eq!(cache.get_threshold(), 0);
    }
}
