//! Common test utilities: an in-process Modbus TCP meter and app state

#![allow(dead_code)]
#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use chrono::Utc;
use meter_protocols::{ConnectionParams, ProtocolClient};
use metersrv::{
    api::{create_router, AppState},
    metrics::MeterMetrics,
    PollerStats, SharedClient, TelemetryCache,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Input registers of the reference meter
///
/// 230.1 V, 1.234 A, 284.0 W, 56789 Wh, 50.0 Hz, PF 0.98, alarm active
pub const REFERENCE_INPUT: [u16; 10] = [2301, 1234, 0, 2840, 0, 56789, 0, 500, 98, 1];

/// Holding register carrying the alarm threshold
pub const THRESHOLD_ADDRESS: u16 = 1;

pub const REFERENCE_THRESHOLD: u16 = 3000;

/// How the mock meter answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterMode {
    Normal,
    /// Every request gets an exception with this code
    Exception(u8),
    /// Holding register reads fail, everything else is normal
    HoldingException,
    /// Read replies are cut after the function code
    Truncated,
    /// Requests are read but never answered
    Silent,
    /// Register reads return one value fewer than requested
    ShortRead,
}

#[derive(Debug)]
pub struct MeterState {
    pub input: Vec<u16>,
    pub holding: Vec<u16>,
    pub mode: MeterMode,
    pub requests: usize,
    pub resets: usize,
}

/// Modbus TCP meter listening on localhost
pub struct MockMeter {
    pub port: u16,
    pub state: Arc<Mutex<MeterState>>,
}

impl MockMeter {
    pub async fn start() -> Self {
        let mut holding = vec![0u16; 8];
        holding[THRESHOLD_ADDRESS as usize] = REFERENCE_THRESHOLD;
        Self::with_registers(REFERENCE_INPUT.to_vec(), holding).await
    }

    pub async fn with_registers(input: Vec<u16>, holding: Vec<u16>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(MeterState {
            input,
            holding,
            mode: MeterMode::Normal,
            requests: 0,
            resets: 0,
        }));

        let shared = state.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let state = shared.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 256];
                    loop {
                        let n = match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => n,
                        };
                        let reply = answer(&buf[..n], &mut state.lock().unwrap());
                        if let Some(reply) = reply {
                            if socket.write_all(&reply).await.is_err() {
                                break;
                            }
                        }
                    }
                });
            }
        });

        Self { port, state }
    }

    pub fn set_mode(&self, mode: MeterMode) {
        self.state.lock().unwrap().mode = mode;
    }

    pub fn set_input(&self, index: usize, value: u16) {
        self.state.lock().unwrap().input[index] = value;
    }

    pub fn holding(&self, index: usize) -> u16 {
        self.state.lock().unwrap().holding[index]
    }

    pub fn input(&self, index: usize) -> u16 {
        self.state.lock().unwrap().input[index]
    }

    pub fn resets(&self) -> usize {
        self.state.lock().unwrap().resets
    }

    pub fn requests(&self) -> usize {
        self.state.lock().unwrap().requests
    }
}

fn exception(header: &[u8], function: u8, code: u8) -> Vec<u8> {
    let mut reply = header[..7].to_vec();
    reply[4] = 0;
    reply[5] = 3;
    reply.extend_from_slice(&[function | 0x80, code]);
    reply
}

fn answer(request: &[u8], state: &mut MeterState) -> Option<Vec<u8>> {
    state.requests += 1;
    if request.len() < 8 {
        return None;
    }
    let function = request[7];

    match state.mode {
        MeterMode::Silent => return None,
        MeterMode::Exception(code) => return Some(exception(request, function, code)),
        MeterMode::HoldingException if function == 0x03 => {
            return Some(exception(request, function, 0x02));
        },
        _ => {},
    }

    match function {
        0x03 | 0x04 => {
            let start = usize::from(u16::from_be_bytes([request[8], request[9]]));
            let mut count = usize::from(u16::from_be_bytes([request[10], request[11]]));
            if state.mode == MeterMode::ShortRead {
                count = count.saturating_sub(1);
            }
            let table = if function == 0x03 {
                &state.holding
            } else {
                &state.input
            };
            let Some(values) = table.get(start..start + count) else {
                return Some(exception(request, function, 0x02));
            };

            let mut reply = request[..7].to_vec();
            let remaining = (3 + count * 2) as u16;
            reply[4..6].copy_from_slice(&remaining.to_be_bytes());
            reply.push(function);
            reply.push((count * 2) as u8);
            for value in values {
                reply.extend_from_slice(&value.to_be_bytes());
            }
            if state.mode == MeterMode::Truncated {
                reply.truncate(8);
            }
            Some(reply)
        },
        0x06 => {
            let address = usize::from(u16::from_be_bytes([request[8], request[9]]));
            let value = u16::from_be_bytes([request[10], request[11]]);
            match state.holding.get_mut(address) {
                Some(slot) => {
                    *slot = value;
                    Some(request[..12].to_vec())
                },
                None => Some(exception(request, function, 0x02)),
            }
        },
        0x42 => {
            state.resets += 1;
            if state.input.len() >= 7 {
                state.input[5] = 0;
                state.input[6] = 0;
            }
            Some(request.to_vec())
        },
        _ => Some(exception(request, function, 0x01)),
    }
}

/// Port with nothing listening on it
pub fn unreachable_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub fn shared_client(port: u16) -> SharedClient {
    Arc::new(tokio::sync::Mutex::new(ProtocolClient::new(
        ConnectionParams::new("127.0.0.1", port, Duration::from_millis(300)),
        1,
    )))
}

/// App state wired to a meter on `port`
pub fn create_test_state(port: u16) -> AppState {
    AppState {
        client: shared_client(port),
        cache: Arc::new(TelemetryCache::new()),
        stats: Arc::new(PollerStats::default()),
        metrics: Arc::new(MeterMetrics::new("test-meter").unwrap()),
        threshold_address: THRESHOLD_ADDRESS,
        service_name: "metersrv".to_string(),
        version: "0.0.0-test".to_string(),
        started_at: Utc::now(),
    }
}

pub fn create_test_router(state: AppState) -> axum::Router {
    create_router(state)
}
