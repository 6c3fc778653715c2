//! Modbus TCP Transport Session
//!
//! Owns at most one TCP connection to the meter. The connection is opened
//! lazily on the first exchange, and torn down on any socket failure so the
//! next exchange reconnects transparently.

use super::codec::hex_frame;
use super::constants::RESPONSE_BUFFER_SIZE;
use crate::error::{ProtocolError, Result};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Target endpoint and per-operation timeout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    /// Applies separately to connect, send and receive
    pub timeout: Duration,
}

impl ConnectionParams {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Session state
#[derive(Debug)]
enum SessionState {
    Disconnected,
    Connected(TcpStream),
}

/// Lazily connected TCP session to a single device
#[derive(Debug)]
pub struct TransportSession {
    params: ConnectionParams,
    state: SessionState,
}

impl TransportSession {
    /// Create a session in the disconnected state; no I/O happens here
    pub fn new(params: ConnectionParams) -> Self {
        Self {
            params,
            state: SessionState::Disconnected,
        }
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected(_))
    }

    /// Open a fresh connection, replacing any held one
    ///
    /// On failure the session stays Disconnected and the error is returned.
    pub async fn connect(&mut self) -> Result<()> {
        self.close();
        let stream = Self::connect_tcp(&self.params).await?;
        self.state = SessionState::Connected(stream);
        Ok(())
    }

    async fn connect_tcp(params: &ConnectionParams) -> Result<TcpStream> {
        let addr = params.address();
        debug!("TCP connecting: {}", addr);

        match timeout(params.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("TCP_NODELAY: {}", e);
                }

                info!("TCP connected: {}", addr);
                Ok(stream)
            },
            Ok(Err(e)) => {
                error!("TCP err: {} - {}", addr, e);
                Err(ProtocolError::connect(format!(
                    "Failed to connect to {addr}: {e}"
                )))
            },
            Err(_) => {
                warn!("TCP timeout: {}", addr);
                Err(ProtocolError::connect(format!(
                    "Connection to {addr} timed out"
                )))
            },
        }
    }

    /// Send one request frame and return whatever a single receive yields
    ///
    /// An empty buffer means the peer closed the connection; the session is
    /// torn down and the caller's decoder classifies the empty response.
    pub async fn send_and_receive(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        if !self.is_connected() {
            self.connect().await?;
        }

        let result = self.exchange(request).await;
        match &result {
            Err(e) => {
                warn!("TCP exchange failed, resetting session: {}", e);
                self.close();
            },
            Ok(data) if data.is_empty() => {
                debug!("TCP peer closed connection");
                self.close();
            },
            Ok(_) => {},
        }
        result
    }

    async fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        let io_timeout = self.params.timeout;
        let SessionState::Connected(stream) = &mut self.state else {
            return Err(ProtocolError::io("Not connected"));
        };

        debug!("TCP TX: {}", hex_frame(request));
        match timeout(io_timeout, stream.write_all(request)).await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => {
                error!("TCP TX: {}", e);
                return Err(ProtocolError::io(format!("TCP send error: {e}")));
            },
            Err(_) => {
                return Err(ProtocolError::io("TCP send timeout"));
            },
        }

        let mut buffer = vec![0u8; RESPONSE_BUFFER_SIZE];
        match timeout(io_timeout, stream.read(&mut buffer)).await {
            Ok(Ok(n)) => {
                buffer.truncate(n);
                debug!("TCP RX: {}B [{}]", n, hex_frame(&buffer));
                Ok(buffer)
            },
            Ok(Err(e)) => {
                error!("TCP RX: {}", e);
                Err(ProtocolError::io(format!("TCP read error: {e}")))
            },
            Err(_) => {
                debug!("TCP RX timeout");
                Err(ProtocolError::io("TCP read timeout"))
            },
        }
    }

    /// Drop the connection; idempotent
    pub fn close(&mut self) {
        if let SessionState::Connected(_) =
            std::mem::replace(&mut self.state, SessionState::Disconnected)
        {
            info!("TCP closed: {}", self.params.address());
        }
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        self.close();
    }
}
