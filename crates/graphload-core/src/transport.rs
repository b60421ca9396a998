//! Payload delivery mechanisms
//!
//! A [`Transport`] delivers one logical connection's payload and reports the
//! outcome. The stream variants dial a fresh socket per logical connection;
//! the HTTP variant issues a single GET per logical connection through a
//! shared client. Sockets are closed on every exit path by scope.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use crate::config::{LoadConfig, Protocol};
use crate::error::{LoadError, Result};
use crate::payload;

/// A unit of work: one logical connection
///
/// The point count is copied from the config at dispatch time, so a ramp
/// step between iterations never changes work already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionTask {
    /// Logical connection index within the iteration
    pub index: u64,

    /// Data points to write for this connection
    pub points: u64,
}

/// Outcome of delivering one logical connection's payload
///
/// Never raised as a fatal condition; the dispatcher tallies failures and
/// the iteration proceeds.
#[derive(Debug)]
pub struct SendOutcome {
    /// Whether the payload was delivered
    pub success: bool,

    /// Bytes written on success
    pub bytes_sent: Option<u64>,

    /// Wall-clock time from dial start to completion or failure
    pub latency: Duration,

    /// Failure detail, carrying the connection index
    pub error: Option<LoadError>,
}

impl SendOutcome {
    /// Successful delivery
    pub fn ok(bytes_sent: u64, latency: Duration) -> Self {
        Self {
            success: true,
            bytes_sent: Some(bytes_sent),
            latency,
            error: None,
        }
    }

    /// Failed delivery
    pub fn failed(error: LoadError, latency: Duration) -> Self {
        Self {
            success: false,
            bytes_sent: None,
            latency,
            error: Some(error),
        }
    }
}

/// Polymorphic delivery seam between the dispatcher and the wire
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one logical connection's payload. Never retries.
    async fn send(&self, task: ConnectionTask) -> SendOutcome;
}

/// Select the transport for the configured protocol, once at startup
pub fn for_config(config: &LoadConfig) -> Result<Arc<dyn Transport>> {
    match config.protocol {
        Protocol::Tcp | Protocol::Udp => Ok(Arc::new(StreamTransport::new(config))),
        Protocol::Http | Protocol::Https => Ok(Arc::new(HttpTransport::new(config)?)),
    }
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Tcp,
    Udp,
}

/// Byte-stream delivery: one dial and one write per logical connection
pub struct StreamTransport {
    host: String,
    kind: StreamKind,
    prefix: String,
    dial_timeout: Duration,
}

impl StreamTransport {
    pub fn new(config: &LoadConfig) -> Self {
        let kind = match config.protocol {
            Protocol::Udp => StreamKind::Udp,
            _ => StreamKind::Tcp,
        };
        Self {
            host: config.host.clone(),
            kind,
            prefix: config.prefix.clone(),
            dial_timeout: config.dial_timeout,
        }
    }

    async fn deliver(&self, task: ConnectionTask, buf: &[u8]) -> Result<u64> {
        match self.kind {
            StreamKind::Tcp => {
                let mut stream = timeout(self.dial_timeout, TcpStream::connect(self.host.as_str()))
                    .await
                    .map_err(|_| LoadError::connect(task.index, "dial timed out"))?
                    .map_err(|e| LoadError::connect(task.index, e.to_string()))?;
                stream
                    .write_all(buf)
                    .await
                    .map_err(|e| LoadError::send(task.index, e.to_string()))?;
                Ok(buf.len() as u64)
            }
            StreamKind::Udp => {
                let socket = timeout(self.dial_timeout, async {
                    let socket = UdpSocket::bind("0.0.0.0:0").await?;
                    socket.connect(self.host.as_str()).await?;
                    Ok::<_, std::io::Error>(socket)
                })
                .await
                .map_err(|_| LoadError::connect(task.index, "dial timed out"))?
                .map_err(|e| LoadError::connect(task.index, e.to_string()))?;
                let written = socket
                    .send(buf)
                    .await
                    .map_err(|e| LoadError::send(task.index, e.to_string()))?;
                Ok(written as u64)
            }
        }
    }
}

#[async_trait]
impl Transport for StreamTransport {
    async fn send(&self, task: ConnectionTask) -> SendOutcome {
        let timestamp = chrono::Utc::now().timestamp();
        let buf = payload::lines(&self.prefix, task.index, task.points, timestamp);

        let started = Instant::now();
        match self.deliver(task, &buf).await {
            Ok(written) => SendOutcome::ok(written, started.elapsed()),
            Err(error) => SendOutcome::failed(error, started.elapsed()),
        }
    }
}

/// Stateless request delivery: one GET per logical connection
pub struct HttpTransport {
    client: reqwest::Client,
    base: String,
    prefix: String,
}

impl HttpTransport {
    pub fn new(config: &LoadConfig) -> Result<Self> {
        let scheme = match config.protocol {
            Protocol::Https => "https",
            _ => "http",
        };
        let client = reqwest::Client::builder()
            .connect_timeout(config.dial_timeout)
            .build()
            .map_err(|e| LoadError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base: format!("{scheme}://{}", config.host),
            prefix: config.prefix.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, task: ConnectionTask) -> SendOutcome {
        let timestamp = chrono::Utc::now().timestamp();
        let path = payload::query(&self.prefix, task.index, task.points, timestamp);
        let url = format!("{}{}", self.base, path);

        let started = Instant::now();
        match self.client.get(&url).send().await {
            Ok(response) => {
                // Drain the body so the pool can reuse the connection. The
                // content is not inspected, and neither is the status code:
                // any completed request counts as delivered.
                match response.bytes().await {
                    Ok(_) => SendOutcome::ok(url.len() as u64, started.elapsed()),
                    Err(e) => SendOutcome::failed(
                        LoadError::send(task.index, e.to_string()),
                        started.elapsed(),
                    ),
                }
            }
            Err(e) => {
                let error = if e.is_connect() || e.is_timeout() {
                    LoadError::connect(task.index, e.to_string())
                } else {
                    LoadError::send(task.index, e.to_string())
                };
                SendOutcome::failed(error, started.elapsed())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadConfig;

    #[test]
    fn test_outcome_constructors() {
        let ok = SendOutcome::ok(128, Duration::from_micros(42));
        assert!(ok.success);
        assert_eq!(ok.bytes_sent, Some(128));
        assert!(ok.error.is_none());

        let failed = SendOutcome::failed(LoadError::connect(1, "refused"), Duration::ZERO);
        assert!(!failed.success);
        assert!(failed.bytes_sent.is_none());
        assert!(matches!(failed.error, Some(LoadError::Connect { .. })));
    }

    #[test]
    fn test_for_config_accepts_every_protocol() {
        for protocol in [Protocol::Tcp, Protocol::Udp, Protocol::Http, Protocol::Https] {
            let config = LoadConfig {
                protocol,
                ..Default::default()
            };
            assert!(for_config(&config).is_ok());
        }
    }

    #[tokio::test]
    async fn test_tcp_dial_failure_is_connect_error() {
        // nothing listens on the discard port of loopback
        let config = LoadConfig {
            host: "127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let transport = StreamTransport::new(&config);
        let outcome = transport.send(ConnectionTask { index: 5, points: 1 }).await;
        assert!(!outcome.success);
        assert!(matches!(outcome.error, Some(LoadError::Connect { index: 5, .. })));
    }
}
