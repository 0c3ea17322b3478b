//! Upstream connection and request forwarding
//!
//! Sends the client's bytes to the resolved backend verbatim and relays
//! whatever comes back. Every connection-level failure is answered with the
//! same fixed `404 Not Found`.

use std::time::Duration;

use anyhow::{Context, Result};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Default buffer size for relaying
const BUFFER_SIZE: usize = 4096;

/// Answer sent when the backend cannot be reached.
pub const BACKEND_UNAVAILABLE: &[u8] = b"HTTP/1.1 404 Not Found\r\n\
Content-Type: text/plain\r\n\
Content-Length: 13\r\n\
Connection: close\r\n\
\r\n\
404 Not Found";

/// Forwards raw requests to backend servers.
#[derive(Debug, Clone)]
pub struct Upstream {
    /// Connection timeout duration
    connect_timeout: Duration,

    /// Per-read timeout; hitting it ends the response
    read_timeout: Duration,
}

impl Upstream {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            read_timeout,
        }
    }

    /// Forwards `request` to `host:port` and returns the raw response bytes.
    ///
    /// The port is used exactly as resolved, even if it is not numeric.
    pub async fn forward(&self, host: &str, port: &str, request: &[u8]) -> Vec<u8> {
        match self.relay(host, port, request).await {
            Ok(response) => {
                tracing::info!(
                    backend.host = host,
                    backend.port = port,
                    bytes = response.len(),
                    "Request forwarded"
                );
                response
            }
            Err(e) => {
                tracing::warn!(
                    backend.host = host,
                    backend.port = port,
                    error = %e,
                    "Backend unavailable"
                );
                BACKEND_UNAVAILABLE.to_vec()
            }
        }
    }

    async fn relay(&self, host: &str, port: &str, request: &[u8]) -> Result<Vec<u8>> {
        let addr = format!("{}:{}", host, port);
        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .context("Connection timeout")?
            .context("Failed to connect to backend")?;

        tracing::trace!(backend = %addr, "Connected to backend");

        stream.write_all(request).await?;
        stream.flush().await?;

        let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);
        loop {
            match timeout(self.read_timeout, stream.read_buf(&mut buffer)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(e).context("Failed to read from backend"),
                Err(_) => {
                    tracing::debug!(backend = %addr, "Backend read timed out, relaying what arrived");
                    break;
                }
            }
        }

        Ok(buffer.to_vec())
    }
}
