//! Per-connection proxy flow: read the request head, pick a backend from the
//! `Host` header, forward, relay, close.

use std::time::Duration;

use anyhow::Result;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::http::parser::find_headers_end;
use crate::http::writer::ResponseWriter;
use crate::proxy::routing::RoutingTable;
use crate::proxy::upstream::{BACKEND_UNAVAILABLE, Upstream};

const READ_CHUNK: usize = 4096;

/// Returns the hostname from the first `Host:` line, without any `:port`.
pub fn extract_host(request: &str) -> Option<String> {
    request
        .lines()
        .find(|line| line.to_ascii_lowercase().starts_with("host:"))
        .and_then(|line| line.split_once(':'))
        .and_then(|(_, value)| value.trim().split(':').next())
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

/// Accumulates client bytes until the header terminator, EOF, or `limit`
/// elapses on a single read.
pub async fn read_request_head<S>(stream: &mut S, limit: Duration) -> Vec<u8>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(READ_CHUNK);

    loop {
        match timeout(limit, stream.read_buf(&mut buffer)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(_)) => {
                if find_headers_end(&buffer).is_some() {
                    break;
                }
            }
            Ok(Err(e)) => {
                debug!(error = %e, "Client read failed");
                break;
            }
            Err(_) => break,
        }
    }

    buffer.to_vec()
}

/// Serves one proxied exchange on `stream`.
///
/// A request without a `Host` header gets no response; the connection is
/// simply closed.
pub async fn handle_client<S>(
    mut stream: S,
    routes: &RoutingTable,
    upstream: &Upstream,
    client_timeout: Duration,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let raw = read_request_head(&mut stream, client_timeout).await;
    let request = String::from_utf8_lossy(&raw).into_owned();

    let Some(hostname) = extract_host(&request) else {
        let first_line = request.split("\r\n").next().unwrap_or_default();
        if !first_line.trim().is_empty() {
            warn!(request_line = first_line, "Skipping request without Host header");
        }
        stream.shutdown().await?;
        return Ok(());
    };

    let (host, port) = routes.resolve(&hostname);
    if port.parse::<u16>().is_err() {
        warn!(hostname = %hostname, port = %port, "Resolved port is not a valid integer");
    }

    let response = if host.is_empty() {
        warn!(hostname = %hostname, "Resolved an empty backend host");
        BACKEND_UNAVAILABLE.to_vec()
    } else {
        info!(hostname = %hostname, backend.host = %host, backend.port = %port, "Forwarding request");
        upstream.forward(&host, &port, &raw).await
    };

    ResponseWriter::new(response)
        .write_to_stream(&mut stream)
        .await?;
    stream.shutdown().await?;

    Ok(())
}
