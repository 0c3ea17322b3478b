//! Outbound request primitive used by application code (not by the proxy).
//!
//! Serializes one request, writes it, half-closes the socket to mark the end
//! of the request, then reads until the peer closes.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

use crate::http::headers::HeaderMap;
use crate::http::request::{Body, Method};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Client {
    /// Forwarding intermediary to connect to instead of the URL's own host.
    via: Option<String>,
    timeout: Duration,
}

impl Default for Client {
    fn default() -> Self {
        Self {
            via: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Client {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes every request through `addr` (`host:port`), e.g. the local proxy.
    pub fn via(mut self, addr: impl Into<String>) -> Self {
        self.via = Some(addr.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Serializes the request bytes for `url`.
    ///
    /// `Host`, `Connection: close` and `Content-Length` are always set; the
    /// body's content type is used unless `headers` already carries one.
    pub fn build_request(
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&Body>,
    ) -> Result<Vec<u8>> {
        let host = url.host_str().context("URL missing host")?;

        let mut target = match url.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        let payload = body.map(Body::encode).unwrap_or_default();

        let mut headers = headers.clone();
        if let Some(body) = body {
            if !headers.contains("Content-Type") {
                headers.insert("Content-Type", body.content_type());
            }
        }
        headers.insert("Host", host);
        headers.insert("Connection", "close");
        headers.insert("Content-Length", payload.len().to_string());

        let mut buffer = format!("{} {} HTTP/1.1\r\n", method, target).into_bytes();
        for (key, value) in headers.iter() {
            buffer.extend_from_slice(format!("{}: {}\r\n", key, value).as_bytes());
        }
        buffer.extend_from_slice(b"\r\n");
        buffer.extend_from_slice(&payload);

        Ok(buffer)
    }

    /// Sends one request and returns the raw response text.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<Body>,
    ) -> Result<String> {
        let url = Url::parse(url).context("Invalid request URL")?;
        let request = Self::build_request(&method, &url, &headers, body.as_ref())?;

        let dest = match &self.via {
            Some(addr) => addr.clone(),
            None => {
                let host = url.host_str().context("URL missing host")?;
                let port = url.port_or_known_default().unwrap_or(80);
                format!("{}:{}", host, port)
            }
        };

        tracing::debug!(%url, dest = %dest, method = %method, "Sending request");

        let mut stream = timeout(self.timeout, TcpStream::connect(&dest))
            .await
            .context("Connection timeout")?
            .with_context(|| format!("Failed to connect to {}", dest))?;

        stream.write_all(&request).await?;
        stream.shutdown().await?;

        let mut response = Vec::new();
        timeout(self.timeout, stream.read_to_end(&mut response))
            .await
            .context("Response timeout")??;

        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}
