use std::time::SystemTime;

use httpdate::fmt_http_date;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::HeaderMap;
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};

const HTTP_VERSION: &str = "HTTP/1.1";

pub const SERVER_NAME: &str = concat!("gatehouse/", env!("CARGO_PKG_VERSION"));

/// Header names are left-aligned in a column of this width.
const HEADER_COLUMN: usize = 25;

/// Written when a handler fails; the connection is closed right after.
pub const SERVER_ERROR_RESPONSE: &[u8] =
    b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n";

const NOT_FOUND_PAGE: &[u8] = b"HTTP/1.1 404 Not Found\r\n\
Accept-Ranges: bytes\r\n\
Content-Type: text/html\r\n\
Content-Length: 13\r\n\
Cache-Control: max-age=86000\r\n\
Connection: close\r\n\
\r\n\
404 Not Found";

/// The fixed 404 page, identical for every request.
pub fn not_found_page() -> Vec<u8> {
    NOT_FOUND_PAGE.to_vec()
}

fn http_date() -> String {
    fmt_http_date(SystemTime::now())
}

/// Fixed `204 No Content` answer to a CORS preflight.
///
/// The request `Origin` is echoed with credentials allowed; without one the
/// origin is `*` and credentials are never advertised.
pub fn preflight(req: &Request) -> Vec<u8> {
    let origin = req.header("Origin").filter(|o| !o.is_empty());
    let allow_origin = origin.unwrap_or("*");

    tracing::debug!(path = ?req.path, origin = allow_origin, "CORS preflight");

    let mut out = String::new();
    out.push_str("HTTP/1.1 204 No Content\r\n");
    out.push_str(&format!("Server: {}\r\n", SERVER_NAME));
    out.push_str(&format!("Date: {}\r\n", http_date()));
    out.push_str(&format!("Access-Control-Allow-Origin: {}\r\n", allow_origin));
    if origin.is_some() {
        out.push_str("Access-Control-Allow-Credentials: true\r\n");
    }
    out.push_str("Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n");
    out.push_str("Access-Control-Allow-Headers: Content-Type, Cookie, Authorization\r\n");
    out.push_str("Connection: close\r\n");
    out.push_str("\r\n");
    out.into_bytes()
}

fn header_line(key: &str, value: &str) -> String {
    format!("{:<width$} {}\r\n", format!("{}:", key), value, width = HEADER_COLUMN)
}

/// Baseline headers every rendered response starts from.
fn baseline_headers(resp: &Response, req: &Request) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Accept", req.headers.get_or("Accept", "application/json"));
    headers.insert(
        "Accept-Language",
        req.headers.get_or("Accept-Language", "en-US,en;q=0.9"),
    );
    headers.insert("Server", SERVER_NAME);
    headers.insert("Date", http_date());
    headers.insert(
        "Content-Type",
        resp.headers.get_or("Content-Type", "text/html"),
    );
    headers.insert(
        "Content-Length",
        resp.body.as_ref().map_or(0, Vec::len).to_string(),
    );
    headers.insert("Connection", "close");
    if let Some(agent) = req.header("User-Agent") {
        headers.insert("User-Agent", agent);
    }
    headers.insert("Cache-Control", "no-cache");
    headers
}

/// Renders the status line, headers and `Set-Cookie` lines, up to and
/// including the blank line.
pub fn render_head(resp: &Response, req: &Request) -> Vec<u8> {
    let status = resp.status.unwrap_or(StatusCode::OK);
    let mut out = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        status.as_u16(),
        status.reason_phrase()
    );

    if status == StatusCode::NO_CONTENT {
        out.push_str(&format!("Server: {}\r\n", SERVER_NAME));
        out.push_str(&format!("Date: {}\r\n", http_date()));
        out.push_str("Connection: close\r\n");
        for (k, v) in resp.headers.iter() {
            if k.to_ascii_lowercase().starts_with("access-control") {
                out.push_str(&format!("{}: {}\r\n", k, v));
            }
        }
        out.push_str("\r\n");
        return out.into_bytes();
    }

    let mut headers = baseline_headers(resp, req);
    headers.merge(&resp.headers);

    for (k, v) in headers.iter() {
        out.push_str(&header_line(k, v));
    }

    for (name, value) in &resp.cookies {
        out.push_str(&format!("Set-Cookie: {}={}\r\n", name, value));
    }

    out.push_str("\r\n");
    out.into_bytes()
}

/// Head followed by the body. A 204 never carries a body.
pub fn serialize_response(resp: &Response, req: &Request) -> Vec<u8> {
    let mut buf = render_head(resp, req);

    if resp.status != Some(StatusCode::NO_CONTENT) {
        if let Some(body) = &resp.body {
            buf.extend_from_slice(body);
        }
    }

    buf
}

/// Writes an already-rendered response, tolerating short writes.
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(buffer: Vec<u8>) -> Self {
        Self { buffer, written: 0 }
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }
}
