use crate::http::headers::HeaderMap;
use crate::http::request::Method;
use thiserror::Error;

/// Path the bare root `/` is normalized to.
pub const INDEX_PATH: &str = "/index";

/// `GET` on this path is served as [`CHAT_PAGE_PATH`].
pub const SUBMIT_INFO_PATH: &str = "/submit-info";
pub const CHAT_PAGE_PATH: &str = "/chat.html";

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("request line must have exactly three tokens: {0:?}")]
    MalformedRequestLine(String),
    #[error("form pair without '=': {0:?}")]
    MalformedFormPair(String),
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// The three tokens of a request line after path normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub path: String,
    pub version: String,
}

/// Splits `METHOD SP TARGET SP VERSION` and applies the fixed path aliases.
pub fn parse_request_line(line: &str) -> Result<RequestLine, ParseError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let [method, path, version] = parts.as_slice() else {
        return Err(ParseError::MalformedRequestLine(line.to_string()));
    };

    let method = Method::parse(method);
    let path = if *path == "/" {
        INDEX_PATH.to_string()
    } else if *path == SUBMIT_INFO_PATH && method == Method::GET {
        CHAT_PAGE_PATH.to_string()
    } else {
        path.to_string()
    };

    Ok(RequestLine {
        method,
        path,
        version: version.to_string(),
    })
}

/// Collects `name: value` lines between the request line and the blank line.
///
/// Names are case-folded on storage. Lines without `": "` are ignored.
pub fn parse_header_lines(head: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for line in head.split("\r\n").skip(1) {
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(": ") {
            headers.insert(key.to_lowercase(), value);
        }
    }

    headers
}

/// Returns the text after the first blank-line terminator, if there is one.
pub fn split_body(raw: &str) -> Option<&str> {
    raw.split_once("\r\n\r\n").map(|(_, body)| body)
}

pub fn parse_json(body: &str) -> Result<serde_json::Value, ParseError> {
    Ok(serde_json::from_str(body)?)
}

/// Splits `k=v&k2=v2` into ordered pairs. Any pair lacking `=` fails the whole body.
pub fn parse_form(body: &str) -> Result<Vec<(String, String)>, ParseError> {
    body.split('&')
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| ParseError::MalformedFormPair(pair.to_string()))
        })
        .collect()
}

pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let line = parse_request_line("GET / HTTP/1.1").unwrap();

        assert_eq!(line.method, Method::GET);
        assert_eq!(line.path, "/index");
        assert_eq!(line.version, "HTTP/1.1");
    }

    #[test]
    fn headers_stop_at_blank_line() {
        let headers = parse_header_lines("GET / HTTP/1.1\r\nHost: a\r\n\r\nX-Body: b");

        assert_eq!(headers.get("host"), Some("a"));
        assert!(!headers.contains("x-body"));
    }
}
