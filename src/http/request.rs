use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::http::cookie::parse_cookie_header;
use crate::http::handler::{Handler, Router};
use crate::http::headers::HeaderMap;
use crate::http::parser::{self, ParseError};

/// HTTP request methods.
///
/// Any token is accepted as a method; the standard verbs get their own
/// variants and everything else is carried verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options (CORS preflight)
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// Any other token, case preserved
    Other(String),
}

impl Method {
    /// Parses a method token. Matching is case-sensitive, as on the wire.
    ///
    /// # Example
    ///
    /// ```
    /// # use gatehouse::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Method::GET);
    /// assert_eq!(Method::parse("get"), Method::Other("get".to_string()));
    /// ```
    pub fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Other(s) => s,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured body assigned through [`Request::set_body`].
///
/// Each variant fixes the `Content-Type` it is sent with.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Serialized as JSON, `application/json`
    Json(Value),
    /// URL-encoded pairs, `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// Raw bytes, `application/octet-stream`
    Bytes(Vec<u8>),
    /// UTF-8 text, `text/plain`
    Text(String),
    /// File contents sent as-is, `multipart/form-data`
    File(Vec<u8>),
}

impl Body {
    pub fn content_type(&self) -> &'static str {
        match self {
            Body::Json(_) => "application/json",
            Body::Form(_) => "application/x-www-form-urlencoded",
            Body::Bytes(_) => "application/octet-stream",
            Body::Text(_) => "text/plain",
            Body::File(_) => "multipart/form-data",
        }
    }

    /// Encodes the body to the bytes that go on the wire.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Body::Json(value) => serde_json::to_vec(value).unwrap_or_default(),
            Body::Form(pairs) => serde_urlencoded::to_string(pairs)
                .unwrap_or_default()
                .into_bytes(),
            Body::Bytes(bytes) | Body::File(bytes) => bytes.clone(),
            Body::Text(text) => text.as_bytes().to_vec(),
        }
    }
}

/// A parsed inbound request.
///
/// Built once by [`Request::prepare`]. `method`, `path` and `version` are
/// `None` when the request line could not be split; such a request is
/// unroutable.
#[derive(Clone, Default)]
pub struct Request {
    pub method: Option<Method>,
    /// Normalized request target. Rewritten in place during MIME resolution.
    pub path: Option<String>,
    pub version: Option<String>,
    pub headers: HeaderMap,
    pub cookies: HashMap<String, String>,
    pub body: Vec<u8>,
    pub json: Option<Value>,
    pub form: Option<Vec<(String, String)>>,
    /// Handler bound from the route table for `(method, path)`.
    pub handler: Option<Arc<dyn Handler>>,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("body_len", &self.body.len())
            .field("json", &self.json)
            .field("form", &self.form)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

impl Request {
    /// Parses raw request bytes into a request, binding a handler when a
    /// route table is supplied.
    ///
    /// Never fails: an unsplittable request line leaves method and path unset,
    /// an invalid JSON body becomes an empty object, and a malformed form body
    /// resets body, json and form.
    pub fn prepare(raw: &[u8], routes: Option<&Router>) -> Self {
        let text = String::from_utf8_lossy(raw);
        let mut req = Request::default();

        match parser::parse_request_line(text.lines().next().unwrap_or_default()) {
            Ok(line) => {
                req.method = Some(line.method);
                req.path = Some(line.path);
                req.version = Some(line.version);
            }
            Err(e) => warn!(error = %e, "Unroutable request"),
        }

        req.headers = parser::parse_header_lines(&text);

        debug!(
            method = ?req.method,
            path = ?req.path,
            version = ?req.version,
            "Prepared request"
        );

        if let (Some(router), Some(method), Some(path)) = (routes, &req.method, &req.path) {
            req.handler = router.lookup(method, path);
        }

        req.cookies = parse_cookie_header(req.headers.get_or("cookie", ""));

        if let Err(e) = req.prepare_wire_body(&text) {
            warn!(error = %e, "Failed to parse body");
            req.body.clear();
            req.json = None;
            req.form = None;
        }

        req
    }

    fn prepare_wire_body(&mut self, text: &str) -> Result<(), ParseError> {
        let Some(body) = parser::split_body(text) else {
            return Ok(());
        };

        let content_type = self.headers.get_or("content-type", "").to_lowercase();

        if content_type.contains("application/json") {
            let value = parser::parse_json(body).unwrap_or_else(|e| {
                debug!(error = %e, "Invalid JSON body, using empty object");
                Value::Object(Default::default())
            });
            self.set_body(Body::Json(value));
        } else if content_type.contains("application/x-www-form-urlencoded") {
            let form = parser::parse_form(body)?;
            self.set_body(Body::Form(form));
        } else if !body.trim().is_empty() {
            self.set_body(Body::Text(body.to_string()));
        }

        Ok(())
    }

    /// Assigns a body, forcing its `Content-Type` and re-synchronizing
    /// `Content-Length` with the encoded size.
    pub fn set_body(&mut self, body: Body) {
        self.body = body.encode();
        self.headers.insert("Content-Type", body.content_type());

        match body {
            Body::Json(value) => self.json = Some(value),
            Body::Form(pairs) => self.form = Some(pairs),
            _ => {}
        }

        self.headers
            .insert("Content-Length", self.body.len().to_string());
    }

    /// Retrieves a header value by name, ignoring case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// Retrieves the Content-Length header value and parses it as a usize.
    ///
    /// Returns 0 if the header is missing or not a valid number.
    pub fn content_length(&self) -> usize {
        self.header("Content-Length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// First value for `key` in the parsed form body.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_method(&self, method: &Method) -> bool {
        self.method.as_ref() == Some(method)
    }
}

/// Builder for constructing Request objects without going through the wire format.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    version: Option<String>,
    headers: HeaderMap,
    body: Option<Body>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        let mut req = Request {
            method: Some(self.method.ok_or("method missing")?),
            path: Some(self.path.ok_or("path missing")?),
            version: Some(self.version.unwrap_or_else(|| "HTTP/1.1".to_string())),
            headers: self.headers,
            ..Request::default()
        };

        if let Some(body) = self.body {
            req.set_body(body);
        }

        Ok(req)
    }
}
