use serde::Serialize;
use tracing::{debug, error, warn};

use crate::http::cookie::{CookieOptions, format_cookie_value};
use crate::http::files::{self, FileOutcome, StorageRoots};
use crate::http::headers::HeaderMap;
use crate::http::mime::{self, Storage};
use crate::http::request::{Method, Request};
use crate::http::writer;

/// HTTP status code.
///
/// Any `u16` is representable; [`StatusCode::reason_phrase`] knows a fixed set
/// and renders every other code as `OK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const CREATED: StatusCode = StatusCode(201);
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    pub const MOVED_PERMANENTLY: StatusCode = StatusCode(301);
    pub const FOUND: StatusCode = StatusCode(302);
    pub const SEE_OTHER: StatusCode = StatusCode(303);
    pub const NOT_MODIFIED: StatusCode = StatusCode(304);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use gatehouse::http::response::StatusCode;
    /// assert_eq!(StatusCode::OK.as_u16(), 200);
    /// assert_eq!(StatusCode::NOT_FOUND.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Returns the reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use gatehouse::http::response::StatusCode;
    /// assert_eq!(StatusCode::FOUND.reason_phrase(), "Found");
    /// assert_eq!(StatusCode(418).reason_phrase(), "OK");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            304 => "Not Modified",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            500 => "Internal Server Error",
            _ => "OK",
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

/// An outbound response, mutated by handlers and by the file-serving path,
/// then rendered once with [`Response::build_response`].
///
/// `status == None` means the builder decides (usually from a file);
/// `body == None` means unset, which is different from an empty body.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    /// Cookie name to formatted `value[; attrs]`, in insertion order.
    pub cookies: Vec<(String, String)>,
    url: Option<String>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// A JSON reply open to any origin.
    pub fn json<T: Serialize>(value: &T, status: StatusCode) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to encode JSON reply");
            Vec::new()
        });

        let mut resp = Response::new();
        resp.status = Some(status);
        resp.headers.insert("Content-Type", "application/json");
        resp.headers.insert("Access-Control-Allow-Origin", "*");
        resp.set_body(body);
        resp
    }

    pub fn set_status(&mut self, status: impl Into<StatusCode>) {
        self.status = Some(status.into());
    }

    /// Sets the body and re-synchronizes `Content-Length`.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = Some(body.into());
        self.sync_content_length();
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key, value);
    }

    /// Adds or replaces a cookie to be emitted as one `Set-Cookie` line.
    pub fn set_cookie(&mut self, name: impl Into<String>, value: &str, opts: &CookieOptions) {
        let name = name.into();
        let formatted = format_cookie_value(value, opts);

        match self.cookies.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = formatted,
            None => self.cookies.push((name, formatted)),
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Sets the target URL; a non-empty URL also becomes the `Location` header.
    pub fn set_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        if !url.is_empty() {
            self.headers.insert("Location", url.as_str());
        }
        self.url = Some(url);
    }

    /// Turns this response into a `302 Found` redirect to `location`.
    pub fn redirect(&mut self, location: impl Into<String>) -> &mut Self {
        self.redirect_with_status(location, StatusCode::FOUND)
    }

    pub fn redirect_with_status(
        &mut self,
        location: impl Into<String>,
        status: StatusCode,
    ) -> &mut Self {
        self.status = Some(status);
        self.set_url(location);
        self.headers.insert("Content-Type", "text/html");
        self.set_body(Vec::new());
        self
    }

    pub fn sync_content_length(&mut self) {
        let len = self.body.as_ref().map_or(0, Vec::len);
        self.headers.insert("Content-Length", len.to_string());
    }

    /// Renders the bytes to write back for `req`.
    ///
    /// `OPTIONS` gets the fixed CORS preflight. A response whose status and
    /// body are both already set is rendered as-is. Otherwise the MIME type
    /// picks a storage root and the body is loaded from disk, falling back to
    /// the fixed not-found page.
    pub fn build_response(&mut self, req: &mut Request, roots: &StorageRoots) -> Vec<u8> {
        if req.is_method(&Method::OPTIONS) {
            return writer::preflight(req);
        }

        if self.status.is_some() && self.body.is_some() {
            self.sync_content_length();
            return writer::serialize_response(self, req);
        }

        if req.path.is_none() {
            warn!("Request has no routable path");
            return writer::not_found_page();
        }

        let mime_type = mime::resolve_mime(req);
        debug!(method = ?req.method, path = ?req.path, mime = mime_type, "Resolved MIME type");
        self.headers.insert("Content-Type", mime_type);

        let root = match mime::storage_for(mime_type) {
            Ok(Storage::Root(root)) => roots.dir(root),
            Ok(Storage::NoBacking) => {
                self.sync_content_length();
                return writer::serialize_response(self, req);
            }
            Err(e) => {
                error!(error = %e, "Cannot serve content type");
                return writer::not_found_page();
            }
        };

        let path = req.path.clone().unwrap_or_default();
        let outcome = files::load(&root, &path);
        if matches!(outcome, FileOutcome::NotFound) {
            debug!(path = %path, root = %root.display(), "No file to serve");
        }
        self.render_file(req, outcome)
    }

    /// Renders the result of a static-file lookup.
    ///
    /// A missing file gives the fixed not-found page; a read failure gives a
    /// plain-text `500`.
    pub fn render_file(&mut self, req: &Request, outcome: FileOutcome) -> Vec<u8> {
        match outcome {
            FileOutcome::Found(bytes) => {
                self.set_body(bytes);
                self.status.get_or_insert(StatusCode::OK);
                writer::serialize_response(self, req)
            }
            FileOutcome::NotFound => writer::not_found_page(),
            FileOutcome::Failed(e) => {
                error!(path = ?req.path, error = %e, "Failed to read file");
                self.status = Some(StatusCode::INTERNAL_SERVER_ERROR);
                self.headers.insert("Content-Type", "text/plain");
                self.set_body(b"500 Internal Server Error".to_vec());
                writer::serialize_response(self, req)
            }
        }
    }
}

/// Builder for constructing responses in a fluent style.
///
/// # Example
///
/// ```
/// # use gatehouse::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::OK)
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// assert_eq!(response.headers.get("content-length"), Some("2"));
/// ```
#[derive(Debug)]
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        let mut response = Response::new();
        response.status = Some(status);
        Self { response }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.response.headers.insert(key, value);
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: &str, opts: &CookieOptions) -> Self {
        self.response.set_cookie(name, value, opts);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.response.body = Some(body.into());
        self
    }

    /// Builds the final response with `Content-Length` matching the body.
    pub fn build(mut self) -> Response {
        if self.response.body.is_none() {
            self.response.body = Some(Vec::new());
        }
        self.response.sync_content_length();
        self.response
    }
}
