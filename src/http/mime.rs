//! MIME type detection for requests and the mapping from a content type to
//! the storage root its files are served from.

use thiserror::Error;

use crate::http::request::{Method, Request};

/// Dynamic listing endpoint, always answered as JSON by its handler.
pub const LISTING_PATH: &str = "/get-list";

/// Extensionless page names served from the page templates on `GET`.
const PAGE_NAMES: [&str; 3] = ["/", "/index", "/login"];

const EXTENSIONS: [(&str, &str); 9] = [
    (".html", "text/html"),
    (".css", "text/css"),
    (".js", "application/javascript"),
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".png", "image/png"),
    (".ico", "image/x-icon"),
    (".json", "application/json"),
    (".txt", "text/plain"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MimeError {
    #[error("no storage mapping for content type {0:?}")]
    UnsupportedType(String),
}

/// Directory families files are served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageRoot {
    /// Stylesheets, scripts, plain text and images
    Static,
    /// HTML page templates
    Pages,
    /// Generated application artifacts
    Apps,
    /// Favicons, nested under the static root
    Icons,
}

/// Where the body of a response comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Root(StorageRoot),
    /// The handler supplies the body (JSON/XML endpoints).
    NoBacking,
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Picks the response MIME type for `req`.
///
/// Rewrites `req.path` in place when a page name or a login `POST` has to be
/// mapped onto its `.html` file. The login `POST` rewrite happens even though
/// the reply is JSON: the file loader still needs the `.html` name.
pub fn resolve_mime(req: &mut Request) -> &'static str {
    let path = req.path.as_deref().unwrap_or_default().trim().to_lowercase();

    if req.is_method(&Method::OPTIONS) {
        return "text/plain";
    }

    if path == LISTING_PATH {
        return "application/json";
    }

    if PAGE_NAMES.contains(&path.as_str())
        && req.is_method(&Method::GET)
        && !basename(&path).contains('.')
    {
        req.path = Some(format!("{}.html", path.trim_end_matches('/')));
        return "text/html";
    }

    if req.is_method(&Method::POST) && path.contains("login") {
        req.path = Some(format!("{}.html", path.trim_end_matches('/')));
        return "application/json";
    }

    if let Some(&(_, mime)) = EXTENSIONS.iter().find(|(ext, _)| path.ends_with(ext)) {
        return mime;
    }

    if req.handler.is_some() && !req.is_method(&Method::GET) {
        return "application/json";
    }

    "text/html"
}

/// Maps a content type to its storage root.
///
/// `application/json` and `application/xml` have no file backing.
pub fn storage_for(mime: &str) -> Result<Storage, MimeError> {
    let (main_type, sub_type) = mime
        .split_once('/')
        .ok_or_else(|| MimeError::UnsupportedType(mime.to_string()))?;

    let storage = match (main_type, sub_type) {
        ("text", "html") => Storage::Root(StorageRoot::Pages),
        ("text", "xml") => Storage::Root(StorageRoot::Apps),
        ("text", _) => Storage::Root(StorageRoot::Static),
        ("image", "x-icon") => Storage::Root(StorageRoot::Icons),
        ("image", _) => Storage::Root(StorageRoot::Static),
        ("application", "javascript") => Storage::Root(StorageRoot::Static),
        ("application", "json" | "xml") => Storage::NoBacking,
        ("application", _) => Storage::Root(StorageRoot::Apps),
        _ => return Err(MimeError::UnsupportedType(mime.to_string())),
    };

    Ok(storage)
}
