//! Sandboxed static-file loading.
//!
//! A request path is joined onto a storage root and the result must stay
//! inside that root. Anything that escapes, is missing, or is not a regular
//! file is reported as [`FileOutcome::NotFound`]; callers never learn which.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::http::mime::StorageRoot;

const INDEX_FILE: &str = "index.html";

/// Directory layout under the configured static base directory.
#[derive(Debug, Clone)]
pub struct StorageRoots {
    base: PathBuf,
}

impl StorageRoots {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn dir(&self, root: StorageRoot) -> PathBuf {
        match root {
            StorageRoot::Static => self.base.join("static"),
            StorageRoot::Pages => self.base.join("www"),
            StorageRoot::Apps => self.base.join("apps"),
            StorageRoot::Icons => self.base.join("static").join("images"),
        }
    }
}

#[derive(Debug)]
pub enum FileOutcome {
    Found(Vec<u8>),
    NotFound,
    Failed(io::Error),
}

/// Resolves `request_path` inside `root`, returning the file to serve.
///
/// Directories resolve to their `index.html`. A leading segment equal to the
/// root's own directory name is dropped, so `/static/a.css` and `/a.css` name
/// the same file under the `static` root.
pub fn resolve_in_root(root: &Path, request_path: &str) -> Option<PathBuf> {
    let abs_root = root.canonicalize().ok()?;

    let target = request_path.split('?').next().unwrap_or_default();
    let mut rel = target.trim_start_matches(['/', '\\']);

    if let Some(name) = abs_root.file_name().and_then(|n| n.to_str()) {
        if let Some(rest) = rel.strip_prefix(name).and_then(|r| r.strip_prefix('/')) {
            rel = rest;
        }
    }

    let mut candidate = abs_root.clone();
    for segment in rel.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if candidate == abs_root {
                    warn!(path = %request_path, "Path escapes storage root");
                    return None;
                }
                candidate.pop();
            }
            part => candidate.push(part),
        }
    }

    // Symlinks may still point outside; compare the real location.
    let mut resolved = candidate.canonicalize().ok()?;
    if !resolved.starts_with(&abs_root) {
        warn!(path = %request_path, "Path escapes storage root");
        return None;
    }

    if resolved.is_dir() {
        resolved.push(INDEX_FILE);
    }

    if !resolved.is_file() {
        debug!(path = %resolved.display(), "File not found");
        return None;
    }

    Some(resolved)
}

/// Loads the file `request_path` names under `root`.
pub fn load(root: &Path, request_path: &str) -> FileOutcome {
    let Some(path) = resolve_in_root(root, request_path) else {
        return FileOutcome::NotFound;
    };

    match std::fs::read(&path) {
        Ok(bytes) => FileOutcome::Found(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => FileOutcome::NotFound,
        Err(e) => FileOutcome::Failed(e),
    }
}
