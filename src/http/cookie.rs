//! Mechanical cookie handling: parsing the `Cookie` request header and
//! formatting `Set-Cookie` values. No session semantics live here.

use std::collections::HashMap;

/// Attributes appended to a `Set-Cookie` value when requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    pub max_age: Option<u64>,
    /// Absolute expiry as an HTTP-date string.
    pub expires: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl CookieOptions {
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn expires(mut self, date: impl Into<String>) -> Self {
        self.expires = Some(date.into());
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }
}

/// Parses a `Cookie` header value into a name/value map.
///
/// Fragments are separated by `;` and split once on the first `=`. Fragments
/// without `=` are dropped.
pub fn parse_cookie_header(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|fragment| fragment.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// Formats the part of a `Set-Cookie` line after `name=`:
/// `value[; Max-Age=n][; Expires=date][; Secure][; HttpOnly]`.
pub fn format_cookie_value(value: &str, opts: &CookieOptions) -> String {
    let mut out = value.to_string();

    if let Some(max_age) = opts.max_age {
        out.push_str(&format!("; Max-Age={}", max_age));
    }
    if let Some(expires) = &opts.expires {
        out.push_str(&format!("; Expires={}", expires));
    }
    if opts.secure {
        out.push_str("; Secure");
    }
    if opts.http_only {
        out.push_str("; HttpOnly");
    }

    out
}
