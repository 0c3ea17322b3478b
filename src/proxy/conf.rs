//! Parser for the nginx-like `proxy.conf` route file.
//!
//! ```text
//! host "app.local" {
//!     proxy_set_header Host $host;
//!     proxy_pass http://127.0.0.1:9001;
//!     proxy_pass http://127.0.0.1:9002;
//!     dist_policy round-robin
//! }
//! ```

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::proxy::routing::{Policy, RouteConfig, Targets};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfError {
    #[error("line {line}: directive outside of a host block: {text:?}")]
    OutsideBlock { line: usize, text: String },
    #[error("line {line}: host block opened inside another host block")]
    NestedBlock { line: usize },
    #[error("line {line}: host block without a name")]
    MissingHostName { line: usize },
    #[error("line {line}: unmatched '}}'")]
    UnmatchedClose { line: usize },
    #[error("host block {0:?} is never closed")]
    Unterminated(String),
}

struct Block {
    host: String,
    targets: Vec<String>,
    policy: Policy,
}

impl Block {
    fn finish(self) -> (String, RouteConfig) {
        let route = RouteConfig {
            targets: Targets::from_list(self.targets),
            policy: self.policy,
        };
        (self.host, route)
    }
}

fn strip_target(value: &str) -> String {
    let value = value
        .strip_prefix("http://")
        .unwrap_or(value);
    value.trim_end_matches('/').to_string()
}

/// Parses `proxy.conf` text into hostname routes.
pub fn parse_proxy_conf(text: &str) -> Result<HashMap<String, RouteConfig>, ConfError> {
    let mut routes = HashMap::new();
    let mut current: Option<Block> = None;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.split('#').next().unwrap_or_default().trim();

        if line.is_empty() || line == "{" {
            continue;
        }

        if let Some(rest) = line.strip_prefix("host ") {
            if current.is_some() {
                return Err(ConfError::NestedBlock { line: line_no });
            }
            let host = rest.trim_end_matches('{').trim().trim_matches('"');
            if host.is_empty() {
                return Err(ConfError::MissingHostName { line: line_no });
            }
            current = Some(Block {
                host: host.to_string(),
                targets: Vec::new(),
                policy: Policy::default(),
            });
            continue;
        }

        if line == "}" {
            let block = current
                .take()
                .ok_or(ConfError::UnmatchedClose { line: line_no })?;
            let (host, route) = block.finish();
            routes.insert(host, route);
            continue;
        }

        let Some(block) = current.as_mut() else {
            return Err(ConfError::OutsideBlock {
                line: line_no,
                text: line.to_string(),
            });
        };

        let directive = line.trim_end_matches(';');
        let mut words = directive.split_whitespace();
        match (words.next(), words.next()) {
            (Some("proxy_pass"), Some(target)) => block.targets.push(strip_target(target)),
            (Some("dist_policy"), Some(policy)) => block.policy = Policy::parse(policy),
            _ => debug!(line = line_no, directive, "Ignoring directive"),
        }
    }

    match current {
        Some(block) => Err(ConfError::Unterminated(block.host)),
        None => Ok(routes),
    }
}
