//! Host-based routing table and backend distribution policies.
//!
//! A hostname maps to one `host:port` target or an ordered list of them,
//! plus a policy naming how a list is distributed. Resolution never fails:
//! unknown or empty mappings fall back to a fixed default target.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Deserialize;
use tracing::{debug, info};

/// Target used when a hostname has no usable mapping.
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: &str = "9000";

/// Backend targets of a route.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Targets {
    One(String),
    Many(Vec<String>),
}

impl Targets {
    /// One target stays a single string; several become a list.
    pub fn from_list(mut list: Vec<String>) -> Self {
        match list.len() {
            0 => Targets::One(String::new()),
            1 => Targets::One(list.remove(0)),
            _ => Targets::Many(list),
        }
    }
}

/// Distribution policy for multi-backend routes.
///
/// Only `round-robin` rotates; `single` and any unrecognized name always pick
/// the first target.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Policy {
    #[default]
    Single,
    RoundRobin,
    Other(String),
}

impl Policy {
    pub fn parse(s: &str) -> Self {
        match s {
            "single" => Policy::Single,
            "round-robin" => Policy::RoundRobin,
            other => Policy::Other(other.to_string()),
        }
    }
}

impl From<String> for Policy {
    fn from(s: String) -> Self {
        Policy::parse(&s)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Single => f.write_str("single"),
            Policy::RoundRobin => f.write_str("round-robin"),
            Policy::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteConfig {
    pub targets: Targets,
    #[serde(default)]
    pub policy: Policy,
}

/// Routing table plus the per-hostname round-robin cursors.
///
/// Routes are read-only once built; the cursors are shared by every
/// connection resolving through this table.
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: HashMap<String, RouteConfig>,
    counters: Mutex<HashMap<String, usize>>,
}

impl From<HashMap<String, RouteConfig>> for RoutingTable {
    fn from(routes: HashMap<String, RouteConfig>) -> Self {
        Self {
            routes,
            counters: Mutex::new(HashMap::new()),
        }
    }
}

fn default_target() -> (String, String) {
    (DEFAULT_HOST.to_string(), DEFAULT_PORT.to_string())
}

/// Splits `host:port` once on `:`. A target without a port yields an empty port.
fn split_target(target: &str) -> (String, String) {
    match target.split_once(':') {
        Some((host, port)) => (host.to_string(), port.to_string()),
        None => (target.to_string(), String::new()),
    }
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hostname: impl Into<String>, targets: Targets, policy: Policy) {
        self.routes
            .insert(hostname.into(), RouteConfig { targets, policy });
    }

    pub fn get(&self, hostname: &str) -> Option<&RouteConfig> {
        self.routes.get(hostname)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Reads and advances the round-robin cursor for `hostname` in one step.
    fn next_cursor(&self, hostname: &str) -> usize {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let cursor = counters.entry(hostname.to_string()).or_insert(0);
        let current = *cursor;
        *cursor = cursor.wrapping_add(1);
        current
    }

    /// Resolves `hostname` (a trailing `:port` is ignored) to `(host, port)`.
    pub fn resolve(&self, hostname: &str) -> (String, String) {
        let hostname = hostname.split(':').next().unwrap_or(hostname);

        let Some(route) = self.routes.get(hostname) else {
            debug!(hostname, "No mapping, using default target");
            return default_target();
        };

        debug!(hostname, targets = ?route.targets, policy = %route.policy, "Resolving route");

        match &route.targets {
            Targets::One(target) if target.is_empty() => {
                info!(hostname, "Empty target for mapped host, using default target");
                default_target()
            }
            Targets::One(target) => split_target(target),
            Targets::Many(list) => match list.as_slice() {
                [] => {
                    info!(hostname, "Empty target list, using default target");
                    default_target()
                }
                [only] => split_target(only),
                _ if route.policy == Policy::RoundRobin => {
                    let index = self.next_cursor(hostname) % list.len();
                    split_target(&list[index])
                }
                [first, ..] => split_target(first),
            },
        }
    }
}
