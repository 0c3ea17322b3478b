//! Reverse proxy functionality
//!
//! Host-based routing of raw requests to backend targets. The proxy never
//! parses the message beyond its `Host` line; bytes are forwarded and relayed
//! verbatim.

pub mod conf;
pub mod routing;
pub mod session;
pub mod upstream;

pub use routing::{Policy, RouteConfig, RoutingTable, Targets};
pub use upstream::Upstream;
