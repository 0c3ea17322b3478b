//! Runtime configuration.
//!
//! Read from the YAML file named by `GATEHOUSE_CONFIG` when set, otherwise
//! defaults. `LISTEN` overrides the listen address either way.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::http::files::StorageRoots;
use crate::proxy::conf::{ConfError, parse_proxy_conf};
use crate::proxy::routing::{RouteConfig, RoutingTable};

pub const CONFIG_ENV: &str = "GATEHOUSE_CONFIG";
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid proxy route file {path}: {source}")]
    ProxyConf {
        path: PathBuf,
        #[source]
        source: ConfError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Serve static files and application routes
    #[default]
    Backend,
    /// Route requests to backends by `Host`
    Proxy,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub mode: Mode,
    pub backlog: u32,
    /// Size of the single read a backend request must fit in
    pub read_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            mode: Mode::Backend,
            backlog: 50,
            read_buffer: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    /// Base directory holding `www/`, `static/` and `apps/`
    pub root: PathBuf,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub client_read_timeout_secs: u64,
    /// Optional `proxy.conf`; its hosts override `routes`
    pub conf_file: Option<PathBuf>,
    pub routes: HashMap<String, RouteConfig>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 2,
            read_timeout_secs: 2,
            client_read_timeout_secs: 3,
            conf_file: None,
            routes: HashMap::new(),
        }
    }
}

impl ProxyConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn client_read_timeout(&self) -> Duration {
        Duration::from_secs(self.client_read_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticConfig,
    pub logging: LoggingConfig,
    pub proxy: ProxyConfig,
}

impl Config {
    /// Loads configuration from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let listen = std::env::var(LISTEN_ENV).ok();
        Self::load_from(path.as_deref(), listen)
    }

    /// Loads from an optional file, then applies an optional listen override.
    pub fn load_from(path: Option<&Path>, listen: Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(listen) = listen {
            cfg.server.listen_addr = listen;
        }

        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn storage_roots(&self) -> StorageRoots {
        StorageRoots::new(&self.static_files.root)
    }

    /// Builds the proxy routing table from `proxy.routes` and `proxy.conf_file`.
    pub fn routing_table(&self) -> Result<RoutingTable, ConfigError> {
        let mut routes = self.proxy.routes.clone();

        if let Some(path) = &self.proxy.conf_file {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let parsed = parse_proxy_conf(&text).map_err(|source| ConfigError::ProxyConf {
                path: path.clone(),
                source,
            })?;
            routes.extend(parsed);
        }

        Ok(RoutingTable::from(routes))
    }
}
