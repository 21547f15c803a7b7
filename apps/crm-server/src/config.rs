//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//! The ERP side has its own file, see [`sto_erp::ErpConfig`].

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::state::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL};

/// CRM server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Interface to listen on
    pub bind_addr: String,

    /// HTTP port
    pub port: u16,

    /// Path of `erp.toml`; `None` uses the platform config directory
    pub erp_config_path: Option<PathBuf>,

    /// Idle time after which an open order form is dropped
    pub session_ttl: Duration,

    /// Open order forms kept at most
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            erp_config_path: None,
            session_ttl: DEFAULT_SESSION_TTL,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = parse_var(&var, "STO_PORT")?.unwrap_or(defaults.port);
        let session_ttl = match parse_var::<u64>(&var, "STO_SESSION_TTL_SECS")? {
            Some(0) => return Err(ConfigError::InvalidValue("STO_SESSION_TTL_SECS".to_string())),
            Some(secs) => Duration::from_secs(secs),
            None => defaults.session_ttl,
        };
        let max_sessions = match parse_var::<usize>(&var, "STO_MAX_SESSIONS")? {
            Some(0) => return Err(ConfigError::InvalidValue("STO_MAX_SESSIONS".to_string())),
            Some(max) => max,
            None => defaults.max_sessions,
        };

        Ok(ServerConfig {
            bind_addr: var("STO_BIND_ADDR")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.bind_addr),
            port,
            erp_config_path: var("STO_ERP_CONFIG")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            session_ttl,
            max_sessions,
        })
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(None),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
