//! # ERP Configuration
//!
//! Connection settings for the 1C OData facade and the document defaults every
//! repair order needs.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STO_ODATA_URL, STO_ODATA_USER, STO_ODATA_PASS, STO_ODATA_TIMEOUT   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/sto-crm/erp.toml (Linux)                                 │
//! │     ~/Library/Application Support/ru.sto.sto-crm/erp.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # erp.toml
//! [odata]
//! url = "https://erp.example.ru/base/odata/standard.odata"
//! user = "Администратор"
//! password = "secret"
//! timeout_secs = 30
//! search_limit = 100
//! min_search_len = 2
//!
//! [defaults]
//! organization = "39b4c1f1-fa7c-11e5-9841-6cf049a63e1b"
//! workshop = "65ce404a-fa7c-11e5-9841-6cf049a63e1b"
//! # ... every key of the 1C document header
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{ErpError, ErpResult};

// =============================================================================
// OData Connection Settings
// =============================================================================

/// How to reach the OData facade.
#[derive(Clone, Serialize, Deserialize)]
pub struct ODataSettings {
    /// Base URL ending in `/odata/standard.odata`.
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Rows returned by a catalog search when the caller gives no limit.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Shorter search terms list the catalog without a text filter.
    #[serde(default = "default_min_search_len")]
    pub min_search_len: usize,
}

fn default_url() -> String {
    "http://localhost/sto/odata/standard.odata".to_string()
}

fn default_user() -> String {
    "Администратор".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_search_limit() -> usize {
    sto_core::DEFAULT_SEARCH_LIMIT
}

fn default_min_search_len() -> usize {
    2
}

/// Largest `$top` the server will pass through.
pub const MAX_SEARCH_LIMIT: usize = 500;

impl Default for ODataSettings {
    fn default() -> Self {
        ODataSettings {
            url: default_url(),
            user: default_user(),
            password: String::new(),
            timeout_secs: default_timeout(),
            search_limit: default_search_limit(),
            min_search_len: default_min_search_len(),
        }
    }
}

// Password stays out of logs.
impl fmt::Debug for ODataSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ODataSettings")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .field("search_limit", &self.search_limit)
            .field("min_search_len", &self.min_search_len)
            .finish()
    }
}

// =============================================================================
// Document Defaults
// =============================================================================

/// Header and row keys filled in on every `Document_ЗаказНаряд`.
///
/// The operator picks the client, car, repair type, workshop and master; the
/// rest comes from here. Repair type, workshop and master are fallbacks used
/// when nothing was picked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentDefaults {
    pub organization: String,
    pub division: String,
    pub price_type: String,
    pub repair_type: String,
    /// Initial order state ("Заявка").
    pub status: String,
    pub workshop: String,
    pub master: String,
    pub manager: String,
    pub author: String,
    pub currency: String,
    pub operation: String,
    pub warehouse: String,
    /// Summary repair order the new document is attached to.
    pub repair_order: String,
    pub norm_hour: String,
    pub vat_rate: String,
    /// Unit of measure for part rows.
    pub unit: String,
}

impl Default for DocumentDefaults {
    fn default() -> Self {
        DocumentDefaults {
            organization: "39b4c1f1-fa7c-11e5-9841-6cf049a63e1b".into(),
            division: "39b4c1f0-fa7c-11e5-9841-6cf049a63e1b".into(),
            price_type: "65ce4042-fa7c-11e5-9841-6cf049a63e1b".into(),
            repair_type: "7d9f8931-1a7f-11e6-bee5-20689d8f1e0d".into(),
            status: "6bd193fc-fa7c-11e5-9841-6cf049a63e1b".into(),
            workshop: "65ce404a-fa7c-11e5-9841-6cf049a63e1b".into(),
            master: "c94de32f-fa7c-11e5-9841-6cf049a63e1b".into(),
            manager: "c94de33e-fa7c-11e5-9841-6cf049a63e1b".into(),
            author: "39b4c1f2-fa7c-11e5-9841-6cf049a63e1b".into(),
            currency: "6bd1932d-fa7c-11e5-9841-6cf049a63e1b".into(),
            operation: "530d99ea-fa7c-11e5-9841-6cf049a63e1b".into(),
            warehouse: "65ce4049-fa7c-11e5-9841-6cf049a63e1b".into(),
            repair_order: "c7194270-d152-11e8-87a5-f46d0425712d".into(),
            norm_hour: "c93d5c5b-1928-11e6-a20f-6cf049a63e1b".into(),
            vat_rate: "6bd192f4-fa7c-11e5-9841-6cf049a63e1b".into(),
            unit: "6bd192f3-fa7c-11e5-9841-6cf049a63e1b".into(),
        }
    }
}

impl DocumentDefaults {
    fn entries(&self) -> [(&'static str, &str); 16] {
        [
            ("organization", self.organization.as_str()),
            ("division", self.division.as_str()),
            ("price_type", self.price_type.as_str()),
            ("repair_type", self.repair_type.as_str()),
            ("status", self.status.as_str()),
            ("workshop", self.workshop.as_str()),
            ("master", self.master.as_str()),
            ("manager", self.manager.as_str()),
            ("author", self.author.as_str()),
            ("currency", self.currency.as_str()),
            ("operation", self.operation.as_str()),
            ("warehouse", self.warehouse.as_str()),
            ("repair_order", self.repair_order.as_str()),
            ("norm_hour", self.norm_hour.as_str()),
            ("vat_rate", self.vat_rate.as_str()),
            ("unit", self.unit.as_str()),
        ]
    }
}

// =============================================================================
// Main ERP Configuration
// =============================================================================

/// Complete ERP configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErpConfig {
    #[serde(default)]
    pub odata: ODataSettings,

    #[serde(default)]
    pub defaults: DocumentDefaults,
}

impl ErpConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (erp.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ErpResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ERP config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ErpResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ErpError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "ERP config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ErpResult<()> {
        let url = Url::parse(&self.odata.url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ErpError::InvalidUrl(format!(
                "OData URL must start with http:// or https://, got: {}",
                self.odata.url
            )));
        }

        if self.odata.timeout_secs == 0 {
            return Err(ErpError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.odata.search_limit == 0 || self.odata.search_limit > MAX_SEARCH_LIMIT {
            return Err(ErpError::InvalidConfig(format!(
                "search_limit must be between 1 and {}",
                MAX_SEARCH_LIMIT
            )));
        }

        for (name, value) in self.defaults.entries() {
            if Uuid::parse_str(value).is_err() {
                return Err(ErpError::InvalidConfig(format!(
                    "defaults.{} is not a GUID: '{}'",
                    name, value
                )));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("STO_ODATA_URL") {
            debug!(url = %url, "Overriding OData URL from environment");
            self.odata.url = url;
        }

        if let Some(user) = var("STO_ODATA_USER") {
            self.odata.user = user;
        }

        if let Some(password) = var("STO_ODATA_PASS") {
            self.odata.password = password;
        }

        if let Some(timeout) = var("STO_ODATA_TIMEOUT") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.odata.timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring invalid STO_ODATA_TIMEOUT"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("ru", "sto", "sto-crm")
            .map(|dirs| dirs.config_dir().join("erp.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = ErpConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.odata.search_limit, 100);
        assert_eq!(config.odata.min_search_len, 2);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ErpConfig::default();

        config.odata.url = "ftp://erp".into();
        assert!(matches!(config.validate(), Err(ErpError::InvalidUrl(_))));

        config.odata.url = "not a url".into();
        assert!(config.validate().is_err());

        config.odata.url = "https://erp.local/base/odata/standard.odata".into();
        config.odata.timeout_secs = 0;
        assert!(config.validate().is_err());

        config.odata.timeout_secs = 5;
        config.defaults.workshop = "Цех 1".into();
        assert!(matches!(config.validate(), Err(ErpError::InvalidConfig(m)) if m.contains("workshop")));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("STO_ODATA_URL", "https://erp.local/odata/standard.odata"),
            ("STO_ODATA_PASS", "secret"),
            ("STO_ODATA_TIMEOUT", "abc"),
        ]
        .into_iter()
        .collect();

        let mut config = ErpConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.odata.url, "https://erp.local/odata/standard.odata");
        assert_eq!(config.odata.password, "secret");
        assert_eq!(config.odata.user, "Администратор");
        assert_eq!(config.odata.timeout_secs, 30);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ErpConfig = toml::from_str(
            r#"
            [odata]
            url = "https://erp.local/odata/standard.odata"
            timeout_secs = 10

            [defaults]
            workshop = "11111111-2222-3333-4444-555555555555"
            "#,
        )
        .unwrap();

        assert_eq!(config.odata.timeout_secs, 10);
        assert_eq!(config.odata.search_limit, 100);
        assert_eq!(config.defaults.workshop, "11111111-2222-3333-4444-555555555555");
        assert_eq!(config.defaults.master, DocumentDefaults::default().master);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("erp.toml");

        let mut config = ErpConfig::default();
        config.odata.url = "https://erp.local/odata/standard.odata".into();
        config.save(Some(path.clone())).unwrap();

        let loaded = ErpConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.defaults, config.defaults);
    }

    #[test]
    fn test_debug_hides_password() {
        let mut settings = ODataSettings::default();
        settings.password = "hunter2".into();
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&ErpConfig::default()).unwrap();
        assert!(toml_str.contains("[odata]"));
        assert!(toml_str.contains("[defaults]"));
    }
}
