//! # ERP Error Types
//!
//! Error types for talking to the 1C OData facade.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ERP Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     OData               │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  OData (odata.error)    │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  HttpStatus             │ │
//! │  │  ConfigLoad/Save│  │                 │  │  Decode                 │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  At the port boundary every variant becomes an opaque CoreError         │
//! │  message: Catalog(..) for lookups, Submission(..) for orders.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sto_core::CoreError;
use thiserror::Error;

/// Result type alias for ERP operations.
pub type ErpResult<T> = Result<T, ErpError>;

/// Everything that can go wrong between this process and the ERP.
#[derive(Debug, Error)]
pub enum ErpError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid ERP configuration.
    #[error("Invalid ERP configuration: {0}")]
    InvalidConfig(String),

    /// Invalid OData URL.
    #[error("Invalid OData URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Could not reach the ERP.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request exceeded the configured timeout.
    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    // =========================================================================
    // OData Errors
    // =========================================================================
    /// The ERP answered with an `odata.error` body.
    #[error("{0}")]
    OData(String),

    /// Non-success status without a readable `odata.error` body.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Response body did not match the expected shape.
    #[error("Failed to decode OData response: {0}")]
    Decode(String),

    /// Request body could not be encoded.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for ErpError {
    fn from(err: serde_json::Error) -> Self {
        ErpError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for ErpError {
    fn from(err: url::ParseError) -> Self {
        ErpError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for ErpError {
    fn from(err: std::io::Error) -> Self {
        ErpError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ErpError {
    fn from(err: toml::de::Error) -> Self {
        ErpError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ErpError {
    fn from(err: toml::ser::Error) -> Self {
        ErpError::ConfigSaveFailed(err.to_string())
    }
}

impl From<reqwest::Error> for ErpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ErpError::Decode(err.to_string())
        } else {
            ErpError::ConnectionFailed(err.to_string())
        }
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ErpError {
    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ErpError::InvalidConfig(_)
                | ErpError::InvalidUrl(_)
                | ErpError::ConfigLoadFailed(_)
                | ErpError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if the ERP was never reached.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, ErpError::ConnectionFailed(_) | ErpError::Timeout(_))
    }

    /// The message handed upward through the ports.
    ///
    /// ERP-reported failures keep their text verbatim so the operator sees
    /// what 1C said.
    pub fn opaque_message(&self) -> String {
        self.to_string()
    }

    /// Converts into the error a [`sto_core::CatalogLookup`] reports.
    pub fn into_catalog_error(self) -> CoreError {
        CoreError::Catalog(self.opaque_message())
    }

    /// Converts into the error an [`sto_core::OrderSubmission`] reports.
    pub fn into_submission_error(self) -> CoreError {
        CoreError::Submission(self.opaque_message())
    }
}
