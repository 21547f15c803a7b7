//! # Error Types
//!
//! Domain-specific error types for sto-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  sto-core errors (this file)                                           │
//! │  ├── CoreError        - Preconditions and collaborator failures        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  sto-erp errors (separate crate)                                       │
//! │  └── ErpError         - OData / HTTP / config failures                 │
//! │                                                                         │
//! │  crm-server errors (in app)                                            │
//! │  └── ApiError         - What the browser sees (serialized)             │
//! │                                                                         │
//! │  Flow: ErpError → CoreError → ApiError → Browser                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What is NOT an error
//! Malformed numeric input on a line edit is coerced to `0` by the ledger and
//! never surfaces here. Out-of-range line indexes are silent no-ops.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Submission was attempted without a client on the draft.
    ///
    /// ## When This Occurs
    /// ```text
    /// Operator opens order form
    ///      │
    ///      ▼
    /// Adds lines, forgets to pick a client
    ///      │
    ///      ▼
    /// Submit ──► NoClientSelected (no request leaves the process)
    /// ```
    #[error("No client selected for the order")]
    NoClientSelected,

    /// A catalog reference could not be resolved to a display name.
    #[error("Catalog entry not found: {0}")]
    CatalogEntryNotFound(String),

    /// The Catalog Lookup collaborator failed. The message is opaque.
    #[error("Catalog lookup failed: {0}")]
    Catalog(String),

    /// The Order Submission collaborator failed. The message is opaque.
    #[error("Order submission failed: {0}")]
    Submission(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for failures that happened before any external call.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            CoreError::NoClientSelected | CoreError::Validation(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., malformed GUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CoreError::NoClientSelected.to_string(),
            "No client selected for the order"
        );
        assert_eq!(
            CoreError::Submission("HTTP 500".to_string()).to_string(),
            "Order submission failed: HTTP 500"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "ref".to_string(),
        };
        assert_eq!(err.to_string(), "ref is required");

        let err = ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        };
        assert_eq!(err.to_string(), "query must be at most 100 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "ref".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert!(core_err.is_local());
    }

    #[test]
    fn test_collaborator_errors_are_not_local() {
        assert!(CoreError::NoClientSelected.is_local());
        assert!(!CoreError::Catalog("timeout".into()).is_local());
        assert!(!CoreError::Submission("odata".into()).is_local());
    }
}
