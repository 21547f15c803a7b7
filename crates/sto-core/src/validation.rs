//! # Validation Module
//!
//! Input checks for the order flow.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Browser                                                      │
//! │  └── Immediate feedback while typing                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: crm-server handler                                           │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: refs and search terms                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: 1C ERP                                                       │
//! │  └── Business rules on the posted document ("at least one line", ...)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Numeric line fields are deliberately absent from layer 2: malformed input is
//! coerced to `0` by the ledger, and suspicious values only produce
//! [`LineWarning`]s that never block the operator.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::ledger::{LineField, OrderLedger};
use crate::types::LineKind;
use crate::EMPTY_REF;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted search term.
pub const MAX_QUERY_LEN: usize = 100;

/// Longest accepted ERP reference.
pub const MAX_REF_LEN: usize = 64;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a catalog search query.
///
/// ## Rules
/// - Can be empty (the catalog returns its first page)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

/// Validates an ERP reference.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - GUID-shaped refs are normalised to lower case; anything else passes
///   through trimmed, since the ERP owns the format
///
/// ## Example
/// ```rust
/// use sto_core::validation::validate_ref;
///
/// assert_eq!(
///     validate_ref("ref", "39B4C1F1-FA7C-11E5-9841-6CF049A63E1B").unwrap(),
///     "39b4c1f1-fa7c-11e5-9841-6cf049a63e1b"
/// );
/// assert!(validate_ref("ref", "  ").is_err());
/// ```
pub fn validate_ref(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_REF_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_REF_LEN,
        });
    }

    if value.len() == 36 {
        if let Ok(guid) = Uuid::parse_str(value) {
            return Ok(guid.hyphenated().to_string());
        }
    }

    Ok(value.to_string())
}

/// True for an absent reference: empty, whitespace or the all-zero GUID.
pub fn is_empty_ref(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == EMPTY_REF
}

// =============================================================================
// Line Warnings
// =============================================================================

/// What looks wrong about a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineIssue {
    Negative,
    DiscountOutOfRange,
}

/// A non-blocking remark about one line field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineWarning {
    pub kind: LineKind,
    pub index: usize,
    pub field: LineField,
    pub issue: LineIssue,
}

/// Reports negative quantities and prices, and discounts outside `0..=100`.
///
/// The ledger is left untouched; the operator decides.
pub fn line_warnings(ledger: &OrderLedger) -> Vec<LineWarning> {
    let mut warnings = Vec::new();

    let mut check_negative = |kind, index, field, value: f64| {
        if value < 0.0 {
            warnings.push(LineWarning {
                kind,
                index,
                field,
                issue: LineIssue::Negative,
            });
        }
    };

    for (index, line) in ledger.works().iter().enumerate() {
        check_negative(LineKind::Work, index, LineField::Qty, line.qty);
        check_negative(LineKind::Work, index, LineField::Price, line.price);
    }
    for (index, line) in ledger.parts().iter().enumerate() {
        check_negative(LineKind::Part, index, LineField::Qty, line.qty);
        check_negative(LineKind::Part, index, LineField::Price, line.price);
    }

    for (index, line) in ledger.parts().iter().enumerate() {
        if !(0.0..=100.0).contains(&line.discount) {
            warnings.push(LineWarning {
                kind: LineKind::Part,
                index,
                field: LineField::Discount,
                issue: LineIssue::DiscountOutOfRange,
            });
        }
    }

    warnings
}

// =============================================================================
// Unit Tests
// =============================================================================
