//! # API Error Type
//!
//! Unified error type for the HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in STO CRM                                │
//! │                                                                         │
//! │  Browser                     Rust Backend                               │
//! │  ───────                     ────────────                               │
//! │                                                                         │
//! │  POST /api/sessions/{id}/draft/submit                                   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler                                                         │  │
//! │  │  Result<Json<T>, ApiError>                                       │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Unknown session? ──── NOT_FOUND (404) ─────────────────────────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  No client? ────────── NO_CLIENT_SELECTED (422) ────────────────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  1C said no? ───────── ERP_ERROR (502), 1C message verbatim ────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use sto_core::CoreError;

/// API error returned from handlers.
///
/// ## Serialization
/// This is what the front end receives when a request fails:
/// ```json
/// {
///   "code": "NO_CLIENT_SELECTED",
///   "message": "No client selected for the order"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Unknown session or route resource (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Submission attempted without a client (422)
    NoClientSelected,

    /// A catalog reference did not resolve (404)
    CatalogEntryNotFound,

    /// The ERP failed or refused (502)
    ErpError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound | ErrorCode::CatalogEntryNotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NoClientSelected => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::ErpError => StatusCode::BAD_GATEWAY,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NoClientSelected => {
                ApiError::new(ErrorCode::NoClientSelected, err.to_string())
            }
            CoreError::CatalogEntryNotFound(_) => {
                ApiError::new(ErrorCode::CatalogEntryNotFound, err.to_string())
            }
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
            // The 1C text is what the operator needs to see, without our prefix
            CoreError::Catalog(message) | CoreError::Submission(message) => {
                tracing::warn!(%message, "ERP call failed");
                ApiError::new(ErrorCode::ErpError, message)
            }
        }
    }
}

impl From<sto_core::ValidationError> for ApiError {
    fn from(err: sto_core::ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
