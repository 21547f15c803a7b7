//! # sto-core: Pure Business Logic for the STO CRM order screen
//!
//! This crate is the **heart** of the order-entry flow. It owns the draft order,
//! its work and part lines, and the pricing rules that turn lines into money.
//! Everything here is deterministic and free of I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        STO CRM Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Browser front end                            │   │
//! │  │    Client search ──► Order form ──► Lines table ──► Submit      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    crm-server (sessions)                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ sto-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌────────────────┐    │   │
//! │  │   │  ledger  │ │ pricing  │ │  draft   │ │   submission   │    │   │
//! │  │   │ WorkLine │ │  totals  │ │  header  │ │  OrderPayload  │    │   │
//! │  │   │ PartLine │ │ discount │ │  ledger  │ │  receipt       │    │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └────────────────┘    │   │
//! │  │                                                                 │   │
//! │  │   ports: CatalogLookup, OrderSubmission (implemented elsewhere) │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    sto-erp (1C OData adapter)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - References, catalog entries, cars, line items
//! - [`ledger`] - Ordered work/part lines and index-addressed edits
//! - [`pricing`] - Line amounts and order totals
//! - [`draft`] - The draft order aggregate (header + ledger)
//! - [`submission`] - Payload handed to the ERP and its receipt
//! - [`ports`] - Catalog Lookup, Order Submission and Record Store capabilities
//! - [`records`] - Stored clients, cars and orders; dashboard figures
//! - [`validation`] - Input checks and non-blocking line warnings
//! - [`money`] - Display formatting of amounts
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use sto_core::{CatalogEntry, DraftOrder, LineEdit, LineKind, OrderTotals};
//!
//! let mut draft = DraftOrder::for_client("c-1".into());
//! draft.ledger_mut().add_work(&CatalogEntry::new("w1", "Замена масла"));
//! draft.ledger_mut().add_part(&CatalogEntry::new("p1", "Фильтр"));
//!
//! draft.ledger_mut().update_line(LineKind::Work, 0, LineEdit::price_from_input("1000"));
//! draft.ledger_mut().update_line(LineKind::Part, 0, LineEdit::price_from_input("500"));
//! draft.ledger_mut().update_line(LineKind::Part, 0, LineEdit::discount_from_input("10"));
//!
//! let totals = OrderTotals::from(draft.ledger());
//! assert_eq!(totals.works_total, 1000.0);
//! assert_eq!(totals.parts_total, 450.0);
//! assert_eq!(totals.order_total, 1450.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod draft;
pub mod error;
pub mod ledger;
pub mod money;
pub mod ports;
pub mod pricing;
pub mod records;
pub mod submission;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use draft::{DraftHeader, DraftOrder, HeaderDetails};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{coerce_numeric, LineEdit, LineField, OrderLedger};
pub use ports::{CatalogLookup, OrderSubmission, RecordStore};
pub use pricing::{LineAmount, OrderTotals};
pub use records::{
    ClientDetails, ClientOverview, CreatedRecord, DashboardStats, DocumentState, NewCar,
    NewClient, OrderDetails, OrderFilter, OrderRow, OrderSummary, OrderUpdate, Period,
};
pub use submission::{OrderPayload, PartPayload, SubmissionReceipt, WorkPayload};
pub use types::*;
pub use validation::{LineIssue, LineWarning};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Mileage sent to the ERP when the operator leaves the field blank.
pub const DEFAULT_MILEAGE: &str = "0";

/// Comment sent to the ERP when the operator leaves the field blank.
pub const DEFAULT_COMMENT: &str = "Заказ из CRM";

/// The 1C "empty reference" GUID. Treated the same as an absent reference.
pub const EMPTY_REF: &str = "00000000-0000-0000-0000-000000000000";

/// Default number of catalog entries returned by a search.
pub const DEFAULT_SEARCH_LIMIT: usize = 100;
