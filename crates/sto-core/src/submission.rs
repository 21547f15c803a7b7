//! # Order Submission Payload
//!
//! The flat, ERP-agnostic description of a finished draft, and the receipt the
//! ERP hands back.
//!
//! ## Building a payload
//! ```text
//! DraftOrder ──► OrderPayload::from_draft
//!                  │
//!                  ├── no client?      → Err(NoClientSelected), nothing sent
//!                  ├── empty refs      → None
//!                  ├── blank mileage   → "0"
//!                  ├── blank comment   → "Заказ из CRM"
//!                  └── each line       → raw qty/price(/discount) + computed sum
//! ```
//!
//! `sum` is taken from [`crate::pricing`], so what the ERP records always
//! matches what the operator saw on screen.

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::draft::DraftOrder;
use crate::error::{CoreError, CoreResult};
use crate::pricing::LineAmount;
use crate::types::{CarRef, CatalogRef, ClientRef, PartLine, WorkLine};
use crate::validation::is_empty_ref;
use crate::{DEFAULT_COMMENT, DEFAULT_MILEAGE};

/// One work row of the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WorkPayload {
    pub work_key: CatalogRef,
    pub qty: f64,
    pub price: f64,
    pub sum: f64,
}

impl From<&WorkLine> for WorkPayload {
    fn from(line: &WorkLine) -> Self {
        WorkPayload {
            work_key: line.reference.clone(),
            qty: line.qty,
            price: line.price,
            sum: line.amount(),
        }
    }
}

/// One part row of the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PartPayload {
    pub part_key: CatalogRef,
    pub qty: f64,
    pub price: f64,
    pub discount: f64,
    pub sum: f64,
}

impl From<&PartLine> for PartPayload {
    fn from(line: &PartLine) -> Self {
        PartPayload {
            part_key: line.reference.clone(),
            qty: line.qty,
            price: line.price,
            discount: line.discount,
            sum: line.amount(),
        }
    }
}

/// A finished draft, ready to hand to [`crate::ports::OrderSubmission`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderPayload {
    pub client_key: ClientRef,
    pub car_key: Option<CarRef>,
    pub repair_type_key: Option<CatalogRef>,
    pub workshop_key: Option<CatalogRef>,
    pub master_key: Option<CatalogRef>,
    pub mileage: String,
    pub comment: String,
    pub works: Vec<WorkPayload>,
    pub parts: Vec<PartPayload>,
}

impl OrderPayload {
    /// Builds the payload for `draft`.
    ///
    /// ## Errors
    /// [`CoreError::NoClientSelected`] when the draft has no client (or only
    /// the empty reference). Nothing else is checked here; the ERP owns rules
    /// such as "at least one line".
    pub fn from_draft(draft: &DraftOrder) -> CoreResult<Self> {
        let header = draft.header();

        let client_key = header
            .client
            .clone()
            .filter(|c| !is_empty_ref(c.as_str()))
            .ok_or(CoreError::NoClientSelected)?;

        let non_empty = |value: &Option<CatalogRef>| {
            value.clone().filter(|r| !is_empty_ref(r.as_str()))
        };

        let payload = OrderPayload {
            client_key,
            car_key: header.car.clone().filter(|r| !is_empty_ref(r.as_str())),
            repair_type_key: non_empty(&header.repair_type),
            workshop_key: non_empty(&header.workshop),
            master_key: non_empty(&header.master),
            mileage: or_default(&header.mileage, DEFAULT_MILEAGE),
            comment: or_default(&header.comment, DEFAULT_COMMENT),
            works: draft.ledger().works().iter().map(WorkPayload::from).collect(),
            parts: draft.ledger().parts().iter().map(PartPayload::from).collect(),
        };

        debug!(
            client = %payload.client_key,
            works = payload.works.len(),
            parts = payload.parts.len(),
            "order payload built"
        );
        Ok(payload)
    }

    /// Sum of all row sums.
    pub fn total(&self) -> f64 {
        self.works.iter().map(|w| w.sum).sum::<f64>() + self.parts.iter().map(|p| p.sum).sum::<f64>()
    }
}

fn or_default(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

/// What the ERP returned for an accepted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SubmissionReceipt {
    /// Human-facing order number, padding removed.
    pub number: String,
    /// ERP reference of the created document, when returned.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl SubmissionReceipt {
    /// The ERP pads numbers with spaces (`"  00123 "`); they are trimmed here.
    pub fn new(number: &str, reference: Option<String>) -> Self {
        SubmissionReceipt {
            number: number.trim().to_string(),
            reference: reference.filter(|r| !is_empty_ref(r)),
        }
    }
}
