//! # Draft Order
//!
//! The order being assembled by one operator: a header (client, car, shop
//! details) and a [`OrderLedger`] of lines.
//!
//! ## Lifecycle
//! ```text
//! ┌───────────┐  begin(client)  ┌────────────────┐  submit OK   ┌───────────┐
//! │   Empty   │ ──────────────► │ Editing lines  │ ───────────► │ Discarded │
//! │ no client │                 │ header + lines │              │           │
//! └───────────┘                 └───────┬────────┘              └───────────┘
//!                                       │  navigate away            ▲
//!                                       └───────────────────────────┘
//! ```
//!
//! A draft is owned by exactly one session; nothing here is shared.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ledger::OrderLedger;
use crate::pricing::OrderTotals;
use crate::types::{CarRef, CatalogRef, ClientRef};
use crate::validation::{is_empty_ref, line_warnings, LineWarning};

// =============================================================================
// Header
// =============================================================================

/// Everything on the order apart from its lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DraftHeader {
    pub client: Option<ClientRef>,
    pub car: Option<CarRef>,
    pub repair_type: Option<CatalogRef>,
    pub workshop: Option<CatalogRef>,
    pub master: Option<CatalogRef>,
    /// Odometer reading as typed by the operator.
    pub mileage: String,
    /// Reason for the visit.
    pub comment: String,
}

/// The operator-editable part of the header. The client is chosen separately
/// through [`DraftOrder::begin`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct HeaderDetails {
    pub car: Option<CarRef>,
    pub repair_type: Option<CatalogRef>,
    pub workshop: Option<CatalogRef>,
    pub master: Option<CatalogRef>,
    pub mileage: String,
    pub comment: String,
}

fn selected<T: AsRef<str>>(value: Option<T>) -> Option<T> {
    value.filter(|v| !is_empty_ref(v.as_ref()))
}

// =============================================================================
// Draft Order
// =============================================================================

/// One in-progress order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrder {
    header: DraftHeader,
    ledger: OrderLedger,
    #[ts(as = "String")]
    started_at: DateTime<Utc>,
}

impl Default for DraftOrder {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftOrder {
    /// An empty draft with no client.
    pub fn new() -> Self {
        DraftOrder {
            header: DraftHeader::default(),
            ledger: OrderLedger::new(),
            started_at: Utc::now(),
        }
    }

    /// An empty draft for `client`.
    pub fn for_client(client: ClientRef) -> Self {
        let mut draft = Self::new();
        draft.header.client = Some(client);
        draft
    }

    /// Starts over for `client`: header and lines are reset.
    pub fn begin(&mut self, client: ClientRef) {
        *self = Self::for_client(client);
    }

    /// Drops everything, leaving an empty draft with no client.
    pub fn discard(&mut self) {
        *self = Self::new();
    }

    /// Replaces the editable header fields. The client is kept.
    ///
    /// Empty references (blank or the all-zero GUID) count as unselected.
    pub fn set_details(&mut self, details: HeaderDetails) {
        let client = self.header.client.take();
        self.header = DraftHeader {
            client,
            car: selected(details.car),
            repair_type: selected(details.repair_type),
            workshop: selected(details.workshop),
            master: selected(details.master),
            mileage: details.mileage,
            comment: details.comment,
        };
    }

    pub fn header(&self) -> &DraftHeader {
        &self.header
    }

    pub fn client(&self) -> Option<&ClientRef> {
        self.header.client.as_ref()
    }

    pub fn ledger(&self) -> &OrderLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut OrderLedger {
        &mut self.ledger
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Totals recomputed from the current lines.
    pub fn totals(&self) -> OrderTotals {
        OrderTotals::from(&self.ledger)
    }

    /// Non-blocking remarks about the current lines.
    pub fn warnings(&self) -> Vec<LineWarning> {
        line_warnings(&self.ledger)
    }
}
