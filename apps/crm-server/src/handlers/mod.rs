//! # HTTP Handlers
//!
//! Every draft command answers with the whole [`DraftResponse`]: the front end
//! re-renders lines and totals from it after each mutation.
//!
//! ## Modules
//! - [`session`] - open and close sessions
//! - [`draft`] - draft header, line commands, submission
//! - [`catalog`] - catalog searches and client cars
//! - [`records`] - client cards, cars, stored orders, dashboard

pub mod catalog;
pub mod draft;
pub mod records;
pub mod session;

use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;

use sto_core::money::format_amount;
use sto_core::{DraftHeader, DraftOrder, LineWarning, OrderTotals, PartLine, WorkLine};

/// Lines, totals and header of one draft.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub works: Vec<WorkLine>,
    pub parts: Vec<PartLine>,
    pub totals: OrderTotals,
    /// `totals` rendered for display, e.g. `1 450,00 ₽`
    pub display: DisplayTotals,
    pub header: DraftHeader,
    pub warnings: Vec<LineWarning>,
    /// When the current draft was started
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayTotals {
    pub works_total: String,
    pub parts_total: String,
    pub order_total: String,
}

impl From<&OrderTotals> for DisplayTotals {
    fn from(totals: &OrderTotals) -> Self {
        DisplayTotals {
            works_total: format_amount(totals.works_total),
            parts_total: format_amount(totals.parts_total),
            order_total: format_amount(totals.order_total),
        }
    }
}

impl From<&DraftOrder> for DraftResponse {
    fn from(draft: &DraftOrder) -> Self {
        let totals = draft.totals();
        DraftResponse {
            works: draft.ledger().works().to_vec(),
            parts: draft.ledger().parts().to_vec(),
            display: DisplayTotals::from(&totals),
            totals,
            header: draft.header().clone(),
            warnings: draft.warnings(),
            started_at: draft.started_at(),
        }
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use sto_core::{CatalogEntry, LineEdit, LineKind};

    #[test]
    fn test_response_matches_draft() {
        let mut draft = DraftOrder::for_client("c-1".into());
        draft
            .ledger_mut()
            .add_work(&CatalogEntry::new("w1", "Замена масла"));
        draft
            .ledger_mut()
            .add_part(&CatalogEntry::new("p1", "Фильтр"));
        draft
            .ledger_mut()
            .update_line(LineKind::Work, 0, LineEdit::price_from_input("1000"));
        draft
            .ledger_mut()
            .update_line(LineKind::Part, 0, LineEdit::price_from_input("500"));
        draft
            .ledger_mut()
            .update_line(LineKind::Part, 0, LineEdit::discount_from_input("10"));

        let json = serde_json::to_value(DraftResponse::from(&draft)).unwrap();

        assert_eq!(json["totals"]["worksTotal"], 1000.0);
        assert_eq!(json["totals"]["partsTotal"], 450.0);
        assert_eq!(json["totals"]["orderTotal"], 1450.0);
        assert_eq!(json["display"]["orderTotal"], "1 450,00 ₽");
        assert_eq!(json["works"][0]["name"], "Замена масла");
        assert_eq!(json["header"]["client"], "c-1");
        assert!(json["warnings"].as_array().unwrap().is_empty());
        assert_eq!(
            json["startedAt"],
            serde_json::to_value(draft.started_at()).unwrap()
        );
    }
}
