//! # Pricing
//!
//! Line amounts and order totals.
//!
//! ## Formulas
//! ```text
//! work line amount  = qty × price
//! part line amount  = qty × price × (1 − discount / 100)
//!
//! works_total = Σ work amounts
//! parts_total = Σ part amounts
//! order_total = works_total + parts_total
//! ```
//!
//! Totals are always recomputed from the lines, never cached on the ledger,
//! so they cannot drift from the current line values. Arithmetic stays in
//! `f64`; rounding happens only when formatting for display
//! (see [`crate::money::format_amount`]).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ledger::OrderLedger;
use crate::types::{PartLine, WorkLine};

/// Anything that contributes an amount to the order total.
pub trait LineAmount {
    fn amount(&self) -> f64;
}

impl LineAmount for WorkLine {
    fn amount(&self) -> f64 {
        self.qty * self.price
    }
}

impl LineAmount for PartLine {
    fn amount(&self) -> f64 {
        self.qty * self.price * (1.0 - self.discount / 100.0)
    }
}

/// Sum of work line amounts.
pub fn works_total(lines: &[WorkLine]) -> f64 {
    lines.iter().map(LineAmount::amount).sum()
}

/// Sum of part line amounts, discounts applied.
pub fn parts_total(lines: &[PartLine]) -> f64 {
    lines.iter().map(LineAmount::amount).sum()
}

/// Works total plus parts total.
pub fn order_total(works: &[WorkLine], parts: &[PartLine]) -> f64 {
    works_total(works) + parts_total(parts)
}

/// Calculated totals of a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub works_total: f64,
    pub parts_total: f64,
    pub order_total: f64,
}

impl From<&OrderLedger> for OrderTotals {
    fn from(ledger: &OrderLedger) -> Self {
        let works_total = works_total(ledger.works());
        let parts_total = parts_total(ledger.parts());
        OrderTotals {
            works_total,
            parts_total,
            order_total: works_total + parts_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LineEdit;
    use crate::types::{CatalogEntry, LineKind};

    fn work(qty: f64, price: f64) -> WorkLine {
        WorkLine {
            qty,
            price,
            ..WorkLine::from_entry(&CatalogEntry::new("w", "Работа"))
        }
    }

    fn part(qty: f64, price: f64, discount: f64) -> PartLine {
        PartLine {
            qty,
            price,
            discount,
            ..PartLine::from_entry(&CatalogEntry::new("p", "Деталь"))
        }
    }

    #[test]
    fn test_works_total() {
        assert_eq!(works_total(&[work(2.0, 50.0), work(1.0, 80.0)]), 180.0);
    }

    #[test]
    fn test_parts_total_applies_discount() {
        assert_eq!(parts_total(&[part(1.0, 100.0, 0.0), part(1.0, 100.0, 50.0)]), 150.0);
    }

    #[test]
    fn test_empty_totals_are_zero() {
        let totals = OrderTotals::from(&OrderLedger::new());
        assert_eq!(totals, OrderTotals::default());
        assert_eq!(order_total(&[], &[]), 0.0);
    }

    #[test]
    fn test_full_discount_zeroes_line() {
        assert_eq!(part(3.0, 120.0, 100.0).amount(), 0.0);
    }

    #[test]
    fn test_order_total_from_ledger() {
        let mut ledger = OrderLedger::new();
        ledger.add_work(&CatalogEntry::new("w1", "Замена масла"));
        ledger.add_part(&CatalogEntry::new("p1", "Фильтр"));
        ledger.update_line(LineKind::Work, 0, LineEdit::SetPrice(1000.0));
        ledger.update_line(LineKind::Part, 0, LineEdit::SetPrice(500.0));
        ledger.update_line(LineKind::Part, 0, LineEdit::SetDiscount(10.0));

        let totals = OrderTotals::from(&ledger);

        assert_eq!(totals.works_total, 1000.0);
        assert_eq!(totals.parts_total, 450.0);
        assert_eq!(totals.order_total, 1450.0);
    }

    #[test]
    fn test_totals_follow_every_mutation() {
        let mut ledger = OrderLedger::new();
        ledger.add_work(&CatalogEntry::new("w1", "Диагностика"));
        ledger.update_line(LineKind::Work, 0, LineEdit::SetPrice(700.0));
        assert_eq!(OrderTotals::from(&ledger).order_total, 700.0);

        ledger.update_line(LineKind::Work, 0, LineEdit::SetQty(2.0));
        assert_eq!(OrderTotals::from(&ledger).order_total, 1400.0);

        ledger.remove_line(LineKind::Work, 0);
        assert_eq!(OrderTotals::from(&ledger).order_total, 0.0);
    }

    #[test]
    fn test_totals_serialize_camel_case() {
        let json = serde_json::to_value(OrderTotals {
            works_total: 1.0,
            parts_total: 2.0,
            order_total: 3.0,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "worksTotal": 1.0, "partsTotal": 2.0, "orderTotal": 3.0 })
        );
    }
}
