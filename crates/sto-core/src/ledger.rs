//! # Order Line Ledger
//!
//! Holds the ordered work and part lines of one draft order.
//!
//! ## Ledger Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Ledger Operations                                    │
//! │                                                                         │
//! │  Operator Action          Ledger Call              Sequence Change      │
//! │  ───────────────          ───────────              ───────────────      │
//! │                                                                         │
//! │  Pick work in catalog ───► add_work(entry) ──────► works.push(line)    │
//! │                                                                         │
//! │  Pick part in catalog ───► add_part(entry) ──────► parts.push(line)    │
//! │                                                                         │
//! │  Type in a cell ─────────► update_line(k, i, e) ─► lines[i].field = v  │
//! │                                                                         │
//! │  Click ✕ on a row ───────► remove_line(k, i) ────► lines.remove(i)     │
//! │                                                                         │
//! │  New order ──────────────► clear() ──────────────► both emptied        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Insertion order is the display order. Row number = index + 1.
//! - Removing a row shifts the following rows down; it never reorders them.
//! - The same catalog entry may appear on several lines.
//! - A mutation either fully applies or, for an out-of-range index, does
//!   nothing at all.

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::types::{CatalogEntry, LineKind, PartLine, WorkLine};

// =============================================================================
// Numeric Input Coercion
// =============================================================================

/// Turns a raw form value into a number. Never fails.
///
/// ## Rules
/// - Leading whitespace is skipped.
/// - The longest numeric prefix is used: `"12abc"` → 12, `"1,5"` → 1.
/// - No numeric prefix at all (`"abc"`, `""`, `"-"`) → 0.
/// - Values that overflow to infinity → 0.
///
/// ## Example
/// ```rust
/// use sto_core::ledger::coerce_numeric;
///
/// assert_eq!(coerce_numeric("250"), 250.0);
/// assert_eq!(coerce_numeric("12.5 руб"), 12.5);
/// assert_eq!(coerce_numeric("abc"), 0.0);
/// ```
pub fn coerce_numeric(raw: &str) -> f64 {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut i = 0;

    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_end = i;

    let mut frac_digits = 0;
    let mut frac_end = i;
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        frac_digits = j - frac_start;
        frac_end = j;
    }

    if int_end == int_start && frac_digits == 0 {
        return 0.0;
    }

    // "5." keeps the dot out of the mantissa
    let mantissa_end = if frac_digits == 0 { int_end } else { frac_end };
    let mut number = String::with_capacity(s.len());
    number.push_str(&s[..mantissa_end]);
    if int_end == int_start {
        // ".5" / "-.5"
        number.insert(int_start, '0');
    }

    let mut k = frac_end.max(int_end);
    if frac_digits == 0 && k < bytes.len() && bytes[k] == b'.' {
        k += 1;
    }
    if k < bytes.len() && (bytes[k] == b'e' || bytes[k] == b'E') {
        let mut j = k + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_digits_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_digits_start {
            number.push_str(&s[k..j]);
        }
    }

    match number.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

// =============================================================================
// Line Edits
// =============================================================================

/// Editable numeric field of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum LineField {
    Qty,
    Price,
    Discount,
}

/// A typed edit of one numeric field.
///
/// Constructed from raw form input via the `*_from_input` constructors, which
/// apply [`coerce_numeric`] per field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineEdit {
    SetQty(f64),
    SetPrice(f64),
    SetDiscount(f64),
}

impl LineEdit {
    pub fn qty_from_input(raw: &str) -> Self {
        LineEdit::SetQty(coerce_numeric(raw))
    }

    pub fn price_from_input(raw: &str) -> Self {
        LineEdit::SetPrice(coerce_numeric(raw))
    }

    pub fn discount_from_input(raw: &str) -> Self {
        LineEdit::SetDiscount(coerce_numeric(raw))
    }

    /// Builds the edit for `field` from raw form input.
    pub fn from_input(field: LineField, raw: &str) -> Self {
        match field {
            LineField::Qty => LineEdit::qty_from_input(raw),
            LineField::Price => LineEdit::price_from_input(raw),
            LineField::Discount => LineEdit::discount_from_input(raw),
        }
    }

    /// The field this edit targets.
    pub fn field(&self) -> LineField {
        match self {
            LineEdit::SetQty(_) => LineField::Qty,
            LineEdit::SetPrice(_) => LineField::Price,
            LineEdit::SetDiscount(_) => LineField::Discount,
        }
    }

    /// The (already coerced) value.
    pub fn value(&self) -> f64 {
        match *self {
            LineEdit::SetQty(v) | LineEdit::SetPrice(v) | LineEdit::SetDiscount(v) => v,
        }
    }

    fn apply_to_work(self, line: &mut WorkLine) -> bool {
        match self {
            LineEdit::SetQty(v) => line.qty = v,
            LineEdit::SetPrice(v) => line.price = v,
            // Labor carries no discount
            LineEdit::SetDiscount(_) => return false,
        }
        true
    }

    fn apply_to_part(self, line: &mut PartLine) -> bool {
        match self {
            LineEdit::SetQty(v) => line.qty = v,
            LineEdit::SetPrice(v) => line.price = v,
            LineEdit::SetDiscount(v) => line.discount = v,
        }
        true
    }
}

// =============================================================================
// Order Ledger
// =============================================================================

/// The ordered work and part lines of a draft order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLedger {
    works: Vec<WorkLine>,
    parts: Vec<PartLine>,
}

impl OrderLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a work line snapshotted from `entry` with `qty = 1, price = 0`.
    ///
    /// No duplicate check: billing the same labor twice is a real workflow.
    pub fn add_work(&mut self, entry: &CatalogEntry) {
        self.works.push(WorkLine::from_entry(entry));
        debug!(reference = %entry.reference, row = self.works.len(), "work line added");
    }

    /// Appends a part line snapshotted from `entry` with
    /// `qty = 1, price = 0, discount = 0`.
    pub fn add_part(&mut self, entry: &CatalogEntry) {
        self.parts.push(PartLine::from_entry(entry));
        debug!(reference = %entry.reference, row = self.parts.len(), "part line added");
    }

    /// Applies `edit` to the line at `index` of the `kind` sequence.
    ///
    /// ## Behavior
    /// - Out-of-range index: nothing changes, returns `false`.
    /// - `SetDiscount` on a work line: nothing changes, returns `false`.
    /// - No clamping: negative values and discounts above 100 are stored
    ///   as given (see [`crate::validation::line_warnings`]).
    pub fn update_line(&mut self, kind: LineKind, index: usize, edit: LineEdit) -> bool {
        let applied = match kind {
            LineKind::Work => self
                .works
                .get_mut(index)
                .map_or(false, |line| edit.apply_to_work(line)),
            LineKind::Part => self
                .parts
                .get_mut(index)
                .map_or(false, |line| edit.apply_to_part(line)),
        };

        debug!(
            %kind,
            index,
            field = ?edit.field(),
            value = edit.value(),
            applied,
            "line update"
        );
        applied
    }

    /// Removes the line at `index`, shifting later lines down by one.
    ///
    /// Out-of-range index: nothing changes, returns `false`.
    pub fn remove_line(&mut self, kind: LineKind, index: usize) -> bool {
        let removed = match kind {
            LineKind::Work if index < self.works.len() => {
                self.works.remove(index);
                true
            }
            LineKind::Part if index < self.parts.len() => {
                self.parts.remove(index);
                true
            }
            _ => false,
        };

        debug!(%kind, index, removed, "line removal");
        removed
    }

    /// Empties both sequences.
    pub fn clear(&mut self) {
        self.works.clear();
        self.parts.clear();
    }

    /// Work lines in display order.
    pub fn works(&self) -> &[WorkLine] {
        &self.works
    }

    /// Part lines in display order.
    pub fn parts(&self) -> &[PartLine] {
        &self.parts
    }

    /// Number of lines in the `kind` sequence.
    pub fn len(&self, kind: LineKind) -> usize {
        match kind {
            LineKind::Work => self.works.len(),
            LineKind::Part => self.parts.len(),
        }
    }

    /// Total number of lines across both sequences.
    pub fn line_count(&self) -> usize {
        self.works.len() + self.parts.len()
    }

    /// True when both sequences are empty.
    pub fn is_empty(&self) -> bool {
        self.works.is_empty() && self.parts.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
