//! Property tests for the order ledger.
//!
//! Random sequences of add/edit/remove/clear commands run against an
//! [`OrderLedger`] and against a plain list kept alongside it. After every
//! command the two must agree line for line, and the totals must equal a
//! fresh sum over the lines.

use proptest::prelude::*;

use sto_core::{
    CatalogEntry, LineEdit, LineField, LineKind, OrderLedger, OrderTotals, PartLine, WorkLine,
};

#[derive(Debug, Clone)]
enum Command {
    AddWork(u8),
    AddPart(u8),
    Edit(LineKind, usize, LineField, String),
    Remove(LineKind, usize),
    Clear,
}

#[derive(Debug, Clone, PartialEq)]
struct Row {
    reference: String,
    qty: f64,
    price: f64,
    discount: f64,
}

impl Row {
    fn new(reference: String) -> Self {
        Row {
            reference,
            qty: 1.0,
            price: 0.0,
            discount: 0.0,
        }
    }
}

#[derive(Debug, Default)]
struct Model {
    works: Vec<Row>,
    parts: Vec<Row>,
}

impl Model {
    fn rows(&mut self, kind: LineKind) -> &mut Vec<Row> {
        match kind {
            LineKind::Work => &mut self.works,
            LineKind::Part => &mut self.parts,
        }
    }

    fn apply(&mut self, command: &Command) {
        match command {
            Command::AddWork(n) => self.works.push(Row::new(format!("w{}", n))),
            Command::AddPart(n) => self.parts.push(Row::new(format!("p{}", n))),
            Command::Edit(kind, index, field, raw) => {
                let edit = LineEdit::from_input(*field, raw);
                let is_work = *kind == LineKind::Work;
                if let Some(row) = self.rows(*kind).get_mut(*index) {
                    match edit {
                        LineEdit::SetQty(v) => row.qty = v,
                        LineEdit::SetPrice(v) => row.price = v,
                        LineEdit::SetDiscount(v) if !is_work => row.discount = v,
                        LineEdit::SetDiscount(_) => {}
                    }
                }
            }
            Command::Remove(kind, index) => {
                let rows = self.rows(*kind);
                if *index < rows.len() {
                    rows.remove(*index);
                }
            }
            Command::Clear => {
                self.works.clear();
                self.parts.clear();
            }
        }
    }

    fn works_total(&self) -> f64 {
        self.works.iter().map(|r| r.qty * r.price).sum()
    }

    fn parts_total(&self) -> f64 {
        self.parts
            .iter()
            .map(|r| r.qty * r.price * (1.0 - r.discount / 100.0))
            .sum()
    }
}

fn apply(ledger: &mut OrderLedger, command: &Command) {
    match command {
        Command::AddWork(n) => ledger.add_work(&CatalogEntry::new(format!("w{}", n), "Работа")),
        Command::AddPart(n) => ledger.add_part(&CatalogEntry::new(format!("p{}", n), "Деталь")),
        Command::Edit(kind, index, field, raw) => {
            ledger.update_line(*kind, *index, LineEdit::from_input(*field, raw));
        }
        Command::Remove(kind, index) => {
            ledger.remove_line(*kind, *index);
        }
        Command::Clear => ledger.clear(),
    }
}

fn work_row(line: &WorkLine) -> Row {
    Row {
        reference: line.reference.as_str().to_string(),
        qty: line.qty,
        price: line.price,
        discount: 0.0,
    }
}

fn part_row(line: &PartLine) -> Row {
    Row {
        reference: line.reference.as_str().to_string(),
        qty: line.qty,
        price: line.price,
        discount: line.discount,
    }
}

// =============================================================================
// Strategies
// =============================================================================

fn kind_strategy() -> impl Strategy<Value = LineKind> {
    prop_oneof![Just(LineKind::Work), Just(LineKind::Part)]
}

fn field_strategy() -> impl Strategy<Value = LineField> {
    prop_oneof![
        Just(LineField::Qty),
        Just(LineField::Price),
        Just(LineField::Discount)
    ]
}

/// What an operator might type into a numeric cell.
fn input_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (-100_000i64..1_000_000, 0u8..100)
            .prop_map(|(whole, cents)| format!("{}.{:02}", whole, cents)),
        2 => "[0-9]{0,6}[.,]?[0-9]{0,2}[a-zа-я ]{0,3}",
        1 => Just("1e400".to_string()),
        1 => Just(String::new()),
    ]
}

/// Indexes mostly in range, sometimes far past the end.
fn index_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![4 => 0usize..6, 1 => 6usize..usize::MAX]
}

fn command_strategy() -> impl Strategy<Value = Command> {
    prop_oneof![
        3 => any::<u8>().prop_map(Command::AddWork),
        3 => any::<u8>().prop_map(Command::AddPart),
        6 => (kind_strategy(), index_strategy(), field_strategy(), input_strategy())
            .prop_map(|(kind, index, field, raw)| Command::Edit(kind, index, field, raw)),
        2 => (kind_strategy(), index_strategy())
            .prop_map(|(kind, index)| Command::Remove(kind, index)),
        1 => Just(Command::Clear),
    ]
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn ledger_tracks_reference_model(commands in prop::collection::vec(command_strategy(), 0..60)) {
        let mut ledger = OrderLedger::new();
        let mut model = Model::default();

        for command in &commands {
            apply(&mut ledger, command);
            model.apply(command);

            let works: Vec<Row> = ledger.works().iter().map(work_row).collect();
            let parts: Vec<Row> = ledger.parts().iter().map(part_row).collect();
            prop_assert_eq!(&works, &model.works, "after {:?}", command);
            prop_assert_eq!(&parts, &model.parts, "after {:?}", command);

            let totals = OrderTotals::from(&ledger);
            prop_assert_eq!(totals.works_total, model.works_total());
            prop_assert_eq!(totals.parts_total, model.parts_total());
            prop_assert_eq!(totals.order_total, totals.works_total + totals.parts_total);
            prop_assert!(totals.order_total.is_finite());
        }
    }

    #[test]
    fn removing_a_line_keeps_the_others_in_order(
        count in 1usize..12,
        picked in any::<prop::sample::Index>(),
        kind in kind_strategy(),
    ) {
        let mut ledger = OrderLedger::new();
        for n in 0..count {
            ledger.add_work(&CatalogEntry::new(format!("w{}", n), "Работа"));
            ledger.add_part(&CatalogEntry::new(format!("p{}", n), "Деталь"));
        }
        let index = picked.index(count);
        let before = ledger.clone();

        prop_assert!(ledger.remove_line(kind, index));

        let refs = |l: &OrderLedger, k: LineKind| -> Vec<String> {
            match k {
                LineKind::Work => l.works().iter().map(|w| w.reference.as_str().to_string()).collect(),
                LineKind::Part => l.parts().iter().map(|p| p.reference.as_str().to_string()).collect(),
            }
        };
        let mut expected = refs(&before, kind);
        expected.remove(index);
        prop_assert_eq!(refs(&ledger, kind), expected);

        // The other sequence is untouched
        let other = match kind {
            LineKind::Work => LineKind::Part,
            LineKind::Part => LineKind::Work,
        };
        prop_assert_eq!(refs(&ledger, other), refs(&before, other));
    }

    #[test]
    fn out_of_range_commands_change_nothing(
        commands in prop::collection::vec(command_strategy(), 0..20),
        kind in kind_strategy(),
        past_end in 0usize..1000,
        field in field_strategy(),
        raw in input_strategy(),
    ) {
        let mut ledger = OrderLedger::new();
        for command in &commands {
            apply(&mut ledger, command);
        }
        let before = ledger.clone();
        let index = ledger.len(kind).saturating_add(past_end);

        prop_assert!(!ledger.update_line(kind, index, LineEdit::from_input(field, &raw)));
        prop_assert!(!ledger.remove_line(kind, index));
        prop_assert_eq!(ledger, before);
    }
}
