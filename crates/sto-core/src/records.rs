//! # ERP Records
//!
//! What already lives in the ERP, as the CRM pages around the order form see
//! it: client cards, cars, stored orders and the dashboard figures computed
//! from them. Also the few write requests those pages make.
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │  ClientOverview  │   │   OrderDetails   │   │  DashboardStats  │
//! │  card + cars +   │   │  summary + rows  │   │  computed from   │
//! │  order history   │   │  + cars          │   │  recent orders   │
//! └────────┬─────────┘   └────────┬─────────┘   └────────┬─────────┘
//!          └──────────────────────┼──────────────────────┘
//!                                 ▼
//!                           OrderSummary
//! ```
//!
//! Stored orders are read-only here: their sums are whatever the ERP holds and
//! are never recomputed through the ledger.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::{Car, CatalogRef, ClientRef, OrderRef};
use crate::validation::{is_empty_ref, ValidationResult};

/// Longest accepted name of a new client or car.
pub const MAX_NAME_LEN: usize = 150;

/// Longest accepted VIN.
pub const MAX_VIN_LEN: usize = 17;

/// Default number of orders in a list.
pub const DEFAULT_ORDER_LIMIT: usize = 100;

/// Largest order list the ERP is asked for.
pub const MAX_ORDER_LIMIT: usize = 500;

/// Orders shown on a client card.
pub const CLIENT_HISTORY_LIMIT: usize = 50;

/// Recent orders the dashboard is computed from.
pub const DASHBOARD_ORDER_LIMIT: usize = 500;

// =============================================================================
// Stored Orders
// =============================================================================

/// Whether a stored order has been posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DocumentState {
    Draft,
    Posted,
}

impl DocumentState {
    pub fn from_posted(posted: bool) -> Self {
        if posted {
            DocumentState::Posted
        } else {
            DocumentState::Draft
        }
    }

    /// Label shown in order lists.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentState::Draft => "Черновик",
            DocumentState::Posted => "Проведен",
        }
    }
}

impl std::str::FromStr for DocumentState {
    type Err = ValidationError;

    /// Accepts the list filter values `draft` and `done`/`posted`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(DocumentState::Draft),
            "done" | "posted" => Ok(DocumentState::Posted),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["draft".to_string(), "done".to_string()],
            }),
        }
    }
}

/// One row of an order list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    #[serde(rename = "ref")]
    pub reference: OrderRef,
    /// Document number, trimmed.
    pub number: String,
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    pub client: Option<ClientRef>,
    pub client_name: Option<String>,
    pub state: DocumentState,
    pub works_sum: f64,
    pub parts_sum: f64,
    pub comment: String,
}

impl OrderSummary {
    pub fn total(&self) -> f64 {
        self.works_sum + self.parts_sum
    }
}

/// A labor or goods row of a stored order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderRow {
    #[serde(rename = "ref")]
    pub reference: CatalogRef,
    pub qty: f64,
    pub price: f64,
    /// Percentage; always 0 on labor rows.
    pub discount: f64,
    pub sum: f64,
}

/// A stored order with its tabular parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(flatten)]
    pub summary: OrderSummary,
    pub mileage: String,
    pub works: Vec<OrderRow>,
    pub parts: Vec<OrderRow>,
    pub cars: Vec<Car>,
}

/// Relative period of an order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Today,
    Week,
    Month,
    Quarter,
    Year,
    All,
}

impl Period {
    /// First day of the period ending `today`; `None` for [`Period::All`].
    pub fn start(&self, today: NaiveDate) -> Option<NaiveDate> {
        let days = match self {
            Period::Today => 0,
            Period::Week => 7,
            Period::Month => 30,
            Period::Quarter => 90,
            Period::Year => 365,
            Period::All => return None,
        };
        today.checked_sub_signed(Duration::days(days))
    }
}

impl std::str::FromStr for Period {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "today" => Ok(Period::Today),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "quarter" => Ok(Period::Quarter),
            "year" => Ok(Period::Year),
            "all" => Ok(Period::All),
            _ => Err(ValidationError::NotAllowed {
                field: "period".to_string(),
                allowed: ["today", "week", "month", "quarter", "year", "all"]
                    .iter()
                    .map(|p| p.to_string())
                    .collect(),
            }),
        }
    }
}

/// Which stored orders to list. Newest first, at most `limit`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFilter {
    pub client: Option<ClientRef>,
    pub state: Option<DocumentState>,
    /// First day, inclusive.
    pub from: Option<NaiveDate>,
    /// Last day, inclusive.
    pub to: Option<NaiveDate>,
    pub limit: usize,
}

impl Default for OrderFilter {
    fn default() -> Self {
        OrderFilter {
            client: None,
            state: None,
            from: None,
            to: None,
            limit: DEFAULT_ORDER_LIMIT,
        }
    }
}

impl OrderFilter {
    /// The latest orders of one client.
    pub fn for_client(client: ClientRef, limit: usize) -> Self {
        OrderFilter {
            client: Some(client),
            limit,
            ..OrderFilter::default()
        }
    }

    /// Sets `from` from a relative period. An explicit `from` wins.
    pub fn with_period(mut self, period: Period, today: NaiveDate) -> Self {
        if self.from.is_none() {
            self.from = period.start(today);
        }
        self
    }

    /// `limit` clamped to what the ERP is asked for.
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_ORDER_LIMIT)
    }
}

// =============================================================================
// Clients
// =============================================================================

/// A client card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetails {
    #[serde(rename = "ref")]
    pub reference: ClientRef,
    pub name: String,
    pub full_name: String,
    pub code: Option<String>,
    /// Taxpayer number.
    pub inn: Option<String>,
    pub comment: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A client card with its cars and latest orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ClientOverview {
    pub client: ClientDetails,
    pub cars: Vec<Car>,
    pub orders: Vec<OrderSummary>,
    pub total_sum: f64,
}

impl ClientOverview {
    pub fn new(client: ClientDetails, cars: Vec<Car>, orders: Vec<OrderSummary>) -> Self {
        let total_sum = orders.iter().map(OrderSummary::total).sum();
        ClientOverview {
            client,
            cars,
            orders,
            total_sum,
        }
    }
}

// =============================================================================
// Dashboard
// =============================================================================

/// Figures for the start page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub orders_today: usize,
    pub sum_today: f64,
    /// Orders not posted yet.
    pub in_progress: usize,
    pub total_orders: usize,
    pub total_sum: f64,
    #[ts(type = "number")]
    pub clients_count: u64,
    #[ts(type = "number")]
    pub cars_count: u64,
}

impl DashboardStats {
    /// Aggregates `orders` as of `today`.
    pub fn compute(orders: &[OrderSummary], today: NaiveDate, clients_count: u64, cars_count: u64) -> Self {
        let mut stats = DashboardStats {
            total_orders: orders.len(),
            clients_count,
            cars_count,
            ..DashboardStats::default()
        };

        for order in orders {
            let total = order.total();
            stats.total_sum += total;
            if order.date == Some(today) {
                stats.orders_today += 1;
                stats.sum_today += total;
            }
            if order.state == DocumentState::Draft {
                stats.in_progress += 1;
            }
        }

        stats
    }
}

// =============================================================================
// Write Requests
// =============================================================================

/// A client to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewClient {
    pub name: String,
    #[serde(default)]
    pub inn: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl NewClient {
    /// Trims fields and checks them.
    ///
    /// ## Rules
    /// - `name` is required, at most 150 characters
    /// - `inn`, when given, is 10 or 12 digits
    /// - blank optional fields count as absent
    pub fn validated(self) -> ValidationResult<Self> {
        let name = validate_name(&self.name)?;
        let inn = blank_to_none(self.inn);
        if let Some(inn) = &inn {
            let digits_only = inn.chars().all(|c| c.is_ascii_digit());
            if !digits_only || !(inn.len() == 10 || inn.len() == 12) {
                return Err(ValidationError::InvalidFormat {
                    field: "inn".to_string(),
                    reason: "must be 10 or 12 digits".to_string(),
                });
            }
        }

        Ok(NewClient {
            name,
            inn,
            comment: blank_to_none(self.comment),
        })
    }
}

/// A car to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCar {
    pub name: String,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub plate: Option<String>,
    #[serde(default)]
    pub owner: Option<ClientRef>,
}

impl NewCar {
    /// Trims fields and checks them.
    ///
    /// ## Rules
    /// - `name` is required, at most 150 characters
    /// - `vin` is upper-cased, alphanumeric, at most 17 characters
    /// - an empty owner reference counts as no owner
    pub fn validated(self) -> ValidationResult<Self> {
        let name = validate_name(&self.name)?;
        let vin = blank_to_none(self.vin).map(|v| v.to_uppercase());
        if let Some(vin) = &vin {
            if vin.chars().count() > MAX_VIN_LEN {
                return Err(ValidationError::TooLong {
                    field: "vin".to_string(),
                    max: MAX_VIN_LEN,
                });
            }
            if !vin.chars().all(|c| c.is_alphanumeric()) {
                return Err(ValidationError::InvalidFormat {
                    field: "vin".to_string(),
                    reason: "letters and digits only".to_string(),
                });
            }
        }

        Ok(NewCar {
            name,
            vin,
            plate: blank_to_none(self.plate),
            owner: self.owner.filter(|o| !is_empty_ref(o.as_str())),
        })
    }
}

/// Status and comment change of a stored order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderUpdate {
    #[serde(default)]
    pub status: Option<CatalogRef>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl OrderUpdate {
    /// At least one field must be set. An empty comment clears it.
    pub fn validated(self) -> ValidationResult<Self> {
        let status = self.status.filter(|s| !is_empty_ref(s.as_str()));
        if status.is_none() && self.comment.is_none() {
            return Err(ValidationError::Required {
                field: "status or comment".to_string(),
            });
        }
        Ok(OrderUpdate {
            status,
            comment: self.comment,
        })
    }
}

/// What the ERP reports back for a created record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreatedRecord {
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub code: String,
}

fn validate_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(name.to_string())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn order(date: Option<NaiveDate>, state: DocumentState, works: f64, parts: f64) -> OrderSummary {
        OrderSummary {
            reference: OrderRef::new("d"),
            number: "ЗН1".to_string(),
            date,
            client: None,
            client_name: None,
            state,
            works_sum: works,
            parts_sum: parts,
            comment: String::new(),
        }
    }

    #[test]
    fn test_dashboard_counts_today_and_drafts() {
        let orders = vec![
            order(Some(day(17)), DocumentState::Draft, 1000.0, 450.0),
            order(Some(day(17)), DocumentState::Posted, 500.0, 0.0),
            order(Some(day(16)), DocumentState::Draft, 0.0, 200.0),
            order(None, DocumentState::Posted, 100.0, 0.0),
        ];

        let stats = DashboardStats::compute(&orders, day(17), 12, 7);

        assert_eq!(stats.total_orders, 4);
        assert_eq!(stats.orders_today, 2);
        assert_eq!(stats.sum_today, 1950.0);
        assert_eq!(stats.in_progress, 2);
        assert_eq!(stats.total_sum, 2250.0);
        assert_eq!(stats.clients_count, 12);
        assert_eq!(stats.cars_count, 7);
    }

    #[test]
    fn test_dashboard_without_orders() {
        let stats = DashboardStats::compute(&[], day(1), 0, 0);
        assert_eq!(stats, DashboardStats::default());
    }

    #[test]
    fn test_period_start() {
        assert_eq!(Period::Today.start(day(17)), Some(day(17)));
        assert_eq!(Period::Week.start(day(17)), Some(day(10)));
        assert_eq!(Period::All.start(day(17)), None);
        assert!("fortnight".parse::<Period>().is_err());
    }

    #[test]
    fn test_explicit_from_wins_over_period() {
        let filter = OrderFilter {
            from: Some(day(1)),
            ..OrderFilter::default()
        }
        .with_period(Period::Today, day(17));
        assert_eq!(filter.from, Some(day(1)));

        let filter = OrderFilter::default().with_period(Period::Week, day(17));
        assert_eq!(filter.from, Some(day(10)));
    }

    #[test]
    fn test_limit_is_clamped() {
        let filter = OrderFilter {
            limit: 10_000,
            ..OrderFilter::default()
        };
        assert_eq!(filter.effective_limit(), MAX_ORDER_LIMIT);
        assert_eq!(OrderFilter::for_client("c".into(), 0).effective_limit(), 1);
    }

    #[test]
    fn test_document_state_filter_values() {
        assert_eq!("done".parse::<DocumentState>().unwrap(), DocumentState::Posted);
        assert_eq!("Draft".parse::<DocumentState>().unwrap(), DocumentState::Draft);
        assert!("archived".parse::<DocumentState>().is_err());
        assert_eq!(DocumentState::Posted.label(), "Проведен");
    }

    #[test]
    fn test_client_overview_total() {
        let client = ClientDetails {
            reference: "c-1".into(),
            name: "Иванов".into(),
            full_name: "Иванов И.И.".into(),
            code: None,
            inn: None,
            comment: None,
            phone: None,
            address: None,
        };
        let overview = ClientOverview::new(
            client,
            Vec::new(),
            vec![
                order(Some(day(1)), DocumentState::Posted, 100.0, 50.0),
                order(Some(day(2)), DocumentState::Draft, 0.0, 25.0),
            ],
        );
        assert_eq!(overview.total_sum, 175.0);
    }

    #[test]
    fn test_new_client_rules() {
        let client = NewClient {
            name: "  ООО Ромашка ".into(),
            inn: Some(" ".into()),
            comment: Some("".into()),
        }
        .validated()
        .unwrap();
        assert_eq!(client.name, "ООО Ромашка");
        assert!(client.inn.is_none());
        assert!(client.comment.is_none());

        let bad_inn = NewClient {
            name: "ИП Петров".into(),
            inn: Some("12345".into()),
            comment: None,
        };
        assert!(matches!(bad_inn.validated(), Err(ValidationError::InvalidFormat { .. })));

        let nameless = NewClient {
            name: " ".into(),
            inn: None,
            comment: None,
        };
        assert!(matches!(nameless.validated(), Err(ValidationError::Required { .. })));
    }

    #[test]
    fn test_new_car_rules() {
        let car = NewCar {
            name: "Kia Rio".into(),
            vin: Some(" z94cb41aagr323020 ".into()),
            plate: None,
            owner: Some(crate::EMPTY_REF.into()),
        }
        .validated()
        .unwrap();
        assert_eq!(car.vin.as_deref(), Some("Z94CB41AAGR323020"));
        assert!(car.owner.is_none());

        let long_vin = NewCar {
            name: "Kia Rio".into(),
            vin: Some("Z94CB41AAGR3230201".into()),
            plate: None,
            owner: None,
        };
        assert!(matches!(long_vin.validated(), Err(ValidationError::TooLong { .. })));
    }

    #[test]
    fn test_order_update_needs_a_field() {
        assert!(OrderUpdate::default().validated().is_err());

        let update = OrderUpdate {
            status: Some(crate::EMPTY_REF.into()),
            comment: Some(String::new()),
        }
        .validated()
        .unwrap();
        assert!(update.status.is_none());
        assert_eq!(update.comment.as_deref(), Some(""));
    }
}
