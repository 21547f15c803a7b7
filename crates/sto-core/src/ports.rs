//! # Ports
//!
//! The two capabilities the order flow needs from the outside world, plus
//! [`RecordStore`] for the pages around the order form.
//!
//! ```text
//!            sto-core                         sto-erp
//!  ┌──────────────────────────┐      ┌──────────────────────────┐
//!  │ trait CatalogLookup      │◄─────│ ODataCatalog             │
//!  │ trait OrderSubmission    │◄─────│ ODataOrderSubmission     │
//!  │ trait RecordStore        │◄─────│ ODataRecords             │
//!  └──────────────────────────┘      └──────────────────────────┘
//! ```
//!
//! Implementations report failures as [`CoreError::Catalog`] (reads) /
//! [`CoreError::Submission`] (writes) carrying an opaque message. Callers
//! never retry.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::draft::DraftOrder;
use crate::error::{CoreError, CoreResult};
use crate::records::{
    ClientDetails, ClientOverview, CreatedRecord, DashboardStats, NewCar, NewClient,
    OrderDetails, OrderFilter, OrderSummary, OrderUpdate, CLIENT_HISTORY_LIMIT,
    DASHBOARD_ORDER_LIMIT,
};
use crate::submission::{OrderPayload, SubmissionReceipt};
use crate::types::{Car, CarRef, CatalogEntry, CatalogKind, CatalogRef, ClientRef, OrderRef};

/// Read access to the ERP catalogs.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Entries of `kind` matching `query`, at most `limit` of them.
    async fn search(
        &self,
        kind: CatalogKind,
        query: &str,
        limit: usize,
    ) -> CoreResult<Vec<CatalogEntry>>;

    /// Display name of `reference`, or `None` when the catalog has no such entry.
    async fn resolve_name(
        &self,
        kind: CatalogKind,
        reference: &CatalogRef,
    ) -> CoreResult<Option<String>>;

    /// Cars associated with `client`.
    async fn client_cars(&self, client: &ClientRef) -> CoreResult<Vec<Car>>;
}

/// Hands finished orders to the ERP.
#[async_trait]
pub trait OrderSubmission: Send + Sync {
    async fn submit(&self, payload: &OrderPayload) -> CoreResult<SubmissionReceipt>;
}

/// Clients, cars and stored orders as the ERP holds them.
///
/// Lookups of a record that does not exist answer `Ok(None)`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn client(&self, client: &ClientRef) -> CoreResult<Option<ClientDetails>>;

    async fn car(&self, car: &CarRef) -> CoreResult<Option<Car>>;

    /// Stored orders matching `filter`, newest first.
    async fn orders(&self, filter: &OrderFilter) -> CoreResult<Vec<OrderSummary>>;

    async fn order(&self, order: &OrderRef) -> CoreResult<Option<OrderDetails>>;

    /// Number of records in the catalog of `kind`.
    async fn count(&self, kind: CatalogKind) -> CoreResult<u64>;

    async fn create_client(&self, client: &NewClient) -> CoreResult<CreatedRecord>;

    async fn create_car(&self, car: &NewCar) -> CoreResult<CreatedRecord>;

    async fn update_order(&self, order: &OrderRef, update: &OrderUpdate) -> CoreResult<()>;
}

/// Client card with the client's cars and latest orders, or `None` for an
/// unknown client.
pub async fn client_overview(
    records: &dyn RecordStore,
    catalog: &dyn CatalogLookup,
    client: &ClientRef,
) -> CoreResult<Option<ClientOverview>> {
    let Some(details) = records.client(client).await? else {
        return Ok(None);
    };
    let cars = catalog.client_cars(client).await?;
    let orders = records
        .orders(&OrderFilter::for_client(client.clone(), CLIENT_HISTORY_LIMIT))
        .await?;

    debug!(%client, cars = cars.len(), orders = orders.len(), "client overview");
    Ok(Some(ClientOverview::new(details, cars, orders)))
}

/// Start page figures as of `today`, from the most recent orders.
pub async fn dashboard(records: &dyn RecordStore, today: NaiveDate) -> CoreResult<DashboardStats> {
    let orders = records
        .orders(&OrderFilter {
            limit: DASHBOARD_ORDER_LIMIT,
            ..OrderFilter::default()
        })
        .await?;
    let clients = records.count(CatalogKind::Clients).await?;
    let cars = records.count(CatalogKind::Cars).await?;

    Ok(DashboardStats::compute(&orders, today, clients, cars))
}

/// Builds a catalog entry for a line added by reference.
///
/// A supplied `name` is used as is; otherwise the catalog is asked for it.
pub async fn resolve_entry(
    lookup: &dyn CatalogLookup,
    kind: CatalogKind,
    reference: CatalogRef,
    name: Option<String>,
) -> CoreResult<CatalogEntry> {
    if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
        return Ok(CatalogEntry::new(reference, name));
    }

    debug!(%kind, %reference, "resolving entry name");
    match lookup.resolve_name(kind, &reference).await? {
        Some(name) => Ok(CatalogEntry::new(reference, name)),
        None => Err(CoreError::CatalogEntryNotFound(reference.into_inner())),
    }
}

/// Builds the payload for `draft` and submits it.
///
/// Without a client this fails with [`CoreError::NoClientSelected`] before
/// `submission` is touched.
pub async fn submit_draft(
    draft: &DraftOrder,
    submission: &dyn OrderSubmission,
) -> CoreResult<SubmissionReceipt> {
    let payload = OrderPayload::from_draft(draft)?;
    let receipt = submission.submit(&payload).await?;

    info!(number = %receipt.number, total = payload.total(), "order submitted");
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LineKind;
    use crate::ledger::LineEdit;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSubmission {
        calls: AtomicUsize,
        last: Mutex<Option<OrderPayload>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl OrderSubmission for RecordingSubmission {
        async fn submit(&self, payload: &OrderPayload) -> CoreResult<SubmissionReceipt> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(payload.clone());
            match &self.fail_with {
                Some(message) => Err(CoreError::Submission(message.clone())),
                None => Ok(SubmissionReceipt::new(" 0000000042  ", None)),
            }
        }
    }

    #[derive(Default)]
    struct NamedCatalog {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CatalogLookup for NamedCatalog {
        async fn search(
            &self,
            _kind: CatalogKind,
            _query: &str,
            _limit: usize,
        ) -> CoreResult<Vec<CatalogEntry>> {
            Ok(Vec::new())
        }

        async fn resolve_name(
            &self,
            _kind: CatalogKind,
            reference: &CatalogRef,
        ) -> CoreResult<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((reference.as_str() == "w1").then(|| "Замена масла".to_string()))
        }

        async fn client_cars(&self, _client: &ClientRef) -> CoreResult<Vec<Car>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct MemoryRecords {
        orders: Vec<OrderSummary>,
        filters: Mutex<Vec<OrderFilter>>,
    }

    #[async_trait]
    impl RecordStore for MemoryRecords {
        async fn client(&self, client: &ClientRef) -> CoreResult<Option<ClientDetails>> {
            Ok((client.as_str() == "c-1").then(|| ClientDetails {
                reference: client.clone(),
                name: "Иванов".into(),
                full_name: "Иванов Иван".into(),
                code: Some("00001".into()),
                inn: None,
                comment: None,
                phone: None,
                address: None,
            }))
        }

        async fn car(&self, _car: &CarRef) -> CoreResult<Option<Car>> {
            Ok(None)
        }

        async fn orders(&self, filter: &OrderFilter) -> CoreResult<Vec<OrderSummary>> {
            self.filters.lock().unwrap().push(filter.clone());
            Ok(self.orders.clone())
        }

        async fn order(&self, _order: &OrderRef) -> CoreResult<Option<OrderDetails>> {
            Ok(None)
        }

        async fn count(&self, kind: CatalogKind) -> CoreResult<u64> {
            Ok(match kind {
                CatalogKind::Clients => 40,
                CatalogKind::Cars => 25,
                _ => 0,
            })
        }

        async fn create_client(&self, _client: &NewClient) -> CoreResult<CreatedRecord> {
            Err(CoreError::Submission("read-only".into()))
        }

        async fn create_car(&self, _car: &NewCar) -> CoreResult<CreatedRecord> {
            Err(CoreError::Submission("read-only".into()))
        }

        async fn update_order(&self, _order: &OrderRef, _update: &OrderUpdate) -> CoreResult<()> {
            Err(CoreError::Submission("read-only".into()))
        }
    }

    fn stored(date: NaiveDate, posted: bool, works: f64) -> OrderSummary {
        OrderSummary {
            reference: "d".into(),
            number: "ЗН1".into(),
            date: Some(date),
            client: Some("c-1".into()),
            client_name: None,
            state: crate::records::DocumentState::from_posted(posted),
            works_sum: works,
            parts_sum: 0.0,
            comment: String::new(),
        }
    }

    #[tokio::test]
    async fn test_client_overview_asks_for_history() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        let records = MemoryRecords {
            orders: vec![stored(today, true, 300.0), stored(today, false, 200.0)],
            ..MemoryRecords::default()
        };
        let catalog = NamedCatalog::default();

        let overview = client_overview(&records, &catalog, &"c-1".into())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(overview.client.full_name, "Иванов Иван");
        assert_eq!(overview.total_sum, 500.0);
        let filters = records.filters.lock().unwrap();
        assert_eq!(filters[0].client.as_ref().map(ClientRef::as_str), Some("c-1"));
        assert_eq!(filters[0].limit, CLIENT_HISTORY_LIMIT);

        assert!(client_overview(&records, &catalog, &"c-404".into())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_dashboard_combines_orders_and_counts() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 5, 16).unwrap();
        let records = MemoryRecords {
            orders: vec![stored(today, false, 300.0), stored(yesterday, true, 200.0)],
            ..MemoryRecords::default()
        };

        let stats = dashboard(&records, today).await.unwrap();

        assert_eq!(stats.orders_today, 1);
        assert_eq!(stats.sum_today, 300.0);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.total_sum, 500.0);
        assert_eq!((stats.clients_count, stats.cars_count), (40, 25));
        assert_eq!(records.filters.lock().unwrap()[0].limit, DASHBOARD_ORDER_LIMIT);
    }

    #[tokio::test]
    async fn test_submit_without_client_makes_no_call() {
        let submission = RecordingSubmission::default();
        let mut draft = DraftOrder::new();
        draft.ledger_mut().add_work(&CatalogEntry::new("w1", "Замена масла"));

        let result = submit_draft(&draft, &submission).await;

        assert!(matches!(result, Err(CoreError::NoClientSelected)));
        assert_eq!(submission.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_passes_computed_sums() {
        let submission = RecordingSubmission::default();
        let mut draft = DraftOrder::for_client("c-1".into());
        draft.ledger_mut().add_part(&CatalogEntry::new("p1", "Фильтр"));
        draft.ledger_mut().update_line(LineKind::Part, 0, LineEdit::SetQty(2.0));
        draft.ledger_mut().update_line(LineKind::Part, 0, LineEdit::SetPrice(100.0));
        draft.ledger_mut().update_line(LineKind::Part, 0, LineEdit::SetDiscount(10.0));

        let receipt = submit_draft(&draft, &submission).await.unwrap();

        assert_eq!(receipt.number, "0000000042");
        assert_eq!(submission.calls.load(Ordering::SeqCst), 1);
        let sent = submission.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.parts[0].sum, 180.0);
    }

    #[tokio::test]
    async fn test_submission_failure_is_propagated_once() {
        let submission = RecordingSubmission {
            fail_with: Some("Не заполнено поле Организация".to_string()),
            ..RecordingSubmission::default()
        };
        let draft = DraftOrder::for_client("c-1".into());

        let err = submit_draft(&draft, &submission).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Order submission failed: Не заполнено поле Организация"
        );
        assert_eq!(submission.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_entry_prefers_supplied_name() {
        let catalog = NamedCatalog::default();

        let entry = resolve_entry(&catalog, CatalogKind::Works, "w9".into(), Some("Шиномонтаж".into()))
            .await
            .unwrap();

        assert_eq!(entry.name, "Шиномонтаж");
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_entry_asks_catalog() {
        let catalog = NamedCatalog::default();

        let entry = resolve_entry(&catalog, CatalogKind::Works, "w1".into(), None)
            .await
            .unwrap();
        assert_eq!(entry.name, "Замена масла");

        let missing = resolve_entry(&catalog, CatalogKind::Works, "nope".into(), Some("  ".into())).await;
        assert!(matches!(missing, Err(CoreError::CatalogEntryNotFound(r)) if r == "nope"));
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 2);
    }
}
