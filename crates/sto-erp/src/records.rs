//! # Stored Records over OData
//!
//! [`ODataRecords`] reads client cards, cars and stored repair orders, counts
//! catalogs for the dashboard, and performs the few writes the CRM pages make
//! outside of order entry.
//!
//! ## Requests
//! ```text
//! client(ref)        GET  Catalog_Контрагенты(guid'…')
//! car(ref)           GET  Catalog_Автомобили(guid'…')
//! orders(filter)     GET  Document_ЗаказНаряд?$filter=…&$orderby=Date desc&$expand=Контрагент
//! order(ref)         GET  Document_ЗаказНаряд(guid'…')?$expand=Контрагент
//!                    GET  Document_ЗаказНаряд(guid'…')/Автоработы | /Товары | /Автомобили
//! count(kind)        GET  Catalog_…/$count  (falls back to counting Ref_Key rows)
//! create_client      POST Catalog_Контрагенты
//! create_car         POST Catalog_Автомобили
//! update_order       PATCH Document_ЗаказНаряд(guid'…')
//! ```
//!
//! References that are not GUIDs cannot be addressed and read as "no such
//! record".

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use sto_core::validation::is_empty_ref;
use sto_core::{
    Car, CarRef, CatalogKind, ClientDetails, ClientRef, CoreResult, CreatedRecord, DocumentState,
    NewCar, NewClient, OrderDetails, OrderFilter, OrderRef, OrderSummary, OrderUpdate,
    RecordStore, ValidationError,
};

use crate::catalog::collection;
use crate::client::ODataClient;
use crate::error::ErpResult;
use crate::models::{
    CarDocument, CatalogRecord, ClientDocument, ClientRecord, CreatedCatalogRecord,
    OrderCarRecord, OrderLineRecord, OrderPatch, OrderRecord,
};
use crate::orders::ORDER_COLLECTION;
use crate::query::{eq_guid, ODataQuery};

/// Rows read when a catalog cannot answer `$count`.
pub const COUNT_FALLBACK_LIMIT: usize = 1000;

/// Navigation property holding the counterparty of an order.
const ORDER_CLIENT: &str = "Контрагент";

fn is_guid(value: &str) -> bool {
    Uuid::parse_str(value).is_ok()
}

/// The order list request for `filter`.
pub fn orders_query(filter: &OrderFilter) -> ODataQuery {
    let mut query = ODataQuery::new(ORDER_COLLECTION);

    if let Some(client) = &filter.client {
        query = query.filter(eq_guid("Контрагент_Key", client.as_str()));
    }
    match filter.state {
        Some(DocumentState::Draft) => query = query.filter("Posted eq false"),
        Some(DocumentState::Posted) => query = query.filter("Posted eq true"),
        None => {}
    }
    if let Some(from) = filter.from {
        query = query.filter(format!("Date ge datetime'{}T00:00:00'", from.format("%Y-%m-%d")));
    }
    if let Some(to) = filter.to {
        query = query.filter(format!("Date le datetime'{}T23:59:59'", to.format("%Y-%m-%d")));
    }

    query
        .order_by("Date desc")
        .top(filter.effective_limit())
        .expand(ORDER_CLIENT)
}

/// A tabular part of one stored order.
pub fn order_part_query(order: &str, part: &str) -> ODataQuery {
    ODataQuery::new(ORDER_COLLECTION).key(order).navigate(part)
}

/// [`RecordStore`] backed by the 1C OData catalogs and documents.
#[derive(Clone)]
pub struct ODataRecords {
    client: ODataClient,
}

impl ODataRecords {
    pub fn new(client: ODataClient) -> Self {
        ODataRecords { client }
    }

    async fn order_rows(&self, order: &str, part: &str) -> ErpResult<Vec<OrderLineRecord>> {
        self.client.fetch(&order_part_query(order, part)).await
    }

    async fn order_cars(&self, order: &str) -> CoreResult<Vec<Car>> {
        let rows: Vec<OrderCarRecord> = self
            .client
            .fetch(&order_part_query(order, "Автомобили"))
            .await
            .map_err(|e| e.into_catalog_error())?;

        let mut cars = Vec::new();
        for key in rows.into_iter().filter_map(|row| row.car_key) {
            if is_empty_ref(&key) {
                continue;
            }
            if let Some(car) = self.car(&CarRef::new(key)).await? {
                cars.push(car);
            }
        }
        Ok(cars)
    }

    async fn count_rows(&self, kind: CatalogKind) -> ErpResult<u64> {
        let rows: Vec<CatalogRecord> = self
            .client
            .fetch(
                &ODataQuery::new(collection(kind))
                    .select("Ref_Key")
                    .top(COUNT_FALLBACK_LIMIT),
            )
            .await?;
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl RecordStore for ODataRecords {
    async fn client(&self, client: &ClientRef) -> CoreResult<Option<ClientDetails>> {
        if !is_guid(client.as_str()) {
            return Ok(None);
        }
        let record: Option<ClientRecord> = self
            .client
            .fetch_one(&ODataQuery::new(collection(CatalogKind::Clients)).key(client.as_str()))
            .await
            .map_err(|e| e.into_catalog_error())?;

        Ok(record.map(ClientRecord::into_details))
    }

    async fn car(&self, car: &CarRef) -> CoreResult<Option<Car>> {
        if !is_guid(car.as_str()) {
            return Ok(None);
        }
        let record: Option<CatalogRecord> = self
            .client
            .fetch_one(&ODataQuery::new(collection(CatalogKind::Cars)).key(car.as_str()))
            .await
            .map_err(|e| e.into_catalog_error())?;

        Ok(record.map(CatalogRecord::into_car))
    }

    async fn orders(&self, filter: &OrderFilter) -> CoreResult<Vec<OrderSummary>> {
        if let Some(client) = &filter.client {
            if !is_guid(client.as_str()) {
                return Ok(Vec::new());
            }
        }
        let rows: Vec<OrderRecord> = self
            .client
            .fetch(&orders_query(filter))
            .await
            .map_err(|e| e.into_catalog_error())?;

        debug!(rows = rows.len(), "stored orders");
        Ok(rows.into_iter().map(OrderRecord::into_summary).collect())
    }

    async fn order(&self, order: &OrderRef) -> CoreResult<Option<OrderDetails>> {
        if !is_guid(order.as_str()) {
            return Ok(None);
        }
        let header: Option<OrderRecord> = self
            .client
            .fetch_one(
                &ODataQuery::new(ORDER_COLLECTION)
                    .key(order.as_str())
                    .expand(ORDER_CLIENT),
            )
            .await
            .map_err(|e| e.into_catalog_error())?;
        let Some(header) = header else {
            return Ok(None);
        };

        let works = self
            .order_rows(order.as_str(), "Автоработы")
            .await
            .map_err(|e| e.into_catalog_error())?;
        let parts = self
            .order_rows(order.as_str(), "Товары")
            .await
            .map_err(|e| e.into_catalog_error())?;
        let cars = self.order_cars(order.as_str()).await?;

        let mileage = header.mileage.clone().unwrap_or_default();
        Ok(Some(OrderDetails {
            summary: header.into_summary(),
            mileage,
            works: works.into_iter().map(OrderLineRecord::into_row).collect(),
            parts: parts.into_iter().map(OrderLineRecord::into_row).collect(),
            cars,
        }))
    }

    async fn count(&self, kind: CatalogKind) -> CoreResult<u64> {
        match self.client.count(&ODataQuery::new(collection(kind))).await {
            Ok(count) => Ok(count),
            Err(err) => {
                warn!(%kind, error = %err, "$count failed, counting rows");
                self.count_rows(kind)
                    .await
                    .map_err(|e| e.into_catalog_error())
            }
        }
    }

    async fn create_client(&self, client: &NewClient) -> CoreResult<CreatedRecord> {
        let created: CreatedCatalogRecord = self
            .client
            .create(collection(CatalogKind::Clients), &ClientDocument::from(client))
            .await
            .map_err(|e| e.into_submission_error())?;

        info!(code = ?created.code, "Client created");
        Ok(created.into())
    }

    async fn create_car(&self, car: &NewCar) -> CoreResult<CreatedRecord> {
        let created: CreatedCatalogRecord = self
            .client
            .create(collection(CatalogKind::Cars), &CarDocument::from(car))
            .await
            .map_err(|e| e.into_submission_error())?;

        info!(code = ?created.code, "Car created");
        Ok(created.into())
    }

    async fn update_order(&self, order: &OrderRef, update: &OrderUpdate) -> CoreResult<()> {
        if !is_guid(order.as_str()) {
            return Err(ValidationError::InvalidFormat {
                field: "order".to_string(),
                reason: "must be a GUID".to_string(),
            }
            .into());
        }
        self.client
            .update(
                &ODataQuery::new(ORDER_COLLECTION).key(order.as_str()),
                &OrderPatch::from(update),
            )
            .await
            .map_err(|e| e.into_submission_error())?;

        info!(%order, "Order updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ODataSettings;
    use chrono::NaiveDate;
    use serde_json::json;
    use sto_core::CoreError;
    use wiremock::matchers::{body_json, method, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CLIENT: &str = "9a1b2c3d-0000-11e5-9841-6cf049a63e1b";
    const ORDER: &str = "0d0e0f10-0000-11e5-9841-6cf049a63e1b";
    const CAR: &str = "c4c4c4c4-0000-11e5-9841-6cf049a63e1b";

    fn records_for(server: &MockServer) -> ODataRecords {
        let settings = ODataSettings {
            url: format!("{}/odata/standard.odata", server.uri()),
            ..ODataSettings::default()
        };
        ODataRecords::new(ODataClient::new(&settings).unwrap())
    }

    #[test]
    fn test_orders_query_filters() {
        let filter = OrderFilter {
            client: Some(CLIENT.into()),
            state: Some(DocumentState::Draft),
            from: NaiveDate::from_ymd_opt(2024, 5, 1),
            to: NaiveDate::from_ymd_opt(2024, 5, 31),
            limit: 20,
        };

        assert_eq!(
            orders_query(&filter).query_string(),
            format!(
                "$filter=Контрагент_Key eq guid'{}' and Posted eq false \
                 and Date ge datetime'2024-05-01T00:00:00' and Date le datetime'2024-05-31T23:59:59'\
                 &$top=20&$orderby=Date desc&$expand=Контрагент&$format=json",
                CLIENT
            )
        );
    }

    #[test]
    fn test_unfiltered_orders_query() {
        assert_eq!(
            orders_query(&OrderFilter::default()).query_string(),
            "$top=100&$orderby=Date desc&$expand=Контрагент&$format=json"
        );
    }

    #[tokio::test]
    async fn test_client_card() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(format!(r"\(guid'{}'\)$", CLIENT)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Ref_Key": CLIENT,
                "Code": "000000042",
                "Description": "Иванов И.И.",
                "НаименованиеПолное": "Иванов Иван Иванович",
                "ИНН": "771234567890",
                "КонтактнаяИнформация": [
                    { "Тип": "Телефон", "НомерТелефона": "+7 900 000-00-01" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = records_for(&server)
            .client(&CLIENT.into())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(client.full_name, "Иванов Иван Иванович");
        assert_eq!(client.code.as_deref(), Some("000000042"));
        assert_eq!(client.phone.as_deref(), Some("+7 900 000-00-01"));
    }

    #[tokio::test]
    async fn test_order_details_with_rows_and_cars() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(format!(r"\(guid'{}'\)$", ORDER)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Ref_Key": ORDER,
                "Number": "ЗН00000123  ",
                "Date": "2024-05-17T10:31:00",
                "Posted": false,
                "Контрагент_Key": CLIENT,
                "Контрагент": { "Description": "Иванов И.И." },
                "СуммаРаботДокумента": 1000,
                "СуммаНоменклатурыДокумента": 450,
                "Пробег": "85000"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"/%D0%90%D0%B2%D1%82%D0%BE%D1%80%D0%B0%D0%B1%D0%BE%D1%82%D1%8B$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{ "Авторабота_Key": "w1", "Количество": 1, "Цена": 1000, "Сумма": 1000 }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"/%D0%A2%D0%BE%D0%B2%D0%B0%D1%80%D1%8B$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{
                    "Номенклатура_Key": "p1", "Количество": 1, "Цена": 500,
                    "ПроцентСкидки": 10, "Сумма": 450
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"/%D0%90%D0%B2%D1%82%D0%BE%D0%BC%D0%BE%D0%B1%D0%B8%D0%BB%D0%B8$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    { "Автомобиль_Key": CAR },
                    { "Автомобиль_Key": "00000000-0000-0000-0000-000000000000" }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(format!(r"\(guid'{}'\)$", CAR)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Ref_Key": CAR,
                "Description": "Kia Rio",
                "VIN": "Z94CB41AAGR323020"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let order = records_for(&server)
            .order(&ORDER.into())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(order.summary.number, "ЗН00000123");
        assert_eq!(order.summary.total(), 1450.0);
        assert_eq!(order.summary.client_name.as_deref(), Some("Иванов И.И."));
        assert_eq!(order.mileage, "85000");
        assert_eq!(order.works[0].reference.as_str(), "w1");
        assert_eq!(order.parts[0].discount, 10.0);
        assert_eq!(order.parts[0].sum, 450.0);
        assert_eq!(order.cars.len(), 1);
        assert_eq!(order.cars[0].name, "Kia Rio");
    }

    #[tokio::test]
    async fn test_count_falls_back_to_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"/\$count$"))
            .respond_with(ResponseTemplate::new(400).set_body_string("not supported"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("$select", "Ref_Key"))
            .and(query_param("$top", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{ "Ref_Key": "a" }, { "Ref_Key": "b" }, { "Ref_Key": "c" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let count = records_for(&server).count(CatalogKind::Clients).await.unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_non_guid_refs_read_as_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
            .expect(0)
            .mount(&server)
            .await;
        let records = records_for(&server);

        assert!(records.client(&"c-1".into()).await.unwrap().is_none());
        assert!(records.order(&"ЗН1".into()).await.unwrap().is_none());
        assert!(records
            .orders(&OrderFilter::for_client("c-1".into(), 10))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_create_client_posts_names() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({
                "Description": "ООО Ромашка",
                "НаименованиеПолное": "ООО Ромашка",
                "ИНН": "7701234567"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "Code": "000000101",
                "Ref_Key": "new-client"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = records_for(&server)
            .create_client(&NewClient {
                name: "ООО Ромашка".into(),
                inn: Some("7701234567".into()),
                comment: None,
            })
            .await
            .unwrap();

        assert_eq!(created.code, "000000101");
        assert_eq!(created.reference.as_deref(), Some("new-client"));
    }

    #[tokio::test]
    async fn test_update_order_sends_only_given_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path_regex(format!(r"\(guid'{}'\)$", ORDER)))
            .and(body_json(json!({ "Состояние_Key": "st-2" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Ref_Key": ORDER })))
            .expect(1)
            .mount(&server)
            .await;

        records_for(&server)
            .update_order(
                &ORDER.into(),
                &OrderUpdate {
                    status: Some("st-2".into()),
                    comment: None,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_write_failure_is_submission_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "odata.error": { "message": { "value": "Не заполнено наименование" } }
            })))
            .mount(&server)
            .await;

        let err = records_for(&server)
            .create_car(&NewCar {
                name: "Kia Rio".into(),
                vin: None,
                plate: None,
                owner: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Submission(m) if m == "Не заполнено наименование"));
    }
}
