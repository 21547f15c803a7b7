//! # Catalog Lookup over OData
//!
//! [`ODataCatalog`] answers catalog searches, name lookups and "cars of this
//! client" from the 1C catalogs.
//!
//! ## Catalog Mapping
//! ```text
//! ┌──────────────┬─────────────────────────┬──────────┬──────────────────────────┐
//! │ CatalogKind  │ Collection              │ Folders  │ Text search fields       │
//! ├──────────────┼─────────────────────────┼──────────┼──────────────────────────┤
//! │ works        │ Catalog_Автоработы      │ excluded │ Description              │
//! │ parts        │ Catalog_Номенклатура    │ excluded │ Description, Артикул     │
//! │ cars         │ Catalog_Автомобили      │ excluded │ VIN (upper), Description │
//! │ clients      │ Catalog_Контрагенты     │          │ Description, Code        │
//! │ workshops    │ Catalog_Цеха            │          │ Description              │
//! │ repair-types │ Catalog_ВидыРемонта     │          │ Description              │
//! │ employees    │ Catalog_Сотрудники      │ excluded │ Description              │
//! │ order-       │ Catalog_ВидыСостояний-  │          │ Description              │
//! │   statuses   │   ЗаказНарядов          │          │                          │
//! │ organizations│ Catalog_Организации     │          │ Description              │
//! └──────────────┴─────────────────────────┴──────────┴──────────────────────────┘
//! ```

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use sto_core::validation::is_empty_ref;
use sto_core::{Car, CatalogEntry, CatalogKind, CatalogLookup, CatalogRef, ClientRef, CoreResult};

use crate::client::ODataClient;
use crate::config::{ODataSettings, MAX_SEARCH_LIMIT};
use crate::models::CatalogRecord;
use crate::query::{eq_guid, substringof, ODataQuery};

/// 1C collection backing `kind`.
pub fn collection(kind: CatalogKind) -> &'static str {
    match kind {
        CatalogKind::Works => "Catalog_Автоработы",
        CatalogKind::Parts => "Catalog_Номенклатура",
        CatalogKind::Cars => "Catalog_Автомобили",
        CatalogKind::Clients => "Catalog_Контрагенты",
        CatalogKind::Workshops => "Catalog_Цеха",
        CatalogKind::RepairTypes => "Catalog_ВидыРемонта",
        CatalogKind::Employees => "Catalog_Сотрудники",
        CatalogKind::OrderStatuses => "Catalog_ВидыСостоянийЗаказНарядов",
        CatalogKind::Organizations => "Catalog_Организации",
    }
}

fn excludes_folders(kind: CatalogKind) -> bool {
    matches!(
        kind,
        CatalogKind::Works | CatalogKind::Parts | CatalogKind::Cars | CatalogKind::Employees
    )
}

fn text_filters(kind: CatalogKind, text: &str) -> Vec<String> {
    match kind {
        CatalogKind::Parts => vec![
            substringof(text, "Description"),
            substringof(text, "Артикул"),
        ],
        CatalogKind::Clients => vec![
            substringof(text, "Description"),
            substringof(text, "Code"),
        ],
        CatalogKind::Cars => vec![
            substringof(&text.to_uppercase(), "VIN"),
            substringof(text, "Description"),
        ],
        _ => vec![substringof(text, "Description")],
    }
}

/// The search request for `kind`.
///
/// Terms shorter than `min_len` characters list the catalog unfiltered.
pub fn search_query(kind: CatalogKind, query: &str, limit: usize, min_len: usize) -> ODataQuery {
    let text = query.trim();
    let mut request = ODataQuery::new(collection(kind));

    if excludes_folders(kind) {
        request = request.filter("IsFolder eq false");
    }
    if !text.is_empty() && text.chars().count() >= min_len {
        request = request.filter_any(text_filters(kind, text));
    }

    request
        .order_by("Description")
        .top(limit.clamp(1, MAX_SEARCH_LIMIT))
}

/// The single-row lookup used to resolve a display name.
pub fn name_query(kind: CatalogKind, reference: &str) -> ODataQuery {
    ODataQuery::new(collection(kind))
        .filter(eq_guid("Ref_Key", reference))
        .select("Ref_Key,Description")
        .top(1)
}

/// Cars whose owner is `client`.
pub fn client_cars_query(client: &str) -> ODataQuery {
    ODataQuery::new(collection(CatalogKind::Cars))
        .filter(eq_guid("Поставщик_Key", client))
        .order_by("Description")
}

/// [`CatalogLookup`] backed by the 1C OData catalogs.
#[derive(Clone)]
pub struct ODataCatalog {
    client: ODataClient,
    min_search_len: usize,
}

impl ODataCatalog {
    pub fn new(client: ODataClient, settings: &ODataSettings) -> Self {
        ODataCatalog {
            client,
            min_search_len: settings.min_search_len,
        }
    }
}

#[async_trait]
impl CatalogLookup for ODataCatalog {
    async fn search(
        &self,
        kind: CatalogKind,
        query: &str,
        limit: usize,
    ) -> CoreResult<Vec<CatalogEntry>> {
        let request = search_query(kind, query, limit, self.min_search_len);
        let rows: Vec<CatalogRecord> = self
            .client
            .fetch(&request)
            .await
            .map_err(|e| e.into_catalog_error())?;

        debug!(%kind, rows = rows.len(), "catalog search");
        Ok(rows.into_iter().map(CatalogRecord::into_entry).collect())
    }

    async fn resolve_name(
        &self,
        kind: CatalogKind,
        reference: &CatalogRef,
    ) -> CoreResult<Option<String>> {
        // Only GUIDs can be addressed in an OData filter
        if Uuid::parse_str(reference.as_str()).is_err() {
            debug!(%kind, %reference, "not a GUID, nothing to resolve");
            return Ok(None);
        }

        let rows: Vec<CatalogRecord> = self
            .client
            .fetch(&name_query(kind, reference.as_str()))
            .await
            .map_err(|e| e.into_catalog_error())?;

        Ok(rows.into_iter().next().map(|row| row.name()))
    }

    async fn client_cars(&self, client: &ClientRef) -> CoreResult<Vec<Car>> {
        if is_empty_ref(client.as_str()) || Uuid::parse_str(client.as_str()).is_err() {
            return Ok(Vec::new());
        }

        let rows: Vec<CatalogRecord> = self
            .client
            .fetch(&client_cars_query(client.as_str()))
            .await
            .map_err(|e| e.into_catalog_error())?;

        debug!(%client, cars = rows.len(), "client cars");
        Ok(rows.into_iter().map(CatalogRecord::into_car).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sto_core::CoreError;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CLIENT: &str = "9a1b2c3d-0000-11e5-9841-6cf049a63e1b";

    async fn catalog_for(server: &MockServer) -> ODataCatalog {
        let settings = ODataSettings {
            url: format!("{}/odata/standard.odata", server.uri()),
            ..ODataSettings::default()
        };
        ODataCatalog::new(ODataClient::new(&settings).unwrap(), &settings)
    }

    #[test]
    fn test_every_kind_has_a_collection() {
        for kind in CatalogKind::ALL {
            assert!(collection(kind).starts_with("Catalog_"));
        }
    }

    #[test]
    fn test_short_query_lists_without_text_filter() {
        let query = search_query(CatalogKind::Works, "м", 100, 2);
        assert_eq!(
            query.query_string(),
            "$filter=IsFolder eq false&$top=100&$orderby=Description&$format=json"
        );
    }

    #[test]
    fn test_parts_search_includes_article() {
        let query = search_query(CatalogKind::Parts, " фильтр ", 20, 2);
        assert_eq!(
            query.params()[0].1,
            "IsFolder eq false and (substringof('фильтр', Description) \
             or substringof('фильтр', Артикул))"
        );
    }

    #[test]
    fn test_car_search_uppercases_vin() {
        let query = search_query(CatalogKind::Cars, "xw8zz", 10, 2);
        assert!(query.params()[0].1.contains("substringof('XW8ZZ', VIN)"));
        assert!(query.params()[0].1.contains("substringof('xw8zz', Description)"));
    }

    #[test]
    fn test_client_search_has_no_folder_filter() {
        let query = search_query(CatalogKind::Clients, "Иванов", 10, 2);
        assert_eq!(
            query.params()[0].1,
            "(substringof('Иванов', Description) or substringof('Иванов', Code))"
        );
    }

    #[test]
    fn test_search_escapes_quotes_and_clamps_limit() {
        let query = search_query(CatalogKind::Workshops, "д'Артаньян", 10_000, 2);
        assert!(query.query_string().contains("substringof('д''Артаньян', Description)"));
        assert!(query.query_string().contains("$top=500"));
    }

    #[test]
    fn test_client_cars_query() {
        assert_eq!(
            client_cars_query(CLIENT).params()[0].1,
            format!("Поставщик_Key eq guid'{}'", CLIENT)
        );
    }

    #[tokio::test]
    async fn test_client_cars_maps_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{
                    "Ref_Key": "c4r-1",
                    "Description": "Kia Rio",
                    "VIN": "Z94CB41AAGR323020",
                    "Поставщик_Key": CLIENT
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cars = catalog_for(&server)
            .await
            .client_cars(&ClientRef::new(CLIENT))
            .await
            .unwrap();

        assert_eq!(cars.len(), 1);
        assert_eq!(cars[0].vin.as_deref(), Some("Z94CB41AAGR323020"));
        assert_eq!(cars[0].owner.as_ref().map(ClientRef::as_str), Some(CLIENT));
    }

    #[tokio::test]
    async fn test_non_guid_refs_skip_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
            .expect(0)
            .mount(&server)
            .await;
        let catalog = catalog_for(&server).await;

        assert!(catalog
            .resolve_name(CatalogKind::Works, &CatalogRef::new("w1"))
            .await
            .unwrap()
            .is_none());
        assert!(catalog
            .client_cars(&ClientRef::new(sto_core::EMPTY_REF))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_becomes_catalog_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = catalog_for(&server)
            .await
            .search(CatalogKind::Parts, "фильтр", 10)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Catalog(m) if m == "HTTP 401: Unauthorized"));
    }
}
