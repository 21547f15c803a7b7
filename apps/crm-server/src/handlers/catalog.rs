//! Catalog search and client cars, passed through to the ERP.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use sto_core::validation::{validate_ref, validate_search_query};
use sto_core::{Car, CatalogEntry, CatalogKind, ClientRef};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// `GET /api/catalogs/{kind}?q=&limit=`
pub async fn search(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<CatalogEntry>>, ApiError> {
    let kind: CatalogKind = kind.parse()?;
    let query = validate_search_query(params.q.as_deref().unwrap_or_default())?;
    let limit = params.limit.unwrap_or(state.search_limit).max(1);

    let entries = state.catalog.search(kind, &query, limit).await?;
    debug!(%kind, query = %query, found = entries.len(), "Catalog search");
    Ok(Json(entries))
}

/// `GET /api/clients/{client}/cars`
pub async fn client_cars(
    State(state): State<AppState>,
    Path(client): Path<String>,
) -> Result<Json<Vec<Car>>, ApiError> {
    let client = ClientRef::new(validate_ref("client", &client)?);
    let cars = state.catalog.client_cars(&client).await?;
    Ok(Json(cars))
}
