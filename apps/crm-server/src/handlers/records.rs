//! # Record Pages
//!
//! Client cards, cars, stored orders and the dashboard. Everything here goes
//! straight to the ERP; nothing touches the session drafts.
//!
//! Unknown references answer `404 NOT_FOUND`. Dates in query strings are
//! `YYYY-MM-DD`; the period shortcuts count back from the server's local day.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::info;

use sto_core::ports::{client_overview, dashboard as dashboard_stats};
use sto_core::records::DEFAULT_ORDER_LIMIT;
use sto_core::validation::validate_ref;
use sto_core::{
    Car, CarRef, ClientOverview, ClientRef, CreatedRecord, DashboardStats, DocumentState, NewCar,
    NewClient, OrderDetails, OrderFilter, OrderRef, OrderSummary, OrderUpdate, Period,
    ValidationError,
};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    #[serde(default)]
    pub limit: Option<usize>,
}

fn parse_day(field: &str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "expected YYYY-MM-DD".to_string(),
    })
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl OrderListParams {
    /// The filter these parameters describe, with periods counted from `today`.
    pub fn into_filter(self, today: NaiveDate) -> Result<OrderFilter, ValidationError> {
        let mut filter = OrderFilter {
            state: non_blank(&self.status)
                .map(str::parse::<DocumentState>)
                .transpose()?,
            from: non_blank(&self.from).map(|v| parse_day("from", v)).transpose()?,
            to: non_blank(&self.to).map(|v| parse_day("to", v)).transpose()?,
            limit: self.limit.unwrap_or(DEFAULT_ORDER_LIMIT),
            ..OrderFilter::default()
        };
        if let Some(period) = non_blank(&self.period) {
            filter = filter.with_period(period.parse::<Period>()?, today);
        }
        Ok(filter)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// =============================================================================
// Clients
// =============================================================================

/// `GET /api/clients/{client}`
///
/// Card, cars and the latest orders of one client.
pub async fn get_client(
    State(state): State<AppState>,
    Path(client): Path<String>,
) -> Result<Json<ClientOverview>, ApiError> {
    let client = ClientRef::new(validate_ref("client", &client)?);
    let overview = client_overview(state.records.as_ref(), state.catalog.as_ref(), &client)
        .await?
        .ok_or_else(|| ApiError::not_found("Client", client.as_str()))?;
    Ok(Json(overview))
}

/// `GET /api/clients/{client}/orders?limit=`
pub async fn client_orders(
    State(state): State<AppState>,
    Path(client): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    let client = ClientRef::new(validate_ref("client", &client)?);
    let filter = OrderFilter::for_client(client, params.limit.unwrap_or(DEFAULT_ORDER_LIMIT));
    Ok(Json(state.records.orders(&filter).await?))
}

/// `POST /api/clients`
pub async fn create_client(
    State(state): State<AppState>,
    Json(body): Json<NewClient>,
) -> Result<(StatusCode, Json<CreatedRecord>), ApiError> {
    let client = body.validated()?;
    let created = state.records.create_client(&client).await?;
    info!(code = %created.code, "Client created");
    Ok((StatusCode::CREATED, Json(created)))
}

// =============================================================================
// Cars
// =============================================================================

/// `GET /api/cars/{car}`
pub async fn get_car(
    State(state): State<AppState>,
    Path(car): Path<String>,
) -> Result<Json<Car>, ApiError> {
    let car = CarRef::new(validate_ref("car", &car)?);
    let found = state
        .records
        .car(&car)
        .await?
        .ok_or_else(|| ApiError::not_found("Car", car.as_str()))?;
    Ok(Json(found))
}

/// `POST /api/cars`
pub async fn create_car(
    State(state): State<AppState>,
    Json(body): Json<NewCar>,
) -> Result<(StatusCode, Json<CreatedRecord>), ApiError> {
    let car = body.validated()?;
    let created = state.records.create_car(&car).await?;
    info!(code = %created.code, "Car created");
    Ok((StatusCode::CREATED, Json(created)))
}

// =============================================================================
// Orders
// =============================================================================

/// `GET /api/orders?status=&period=&from=&to=&limit=`
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<OrderListParams>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    let filter = params.into_filter(today())?;
    Ok(Json(state.records.orders(&filter).await?))
}

/// `GET /api/orders/{order}`
pub async fn get_order(
    State(state): State<AppState>,
    Path(order): Path<String>,
) -> Result<Json<OrderDetails>, ApiError> {
    let order = OrderRef::new(validate_ref("order", &order)?);
    let details = state
        .records
        .order(&order)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", order.as_str()))?;
    Ok(Json(details))
}

/// `PATCH /api/orders/{order}`
///
/// Changes status and/or comment; answers with the order as stored afterwards.
pub async fn update_order(
    State(state): State<AppState>,
    Path(order): Path<String>,
    Json(body): Json<OrderUpdate>,
) -> Result<Json<OrderDetails>, ApiError> {
    let order = OrderRef::new(validate_ref("order", &order)?);
    let update = body.validated()?;

    state.records.update_order(&order, &update).await?;
    info!(%order, "Order updated");

    let details = state
        .records
        .order(&order)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", order.as_str()))?;
    Ok(Json(details))
}

// =============================================================================
// Dashboard
// =============================================================================

/// `GET /api/stats/dashboard`
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(dashboard_stats(state.records.as_ref(), today()).await?))
}
