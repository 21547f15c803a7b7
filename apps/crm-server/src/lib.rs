//! # STO CRM Server
//!
//! JSON API behind the order form of the browser front end.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         CRM Server                                      │
//! │                                                                         │
//! │  Browser ──► axum Router ──► handlers ──► SessionStore ──► DraftOrder   │
//! │                                  │                                      │
//! │                                  ├──► CatalogLookup   ──► 1C OData      │
//! │                                  ├──► OrderSubmission ──► 1C OData      │
//! │                                  └──► RecordStore     ──► 1C OData      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Routes
//! | Method & path                                      | Handler                 |
//! |----------------------------------------------------|-------------------------|
//! | `POST   /api/sessions`                             | [`session::open_session`] |
//! | `DELETE /api/sessions/{id}`                        | [`session::close_session`] |
//! | `GET    /api/sessions/{id}/draft`                  | [`draft::get_draft`]    |
//! | `POST   /api/sessions/{id}/draft`                  | [`draft::begin_draft`]  |
//! | `PUT    /api/sessions/{id}/draft/header`           | [`draft::set_header`]   |
//! | `POST   /api/sessions/{id}/draft/works`            | [`draft::add_work`]     |
//! | `POST   /api/sessions/{id}/draft/parts`            | [`draft::add_part`]     |
//! | `PATCH  /api/sessions/{id}/draft/{kind}/{index}`   | [`draft::edit_line`]    |
//! | `DELETE /api/sessions/{id}/draft/{kind}/{index}`   | [`draft::remove_line`]  |
//! | `DELETE /api/sessions/{id}/draft/lines`            | [`draft::clear_lines`]  |
//! | `POST   /api/sessions/{id}/draft/submit`           | [`draft::submit_draft`] |
//! | `GET    /api/catalogs/{kind}?q=&limit=`            | [`catalog::search`]     |
//! | `GET    /api/clients/{client}/cars`                | [`catalog::client_cars`] |
//! | `GET    /api/clients/{client}`                     | [`records::get_client`] |
//! | `GET    /api/clients/{client}/orders?limit=`       | [`records::client_orders`] |
//! | `POST   /api/clients`                              | [`records::create_client`] |
//! | `GET    /api/cars/{car}`                           | [`records::get_car`]    |
//! | `POST   /api/cars`                                 | [`records::create_car`] |
//! | `GET    /api/orders?status=&period=&from=&to=&limit=` | [`records::list_orders`] |
//! | `GET    /api/orders/{order}`                       | [`records::get_order`]  |
//! | `PATCH  /api/orders/{order}`                       | [`records::update_order`] |
//! | `GET    /api/stats/dashboard`                      | [`records::dashboard`]  |
//! | `GET    /health`                                   | [`handlers::health`]    |
//!
//! ## Configuration
//! Environment variables:
//! - `STO_BIND_ADDR` - Interface to listen on (default: 0.0.0.0)
//! - `STO_PORT` - HTTP port (default: 8080)
//! - `STO_ERP_CONFIG` - Path of erp.toml
//! - `STO_SESSION_TTL_SECS` - Idle seconds before an order form is dropped (default: 14400)
//! - `STO_MAX_SESSIONS` - Open order forms kept at most (default: 1000)
//! - `STO_ODATA_URL`, `STO_ODATA_USER`, `STO_ODATA_PASS`, `STO_ODATA_TIMEOUT` -
//!   ERP overrides, see [`sto_erp::ErpConfig`]
//! - `RUST_LOG` - Log filter (default: `info,sto=debug,tower_http=info`)

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::handlers::{catalog, draft, records, session};

// Re-exports
pub use config::ServerConfig;
pub use error::{ApiError, ErrorCode};
pub use state::{AppState, SessionStore};

/// Builds the router over `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/sessions", post(session::open_session))
        .route("/api/sessions/{id}", axum::routing::delete(session::close_session))
        .route(
            "/api/sessions/{id}/draft",
            get(draft::get_draft).post(draft::begin_draft),
        )
        .route("/api/sessions/{id}/draft/header", put(draft::set_header))
        .route("/api/sessions/{id}/draft/works", post(draft::add_work))
        .route("/api/sessions/{id}/draft/parts", post(draft::add_part))
        .route(
            "/api/sessions/{id}/draft/lines",
            axum::routing::delete(draft::clear_lines),
        )
        .route("/api/sessions/{id}/draft/submit", post(draft::submit_draft))
        .route(
            "/api/sessions/{id}/draft/{kind}/{index}",
            axum::routing::patch(draft::edit_line).delete(draft::remove_line),
        )
        .route("/api/catalogs/{kind}", get(catalog::search))
        .route("/api/clients", post(records::create_client))
        .route("/api/clients/{client}", get(records::get_client))
        .route("/api/clients/{client}/cars", get(catalog::client_cars))
        .route("/api/clients/{client}/orders", get(records::client_orders))
        .route("/api/cars", post(records::create_car))
        .route("/api/cars/{car}", get(records::get_car))
        .route("/api/orders", get(records::list_orders))
        .route(
            "/api/orders/{order}",
            get(records::get_order).patch(records::update_order),
        )
        .route("/api/stats/dashboard", get(records::dashboard))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=sto_erp=trace` - Show trace for the ERP adapter only
/// - Default: INFO, DEBUG for the sto crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sto=debug,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
