//! # sto-erp: 1C OData Adapter for STO CRM
//!
//! Implements the [`sto_core`] ports against the OData facade of a
//! 1C:Enterprise auto-service configuration.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          sto-erp Adapter                                │
//! │                                                                         │
//! │   ErpConfig (erp.toml + STO_ODATA_* env)                                │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   ODataClient ── basic auth, timeout, odata.error decoding              │
//! │        │                                                                │
//! │        ├──────────────────────┬──────────────────────┐              │
//! │        ▼                      ▼                      ▼              │
//! │   ODataCatalog           ODataOrderSubmission   ODataRecords        │
//! │   impl CatalogLookup     impl OrderSubmission   impl RecordStore    │
//! │   Catalog_* searches     order creation         cards, history      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`catalog`] - Catalog searches, name resolution, client cars
//! - [`client`] - HTTP client for the OData endpoint
//! - [`config`] - Connection settings and document defaults
//! - [`error`] - ERP error types
//! - [`models`] - Wire shapes of OData rows and documents
//! - [`orders`] - Repair order document building and submission
//! - [`query`] - `$filter`/`$top`/`$orderby` request builder
//! - [`records`] - Client cards, stored orders, counts and catalog writes

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod orders;
pub mod query;
pub mod records;

pub use catalog::ODataCatalog;
pub use client::ODataClient;
pub use config::{DocumentDefaults, ErpConfig, ODataSettings};
pub use error::{ErpError, ErpResult};
pub use orders::{build_document, ODataOrderSubmission, PartKeys};
pub use query::ODataQuery;
pub use records::ODataRecords;

use tracing::info;

/// The port implementations, sharing one HTTP client.
pub struct ErpPorts {
    pub catalog: ODataCatalog,
    pub submission: ODataOrderSubmission,
    pub records: ODataRecords,
}

/// Builds every port implementation over one shared HTTP client.
pub fn connect(config: &ErpConfig) -> ErpResult<ErpPorts> {
    config.validate()?;
    let client = ODataClient::new(&config.odata)?;
    info!(url = %client.base_url(), user = %config.odata.user, "ERP adapter ready");

    Ok(ErpPorts {
        catalog: ODataCatalog::new(client.clone(), &config.odata),
        submission: ODataOrderSubmission::new(client.clone(), config.defaults.clone()),
        records: ODataRecords::new(client),
    })
}
