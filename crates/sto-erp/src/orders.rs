//! # Order Submission over OData
//!
//! Turns an [`OrderPayload`] into a `Document_ЗаказНаряд` and posts it.
//!
//! ## Submission Flow
//! ```text
//! OrderPayload
//!     │
//!     ├──► GET Catalog_ДоговорыВзаиморасчетов (Owner_Key = client, $top=1)
//!     │        └── found? attach ДоговорВзаиморасчетов_Key
//!     │
//!     ├──► GET Catalog_Номенклатура(guid'…') once per distinct part
//!     │        └── unit + VAT rate of the part, config defaults otherwise
//!     │
//!     ├──► build_document (pure): header defaults + operator picks + rows
//!     │
//!     └──► POST Document_ЗаказНаряд ──► {"Number": "ЗН00000123  ", ...}
//!                                            │
//!                                            ▼
//!                                SubmissionReceipt { number: "ЗН00000123" }
//! ```
//!
//! Row sums are copied from the payload untouched: whatever the operator saw
//! on screen is what the ERP records.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use sto_core::{CoreResult, OrderPayload, OrderSubmission, SubmissionReceipt, EMPTY_REF};

use crate::client::ODataClient;
use crate::config::DocumentDefaults;
use crate::error::ErpResult;
use crate::models::{
    CarRow, CatalogRecord, CreatedDocument, NomenclatureKeys, NomenclatureRecord, PartRow,
    RepairOrderDocument, WorkRow,
};
use crate::query::{eq_guid, ODataQuery};

pub const ORDER_COLLECTION: &str = "Document_ЗаказНаряд";
pub const CONTRACT_COLLECTION: &str = "Catalog_ДоговорыВзаиморасчетов";
pub const NOMENCLATURE_COLLECTION: &str = "Catalog_Номенклатура";

/// Unit and VAT rate of one part by key.
pub type PartKeys = HashMap<String, NomenclatureKeys>;

/// The accounting keys of one nomenclature record.
pub fn nomenclature_query(part: &str) -> ODataQuery {
    ODataQuery::new(NOMENCLATURE_COLLECTION)
        .key(part)
        .select("ОсновнаяЕдиницаИзмерения_Key,СтавкаНДС_Key")
}

/// The first settlement contract owned by `client`.
pub fn contract_query(client: &str) -> ODataQuery {
    ODataQuery::new(CONTRACT_COLLECTION)
        .filter(eq_guid("Owner_Key", client))
        .select("Ref_Key")
        .top(1)
}

/// Builds the ERP document for `payload`.
///
/// Repair type, workshop and master fall back to `defaults` when the operator
/// left them unselected. Part rows take unit and VAT rate from `part_keys`,
/// or from `defaults` for parts not in it.
pub fn build_document(
    payload: &OrderPayload,
    defaults: &DocumentDefaults,
    contract: Option<String>,
    part_keys: &PartKeys,
    now: NaiveDateTime,
) -> RepairOrderDocument {
    let pick = |selected: &Option<sto_core::CatalogRef>, fallback: &str| {
        selected
            .as_ref()
            .map(|r| r.as_str().to_string())
            .unwrap_or_else(|| fallback.to_string())
    };

    let cars = payload
        .car_key
        .iter()
        .map(|car| CarRow {
            line_number: "1".to_string(),
            car: car.as_str().to_string(),
        })
        .collect();

    let works = payload
        .works
        .iter()
        .enumerate()
        .map(|(i, work)| WorkRow {
            line_number: (i + 1).to_string(),
            work: work.work_key.as_str().to_string(),
            qty: work.qty,
            norm_hour: defaults.norm_hour.clone(),
            coefficient: 1.0,
            price: work.price,
            sum: work.sum,
            vat_rate: defaults.vat_rate.clone(),
            vat_sum: 0.0,
            total: work.sum,
        })
        .collect();

    let parts = payload
        .parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let (unit, vat_rate) = match part_keys.get(part.part_key.as_str()) {
                Some(keys) => (keys.unit.clone(), keys.vat_rate.clone()),
                None => (defaults.unit.clone(), defaults.vat_rate.clone()),
            };
            PartRow {
                line_number: (i + 1).to_string(),
                part: part.part_key.as_str().to_string(),
                qty: part.qty,
                unit,
                coefficient: 1.0,
                price: part.price,
                sum: part.sum,
                vat_rate,
                vat_sum: 0.0,
                discount: part.discount,
                total: part.sum,
                warehouse: defaults.warehouse.clone(),
                characteristic: EMPTY_REF.to_string(),
            }
        })
        .collect();

    RepairOrderDocument {
        date: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
        posted: false,
        organization: defaults.organization.clone(),
        division: defaults.division.clone(),
        price_type: defaults.price_type.clone(),
        work_price_type: defaults.price_type.clone(),
        repair_type: pick(&payload.repair_type_key, &defaults.repair_type),
        status: defaults.status.clone(),
        workshop: pick(&payload.workshop_key, &defaults.workshop),
        master: pick(&payload.master_key, &defaults.master),
        manager: defaults.manager.clone(),
        author: defaults.author.clone(),
        currency: defaults.currency.clone(),
        operation: defaults.operation.clone(),
        warehouse: defaults.warehouse.clone(),
        repair_order: defaults.repair_order.clone(),
        rate: 1.0,
        settlement_rate: 1.0,
        regulated_accounting: true,
        close_own_orders_only: true,
        advance_offset: "Автоматически".to_string(),
        client: payload.client_key.as_str().to_string(),
        contract,
        comment: payload.comment.clone(),
        mileage: payload.mileage.clone(),
        cars,
        works,
        parts,
    }
}

/// [`OrderSubmission`] that creates `Document_ЗаказНаряд` records.
#[derive(Clone)]
pub struct ODataOrderSubmission {
    client: ODataClient,
    defaults: DocumentDefaults,
}

impl ODataOrderSubmission {
    pub fn new(client: ODataClient, defaults: DocumentDefaults) -> Self {
        ODataOrderSubmission { client, defaults }
    }

    async fn find_contract(&self, client: &str) -> ErpResult<Option<String>> {
        if Uuid::parse_str(client).is_err() {
            return Ok(None);
        }
        let rows: Vec<CatalogRecord> = self.client.fetch(&contract_query(client)).await?;
        Ok(rows.into_iter().next().map(|row| row.ref_key))
    }

    /// Unit and VAT rate of every distinct GUID part of `payload`.
    ///
    /// A part whose lookup fails is left out and gets the config defaults.
    async fn part_keys(&self, payload: &OrderPayload) -> PartKeys {
        let fallback = NomenclatureKeys {
            unit: self.defaults.unit.clone(),
            vat_rate: self.defaults.vat_rate.clone(),
        };
        let mut keys = PartKeys::new();

        for part in &payload.parts {
            let part = part.part_key.as_str();
            if keys.contains_key(part) || Uuid::parse_str(part).is_err() {
                continue;
            }
            match self.client.fetch_one::<NomenclatureRecord>(&nomenclature_query(part)).await {
                Ok(Some(record)) => {
                    keys.insert(part.to_string(), record.keys_or(&fallback));
                }
                Ok(None) => debug!(part, "Part not in nomenclature, using defaults"),
                Err(err) => warn!(part, error = %err, "Part keys lookup failed, using defaults"),
            }
        }

        keys
    }
}

#[async_trait]
impl OrderSubmission for ODataOrderSubmission {
    async fn submit(&self, payload: &OrderPayload) -> CoreResult<SubmissionReceipt> {
        // A missing contract is not fatal; 1C may still accept the order.
        let contract = match self.find_contract(payload.client_key.as_str()).await {
            Ok(contract) => contract,
            Err(err) => {
                warn!(client = %payload.client_key, error = %err, "Contract lookup failed");
                None
            }
        };

        let part_keys = self.part_keys(payload).await;

        let document = build_document(
            payload,
            &self.defaults,
            contract,
            &part_keys,
            Local::now().naive_local(),
        );
        let created: CreatedDocument = self
            .client
            .create(ORDER_COLLECTION, &document)
            .await
            .map_err(|e| e.into_submission_error())?;

        let receipt = SubmissionReceipt::new(&created.number, created.ref_key);
        info!(number = %receipt.number, client = %payload.client_key, "Repair order created");
        Ok(receipt)
    }
}
