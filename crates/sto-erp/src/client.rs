//! # OData HTTP Client
//!
//! Thin reqwest wrapper for the 1C OData facade: basic auth, JSON in and out,
//! `odata.error` bodies turned into [`ErpError::OData`].
//!
//! ## Request Flow
//! ```text
//! ODataQuery ──► to_url ──► GET (basic auth, timeout) ──► status + body
//!                                                              │
//!                    ┌─────────────────────────────────────────┤
//!                    ▼                                         ▼
//!           body has "odata.error"?                      2xx JSON body
//!                    │                                         │
//!                    ▼                                         ▼
//!          ErpError::OData(message)                  {"value": [...]} → Vec<T>
//! ```
//!
//! No retries. A failed request is reported once and the caller decides.

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ODataSettings;
use crate::error::{ErpError, ErpResult};
use crate::models::{ODataErrorEnvelope, ODataList};
use crate::query::{collection_url, ODataQuery};

/// Characters of a failing body kept for logs and error messages.
const BODY_PREVIEW_CHARS: usize = 500;

/// HTTP client for one OData endpoint.
#[derive(Clone)]
pub struct ODataClient {
    http: reqwest::Client,
    base: Url,
    user: String,
    password: String,
    timeout_secs: u64,
}

impl ODataClient {
    /// Creates a client from validated settings.
    pub fn new(settings: &ODataSettings) -> ErpResult<Self> {
        let base = Url::parse(&settings.url)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ErpError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(ODataClient {
            http,
            base,
            user: settings.user.clone(),
            password: settings.password.clone(),
            timeout_secs: settings.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Reads the rows of a collection query.
    pub async fn fetch<T: DeserializeOwned>(&self, query: &ODataQuery) -> ErpResult<Vec<T>> {
        let url = query.to_url(&self.base)?;
        info!(collection = query.collection(), query = %query.query_string(), "OData GET");

        let started = Instant::now();
        let response = self.get(url).await?;

        let list: ODataList<T> = self.read(query.collection(), response, started).await?;
        Ok(list.value)
    }

    /// Reads one keyed record. A 404 means the record does not exist.
    pub async fn fetch_one<T: DeserializeOwned>(&self, query: &ODataQuery) -> ErpResult<Option<T>> {
        let url = query.to_url(&self.base)?;
        info!(collection = query.collection(), path = ?query.path(), "OData GET record");

        let started = Instant::now();
        let response = self.get(url).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(collection = query.collection(), "record not found");
            return Ok(None);
        }

        self.read(query.collection(), response, started).await.map(Some)
    }

    /// Number of records behind `query`, via the `/$count` path.
    pub async fn count(&self, query: &ODataQuery) -> ErpResult<u64> {
        let mut url = query.clone().navigate("$count").to_url(&self.base)?;
        url.set_query(None);
        info!(collection = query.collection(), "OData GET $count");

        let started = Instant::now();
        let response = self.get(url).await?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.send_error(e))?;
        debug!(
            collection = query.collection(),
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "OData response"
        );

        parse_count(status, &body).map_err(|err| {
            warn!(collection = query.collection(), status, body = %preview(&body), error = %err, "OData count failed");
            err
        })
    }

    /// Changes the given fields of one keyed record.
    pub async fn update<B: Serialize + ?Sized>(&self, query: &ODataQuery, body: &B) -> ErpResult<()> {
        let url = query.to_url(&self.base)?;
        let payload =
            serde_json::to_vec(body).map_err(|e| ErpError::SerializationFailed(e.to_string()))?;
        info!(collection = query.collection(), bytes = payload.len(), "OData PATCH");

        let started = Instant::now();
        let response = self
            .http
            .patch(url)
            .basic_auth(&self.user, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(payload)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.send_error(e))?;
        debug!(
            collection = query.collection(),
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "OData response"
        );

        // 1C answers a PATCH with either the updated record or an empty 204
        if (200..300).contains(&status) && body.trim().is_empty() {
            return Ok(());
        }
        parse_body::<serde::de::IgnoredAny>(status, &body)
            .map(|_| ())
            .map_err(|err| {
                warn!(collection = query.collection(), status, body = %preview(&body), error = %err, "OData update failed");
                err
            })
    }

    /// Creates an entity in `collection` and returns the ERP's echo of it.
    pub async fn create<B, R>(&self, collection: &str, body: &B) -> ErpResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut url = collection_url(&self.base, collection)?;
        url.set_query(Some("$format=json"));
        let payload =
            serde_json::to_vec(body).map_err(|e| ErpError::SerializationFailed(e.to_string()))?;
        info!(collection, bytes = payload.len(), "OData POST");

        let started = Instant::now();
        let response = self
            .http
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(payload)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        self.read(collection, response, started).await
    }

    async fn read<R: DeserializeOwned>(
        &self,
        collection: &str,
        response: reqwest::Response,
        started: Instant,
    ) -> ErpResult<R> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.send_error(e))?;
        let elapsed = started.elapsed();

        debug!(collection, status, elapsed_ms = elapsed.as_millis() as u64, "OData response");

        parse_body(status, &body).map_err(|err| {
            warn!(collection, status, body = %preview(&body), error = %err, "OData request failed");
            err
        })
    }

    async fn get(&self, url: Url) -> ErpResult<reqwest::Response> {
        self.http
            .get(url)
            .basic_auth(&self.user, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.send_error(e))
    }

    fn send_error(&self, err: reqwest::Error) -> ErpError {
        if err.is_timeout() {
            ErpError::Timeout(self.timeout_secs)
        } else {
            ErpError::from(err)
        }
    }
}

/// Interprets a response body.
///
/// An `odata.error` envelope wins over the status code: 1C sometimes reports
/// errors with 200 and sometimes with 4xx/5xx.
pub(crate) fn parse_body<R: DeserializeOwned>(status: u16, body: &str) -> ErpResult<R> {
    if let Ok(envelope) = serde_json::from_str::<ODataErrorEnvelope>(body) {
        let message = envelope.error.message.value.trim();
        return Err(ErpError::OData(if message.is_empty() {
            "OData error".to_string()
        } else {
            message.to_string()
        }));
    }

    if !(200..300).contains(&status) {
        return Err(ErpError::HttpStatus {
            status,
            body: preview(body),
        });
    }

    serde_json::from_str(body)
        .map_err(|e| ErpError::Decode(format!("{} (body: {})", e, preview(body))))
}

/// A `$count` body: a bare number, sometimes behind a byte order mark.
pub(crate) fn parse_count(status: u16, body: &str) -> ErpResult<u64> {
    let text = body.trim_start_matches('\u{feff}').trim();
    match text.parse::<u64>() {
        Ok(count) if (200..300).contains(&status) => Ok(count),
        _ => parse_body::<u64>(status, text),
    }
}

fn preview(body: &str) -> String {
    let mut out: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
    if out.len() < body.len() {
        out.push_str("...");
    }
    out
}
