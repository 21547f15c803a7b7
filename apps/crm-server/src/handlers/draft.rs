//! # Draft Commands
//!
//! ## Draft Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Draft Lifecycle                                      │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ Client   │────►│  Lines   │────►│ Submitted│       │
//! │  │  draft   │     │ chosen   │     │  edited  │     │ (number) │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                 │                │             │
//! │                  begin_draft        add_work          submit_draft     │
//! │                  set_header         add_part               │           │
//! │                                     edit_line              ▼           │
//! │                                     remove_line      back to empty     │
//! │                                     clear_lines                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every command holds the draft's lock from start to finish. Name resolution
//! for a new line happens before the lock is taken.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tracing::{debug, info};

use sto_core::ports::{resolve_entry, submit_draft as submit_to_erp};
use sto_core::validation::{is_empty_ref, validate_ref};
use sto_core::{
    CatalogKind, CatalogRef, ClientRef, HeaderDetails, LineEdit, LineField, LineKind,
    ValidationError,
};

use crate::error::ApiError;
use crate::handlers::DraftResponse;
use crate::state::AppState;

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct BeginDraftRequest {
    pub client: String,
}

#[derive(Debug, Deserialize)]
pub struct AddLineRequest {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A field edit exactly as typed. `value` may arrive as a JSON string or
/// number; anything unparsable becomes 0. The value is kept as raw JSON text
/// so that numbers outside the f64 range reach the coercion instead of
/// failing in the extractor.
#[derive(Debug, Deserialize)]
pub struct EditLineRequest {
    pub field: LineField,
    #[serde(default)]
    pub value: Option<Box<RawValue>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub number: String,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub draft: DraftResponse,
}

fn raw_input(value: Option<&RawValue>) -> String {
    let Some(raw) = value else {
        return String::new();
    };
    let text = raw.get().trim();
    if text.starts_with('"') {
        return serde_json::from_str::<String>(text).unwrap_or_default();
    }
    match text.as_bytes().first() {
        Some(b'-' | b'0'..=b'9') => text.to_string(),
        _ => String::new(),
    }
}

fn line_kind(segment: &str) -> Result<LineKind, ApiError> {
    match segment {
        "works" => Ok(LineKind::Work),
        "parts" => Ok(LineKind::Part),
        _ => Err(ValidationError::NotAllowed {
            field: "kind".to_string(),
            allowed: vec!["works".to_string(), "parts".to_string()],
        }
        .into()),
    }
}

/// Position of a row. Negative, overflowing or non-numeric segments name no
/// row at all and come back as `None`.
fn line_index(segment: &str) -> Option<usize> {
    segment.trim().parse().ok()
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/sessions/{id}/draft`
pub async fn get_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DraftResponse>, ApiError> {
    let draft = state.sessions.get(&id).await?;
    let draft = draft.lock().await;
    Ok(Json(DraftResponse::from(&*draft)))
}

/// `POST /api/sessions/{id}/draft`
///
/// Starts a fresh draft for a client. Lines and header of the previous draft
/// are dropped.
pub async fn begin_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<BeginDraftRequest>,
) -> Result<Json<DraftResponse>, ApiError> {
    let client = validate_ref("client", &body.client)?;
    if is_empty_ref(&client) {
        return Err(ValidationError::Required {
            field: "client".to_string(),
        }
        .into());
    }

    let draft = state.sessions.get(&id).await?;
    let mut draft = draft.lock().await;
    draft.begin(ClientRef::new(client));

    info!(session = %id, client = ?draft.client(), "Draft started");
    Ok(Json(DraftResponse::from(&*draft)))
}

/// `PUT /api/sessions/{id}/draft/header`
pub async fn set_header(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(details): Json<HeaderDetails>,
) -> Result<Json<DraftResponse>, ApiError> {
    let draft = state.sessions.get(&id).await?;
    let mut draft = draft.lock().await;
    draft.set_details(details);

    debug!(session = %id, "Header updated");
    Ok(Json(DraftResponse::from(&*draft)))
}

/// `POST /api/sessions/{id}/draft/works`
pub async fn add_work(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AddLineRequest>,
) -> Result<Json<DraftResponse>, ApiError> {
    add_line(&state, &id, LineKind::Work, body).await
}

/// `POST /api/sessions/{id}/draft/parts`
pub async fn add_part(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AddLineRequest>,
) -> Result<Json<DraftResponse>, ApiError> {
    add_line(&state, &id, LineKind::Part, body).await
}

async fn add_line(
    state: &AppState,
    id: &str,
    kind: LineKind,
    body: AddLineRequest,
) -> Result<Json<DraftResponse>, ApiError> {
    let draft = state.sessions.get(id).await?;
    let reference = validate_ref("ref", &body.reference)?;
    let catalog = match kind {
        LineKind::Work => CatalogKind::Works,
        LineKind::Part => CatalogKind::Parts,
    };
    let entry = resolve_entry(
        state.catalog.as_ref(),
        catalog,
        CatalogRef::new(reference),
        body.name,
    )
    .await?;

    let mut draft = draft.lock().await;
    match kind {
        LineKind::Work => draft.ledger_mut().add_work(&entry),
        LineKind::Part => draft.ledger_mut().add_part(&entry),
    }

    Ok(Json(DraftResponse::from(&*draft)))
}

/// `PATCH /api/sessions/{id}/draft/{kind}/{index}`
///
/// An index past the end, negative or too large to address leaves the draft
/// as it was.
pub async fn edit_line(
    State(state): State<AppState>,
    Path((id, kind, index)): Path<(String, String, String)>,
    Json(body): Json<EditLineRequest>,
) -> Result<Json<DraftResponse>, ApiError> {
    let kind = line_kind(&kind)?;
    let edit = LineEdit::from_input(body.field, &raw_input(body.value.as_deref()));

    let draft = state.sessions.get(&id).await?;
    let mut draft = draft.lock().await;
    let applied = match line_index(&index) {
        Some(index) => draft.ledger_mut().update_line(kind, index, edit),
        None => false,
    };

    debug!(session = %id, %kind, index = %index, applied, "Line edited");
    Ok(Json(DraftResponse::from(&*draft)))
}

/// `DELETE /api/sessions/{id}/draft/{kind}/{index}`
///
/// Later rows move up one place. An index that names no row is a no-op.
pub async fn remove_line(
    State(state): State<AppState>,
    Path((id, kind, index)): Path<(String, String, String)>,
) -> Result<Json<DraftResponse>, ApiError> {
    let kind = line_kind(&kind)?;

    let draft = state.sessions.get(&id).await?;
    let mut draft = draft.lock().await;
    let removed = match line_index(&index) {
        Some(index) => draft.ledger_mut().remove_line(kind, index),
        None => false,
    };

    debug!(session = %id, %kind, index = %index, removed, "Line removed");
    Ok(Json(DraftResponse::from(&*draft)))
}

/// `DELETE /api/sessions/{id}/draft/lines`
pub async fn clear_lines(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DraftResponse>, ApiError> {
    let draft = state.sessions.get(&id).await?;
    let mut draft = draft.lock().await;
    draft.ledger_mut().clear();

    Ok(Json(DraftResponse::from(&*draft)))
}

/// `POST /api/sessions/{id}/draft/submit`
///
/// The lock is held across the ERP call, so no edit can slip in between
/// building the payload and clearing the draft. On failure the draft is left
/// intact for another attempt.
pub async fn submit_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let draft = state.sessions.get(&id).await?;
    let mut draft = draft.lock().await;

    let receipt = submit_to_erp(&draft, state.submission.as_ref()).await?;
    info!(session = %id, number = %receipt.number, "Draft submitted");
    draft.discard();

    Ok(Json(SubmitResponse {
        number: receipt.number,
        reference: receipt.reference,
        draft: DraftResponse::from(&*draft),
    }))
}
