//! Session lifecycle: one session per open order form.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::DraftResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: Uuid,
    pub draft: DraftResponse,
}

/// `POST /api/sessions`
pub async fn open_session(State(state): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
    let (id, draft) = state.sessions.open().await;
    let draft = draft.lock().await;

    (
        StatusCode::CREATED,
        Json(SessionResponse {
            id,
            draft: DraftResponse::from(&*draft),
        }),
    )
}

/// `DELETE /api/sessions/{id}`
///
/// Navigating away: the draft is discarded with the session. Waits for a
/// command in flight on the same draft to finish first.
pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let draft = state.sessions.close(&id).await?;
    draft.lock().await.discard();
    Ok(StatusCode::NO_CONTENT)
}
