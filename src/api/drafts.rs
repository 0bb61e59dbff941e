//! Draft API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use super::{success, ApiResult};
use crate::models::{LocalDraft, Record, SaveDraftRequest};
use crate::AppState;

/// Response body for the draft existence check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftExistsResponse {
    pub has_draft: bool,
}

/// GET /api/drafts/:type/:id - Load the stored draft, if any.
pub async fn get_draft(
    State(state): State<AppState>,
    Path((record_type, id)): Path<(String, String)>,
) -> ApiResult<Option<LocalDraft>> {
    let draft = state.drafts.load(&record_type, &id).await?;
    success(draft)
}

/// PUT /api/drafts/:type/:id - Save the in-progress edit as the current draft.
pub async fn save_draft(
    State(state): State<AppState>,
    Path((record_type, id)): Path<(String, String)>,
    Json(request): Json<SaveDraftRequest>,
) -> ApiResult<LocalDraft> {
    let record = Record {
        id,
        record_type,
        updated_at: request.updated_at.unwrap_or_else(Utc::now),
        created_at: request.created_at,
        created_by: request.created_by,
        fields: request.fields,
    };

    let draft = state.drafts.save(&record).await?;
    success(draft)
}

/// GET /api/drafts/:type/:id/exists - Memory-state check, no storage read.
pub async fn has_draft(
    State(state): State<AppState>,
    Path((record_type, id)): Path<(String, String)>,
) -> ApiResult<DraftExistsResponse> {
    let has_draft = state.drafts.has_draft(&record_type, &id);
    success(DraftExistsResponse { has_draft })
}

/// DELETE /api/drafts/:type/:id - Discard the stored draft. Idempotent.
pub async fn discard_draft(
    State(state): State<AppState>,
    Path((record_type, id)): Path<(String, String)>,
) -> ApiResult<()> {
    state.drafts.clear(&record_type, &id).await?;
    success(())
}
