//! Record API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{success, ApiResult};
use crate::drafts::{merge, ReconcileOutcome};
use crate::errors::AppError;
use crate::models::{CreateRecordRequest, Record, UpdateRecordRequest};
use crate::AppState;

/// Response body for a reconcile request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub record: Record,
    pub outcome: ReconcileOutcome,
}

/// GET /api/records/:type/:id - Fetch a single record.
pub async fn get_record(
    State(state): State<AppState>,
    Path((record_type, id)): Path<(String, String)>,
) -> ApiResult<Record> {
    let record = state
        .records
        .get(&record_type, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Record {}/{} not found", record_type, id)))?;

    success(record)
}

/// POST /api/records/:type - Create a new record.
pub async fn create_record(
    State(state): State<AppState>,
    Path(record_type): Path<String>,
    Json(request): Json<CreateRecordRequest>,
) -> ApiResult<Record> {
    // Validate required fields
    if request.created_by.trim().is_empty() {
        return Err(AppError::Validation("createdBy is required".to_string()));
    }

    let record = state.records.create(&record_type, &request).await?;
    success(record)
}

/// PUT /api/records/:type/:id - Replace a record's content.
pub async fn update_record(
    State(state): State<AppState>,
    Path((record_type, id)): Path<(String, String)>,
    Json(request): Json<UpdateRecordRequest>,
) -> ApiResult<Record> {
    let record = state.records.update(&record_type, &id, &request).await?;
    success(record)
}

/// POST /api/records/:type/:id/reconcile - Merge the local draft with the
/// server record and report which side won. Never clears the draft; a
/// successful publish that supersedes it is the caller's move.
pub async fn reconcile_record(
    State(state): State<AppState>,
    Path((record_type, id)): Path<(String, String)>,
) -> ApiResult<ReconcileResponse> {
    let draft = state.drafts.load(&record_type, &id).await?;
    let remote = state.records.get(&record_type, &id).await?;

    let (record, outcome) = match (draft, remote) {
        (None, None) => {
            return Err(AppError::NotFound(format!(
                "Record {}/{} has neither a draft nor a server copy",
                record_type, id
            )))
        }
        (None, Some(remote)) => (remote, ReconcileOutcome::RemoteOnly),
        (Some(draft), None) => (draft.record, ReconcileOutcome::DraftOnly),
        (Some(draft), Some(remote)) => {
            let outcome = if draft.last_saved > remote.updated_at {
                ReconcileOutcome::LocalNewer
            } else {
                ReconcileOutcome::RemoteNewer
            };
            (merge(&draft, &remote), outcome)
        }
    };

    success(ReconcileResponse { record, outcome })
}
