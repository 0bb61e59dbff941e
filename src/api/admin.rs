//! Admin settings API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{success, ApiResult};
use crate::models::{
    AddAdminRequest, AdminCheckResponse, AdminSettings, RemoveAdminQuery, SetNotificationRequest,
};
use crate::AppState;

/// Query parameters for reading settings.
#[derive(Debug, Deserialize)]
pub struct GetSettingsQuery {
    /// Bypass the cache and force a remote read.
    #[serde(default)]
    pub force: bool,
}

/// GET /api/admin/settings - Current settings, served from cache while fresh.
///
/// `data` is null only while the very first fetch is still in flight.
pub async fn get_settings(
    State(state): State<AppState>,
    Query(query): Query<GetSettingsQuery>,
) -> ApiResult<Option<AdminSettings>> {
    let settings = state.settings.get_settings(query.force).await?;
    success(settings)
}

/// POST /api/admin/admins - Add an email to the allow-list.
pub async fn add_admin(
    State(state): State<AppState>,
    Json(request): Json<AddAdminRequest>,
) -> ApiResult<AdminSettings> {
    let settings = state
        .settings
        .add_admin(&request.email, &request.added_by)
        .await?;
    success(settings)
}

/// DELETE /api/admin/admins/:email - Remove an email from the allow-list.
pub async fn remove_admin(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Query(query): Query<RemoveAdminQuery>,
) -> ApiResult<AdminSettings> {
    let settings = state
        .settings
        .remove_admin(&email, &query.updated_by)
        .await?;
    success(settings)
}

/// GET /api/admin/admins/:email - Membership check against loaded settings.
pub async fn check_admin(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<AdminCheckResponse> {
    let is_admin = state.settings.is_admin(&email);
    success(AdminCheckResponse { email, is_admin })
}

/// PUT /api/admin/notifications - Toggle a notification recipient.
pub async fn set_notification(
    State(state): State<AppState>,
    Json(request): Json<SetNotificationRequest>,
) -> ApiResult<AdminSettings> {
    let settings = state
        .settings
        .set_notification(&request.email, request.enabled, &request.updated_by)
        .await?;
    success(settings)
}
