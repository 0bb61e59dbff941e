//! Admin settings model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Singleton settings document controlling administrative access and email
/// notification recipients. One document per deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSettings {
    /// Normalized (lower-cased) admin email addresses. Never empty once an
    /// admin has been added; removing the last entry is rejected.
    pub admin_emails: Vec<String>,
    /// Normalized email addresses receiving notifications. Independent of
    /// admin membership.
    #[serde(default)]
    pub notification_emails: Vec<String>,
    pub last_updated: DateTime<Utc>,
    pub updated_by: String,
}

impl AdminSettings {
    /// The document written on first access, before any admin exists.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            admin_emails: Vec::new(),
            notification_emails: Vec::new(),
            last_updated: now,
            updated_by: "system".to_string(),
        }
    }
}

/// Request body for adding an admin.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAdminRequest {
    pub email: String,
    pub added_by: String,
}

/// Query parameters for removing an admin.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveAdminQuery {
    pub updated_by: String,
}

/// Request body for toggling a notification recipient.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetNotificationRequest {
    pub email: String,
    pub enabled: bool,
    pub updated_by: String,
}

/// Response body for the admin membership check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCheckResponse {
    pub email: String,
    pub is_admin: bool,
}
