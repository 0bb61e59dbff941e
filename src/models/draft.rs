//! Local draft model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Record;

/// A device-local snapshot of a record that has not yet been published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDraft {
    #[serde(flatten)]
    pub record: Record,
    /// Stamped by the draft store at save time. Distinct from `updatedAt`,
    /// which reflects application-level edit time.
    pub last_saved: DateTime<Utc>,
}

/// Request body for saving a draft. `lastSaved` is stamped server-side and
/// cannot be supplied by the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDraftRequest {
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
