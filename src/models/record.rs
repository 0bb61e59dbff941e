//! Generic record model shared by the document store and the draft store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A persisted entity with stable identity and modification timestamps.
///
/// Domain content (titles, story text, photo references) lives in the opaque
/// `fields` map; only identity and bookkeeping fields are typed. `createdAt`
/// and `createdBy` are set once at creation and never mutated by
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    /// Discriminant tag, e.g. "profile" or "story". Part of the record's
    /// logical identity together with `id`.
    pub record_type: String,
    /// Application-level edit time, monotonically non-decreasing per writer.
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Request body for creating a record. The id and timestamps are assigned
/// server-side.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    pub created_by: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Request body for replacing a record's content. Creation metadata is
/// preserved from the stored record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordRequest {
    /// Edit time reported by the caller; defaults to the server clock.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
