//! Draft reconciliation store.
//!
//! Persists in-progress edits to the device-local store and reconciles them
//! against server records with a last-write-wins policy keyed on timestamps.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;

use crate::db::LocalKv;
use crate::errors::AppError;
use crate::models::{LocalDraft, Record};

/// Storage key for a draft, namespaced by the record's logical identity.
fn draft_key(record_type: &str, id: &str) -> String {
    format!("draft_{}_{}", record_type, id)
}

/// How a reconcile request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReconcileOutcome {
    /// No local draft existed; the server record stands.
    RemoteOnly,
    /// No server record exists yet; the caller should create one from the draft.
    DraftOnly,
    /// The draft was newer and supplied the content.
    LocalNewer,
    /// The server record was newer; draft changes were overlaid per field.
    RemoteNewer,
}

/// Durable store for one device's in-progress edits.
pub struct DraftStore {
    kv: Arc<dyn LocalKv>,
    /// Keys currently known to hold a draft.
    drafting: Mutex<HashSet<String>>,
}

impl DraftStore {
    pub fn new(kv: Arc<dyn LocalKv>) -> Self {
        Self {
            kv,
            drafting: Mutex::new(HashSet::new()),
        }
    }

    /// Persist `record` as the current draft, stamping a fresh `lastSaved`.
    ///
    /// On a storage failure the previous draft, if any, is left untouched.
    pub async fn save(&self, record: &Record) -> Result<LocalDraft, AppError> {
        let draft = LocalDraft {
            record: record.clone(),
            last_saved: Utc::now(),
        };
        let key = draft_key(&record.record_type, &record.id);
        let value = serde_json::to_string(&draft).map_err(|e| {
            AppError::LocalPersistence(format!("Draft serialization failed: {}", e))
        })?;

        self.kv
            .set(&key, &value)
            .await
            .map_err(|e| AppError::LocalPersistence(e.message()))?;

        self.drafting
            .lock()
            .expect("draft state mutex poisoned")
            .insert(key);
        Ok(draft)
    }

    /// Load the stored draft, if any.
    ///
    /// A stored value that fails to deserialize is treated as absent.
    pub async fn load(&self, record_type: &str, id: &str) -> Result<Option<LocalDraft>, AppError> {
        let key = draft_key(record_type, id);
        let stored = self
            .kv
            .get(&key)
            .await
            .map_err(|e| AppError::LocalPersistence(e.message()))?;

        let draft = match stored {
            Some(raw) => match serde_json::from_str::<LocalDraft>(&raw) {
                Ok(draft) => Some(draft),
                Err(e) => {
                    tracing::warn!("Treating unreadable draft {} as absent: {}", key, e);
                    None
                }
            },
            None => None,
        };

        let mut drafting = self.drafting.lock().expect("draft state mutex poisoned");
        if draft.is_some() {
            drafting.insert(key);
        } else {
            drafting.remove(&key);
        }
        Ok(draft)
    }

    /// Remove the stored draft. Calling this when nothing is stored is a no-op.
    pub async fn clear(&self, record_type: &str, id: &str) -> Result<(), AppError> {
        let key = draft_key(record_type, id);
        self.kv
            .delete(&key)
            .await
            .map_err(|e| AppError::LocalPersistence(e.message()))?;

        self.drafting
            .lock()
            .expect("draft state mutex poisoned")
            .remove(&key);
        Ok(())
    }

    /// Whether a draft is known to exist for this record. Memory state only.
    pub fn has_draft(&self, record_type: &str, id: &str) -> bool {
        self.drafting
            .lock()
            .expect("draft state mutex poisoned")
            .contains(&draft_key(record_type, id))
    }
}

/// Reconcile a local draft with a freshly fetched server record.
///
/// If the draft was saved after the server record's last update, the draft's
/// content wins wholesale, anchored to the server record's identity and
/// creation metadata. Otherwise the server record wins and only fields the
/// draft actually changed are carried over, so another editor's writes
/// survive a stale draft.
pub fn merge(local: &LocalDraft, remote: &Record) -> Record {
    if local.last_saved > remote.updated_at {
        Record {
            id: remote.id.clone(),
            record_type: remote.record_type.clone(),
            updated_at: local.record.updated_at,
            created_at: remote.created_at,
            created_by: remote.created_by.clone(),
            fields: local.record.fields.clone(),
        }
    } else {
        let mut merged = remote.clone();
        for (key, value) in &local.record.fields {
            if remote.fields.get(key) != Some(value) {
                merged.fields.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}
