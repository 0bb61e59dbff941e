//! Typed record operations over the document store.
//!
//! Records live one collection per record type; each record is stored as a
//! full JSON document and replaced wholesale on update.

use std::sync::Arc;

use chrono::Utc;

use super::DocumentStore;
use crate::errors::AppError;
use crate::models::{CreateRecordRequest, Record, UpdateRecordRequest};

/// CRUD layer for records stored as documents.
pub struct RecordStore {
    store: Arc<dyn DocumentStore>,
}

impl RecordStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Get a record by type and id.
    pub async fn get(&self, record_type: &str, id: &str) -> Result<Option<Record>, AppError> {
        let body = self.store.get_document(record_type, id).await?;

        match body {
            Some(value) => {
                let record = serde_json::from_value(value).map_err(|e| {
                    AppError::Database(format!("Corrupt record {}/{}: {}", record_type, id, e))
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Create a new record with a generated id and creation metadata.
    pub async fn create(
        &self,
        record_type: &str,
        request: &CreateRecordRequest,
    ) -> Result<Record, AppError> {
        let now = Utc::now();
        let record = Record {
            id: uuid::Uuid::new_v4().to_string(),
            record_type: record_type.to_string(),
            updated_at: now,
            created_at: Some(now),
            created_by: Some(request.created_by.clone()),
            fields: request.fields.clone(),
        };

        self.put(&record).await?;
        Ok(record)
    }

    /// Replace a record's content, preserving its creation metadata.
    pub async fn update(
        &self,
        record_type: &str,
        id: &str,
        request: &UpdateRecordRequest,
    ) -> Result<Record, AppError> {
        let existing = self.get(record_type, id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Record {}/{} not found", record_type, id))
        })?;

        let record = Record {
            id: existing.id,
            record_type: existing.record_type,
            updated_at: request.updated_at.unwrap_or_else(Utc::now),
            created_at: existing.created_at,
            created_by: existing.created_by,
            fields: request.fields.clone(),
        };

        self.put(&record).await?;
        Ok(record)
    }

    /// Full-document replace. Also used to publish a reconciled record.
    pub async fn put(&self, record: &Record) -> Result<(), AppError> {
        let body = serde_json::to_value(record).map_err(|e| {
            AppError::Database(format!(
                "Unserializable record {}/{}: {}",
                record.record_type, record.id, e
            ))
        })?;

        self.store
            .set_document(&record.record_type, &record.id, &body)
            .await
            .map_err(|e| AppError::RemoteWrite(e.message()))
    }
}
