//! Cached admin settings accessor.
//!
//! Serves the singleton allow-list document from a TTL cache, coalesces
//! concurrent fetches into a single in-flight remote read, and writes
//! mutations through as full-document replaces.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use crate::db::DocumentStore;
use crate::errors::AppError;
use crate::models::AdminSettings;
use crate::retry::RetryPolicy;

const SETTINGS_COLLECTION: &str = "settings";
const SETTINGS_DOC_ID: &str = "admin";

/// Tunables for the settings cache.
#[derive(Debug, Clone, Copy)]
pub struct SettingsConfig {
    /// Maximum age at which a cached value is served without a fresh fetch.
    pub ttl: Duration,
    /// Retry policy for remote reads. Writes are never retried.
    pub retry: RetryPolicy,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            retry: RetryPolicy::fixed(3, Duration::from_secs(1)),
        }
    }
}

#[derive(Default)]
struct CacheState {
    /// Last successfully loaded settings. Kept through invalidation so stale
    /// reads stay possible while a refresh is pending.
    value: Option<AdminSettings>,
    /// When `value` was fetched; `None` after invalidation.
    fetched_at: Option<Instant>,
    /// Single-flight guard: at most one remote read at a time.
    fetch_in_flight: bool,
}

/// Process-wide accessor for the singleton admin settings document.
///
/// Constructed once at startup and shared via `Arc`; tests build their own
/// instance against a fake store. The cache state lives behind a mutex and
/// the lock is never held across an await point.
pub struct SettingsService {
    store: Arc<dyn DocumentStore>,
    config: SettingsConfig,
    cache: Mutex<CacheState>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn DocumentStore>, config: SettingsConfig) -> Self {
        Self {
            store,
            config,
            cache: Mutex::new(CacheState::default()),
        }
    }

    /// Current settings, served from cache while fresh.
    ///
    /// Returns `None` only when a fetch is already in flight and nothing has
    /// loaded yet: concurrent callers get the best currently-available value
    /// instead of queueing behind the in-flight read.
    pub async fn get_settings(&self, force: bool) -> Result<Option<AdminSettings>, AppError> {
        {
            let mut cache = self.cache.lock().expect("settings cache mutex poisoned");

            if !force {
                if let (Some(value), Some(fetched_at)) = (&cache.value, cache.fetched_at) {
                    if fetched_at.elapsed() < self.config.ttl {
                        return Ok(Some(value.clone()));
                    }
                }
            }

            if cache.fetch_in_flight {
                return Ok(cache.value.clone());
            }
            cache.fetch_in_flight = true;
        }

        let result = self.config.retry.run(|| self.fetch_or_init()).await;

        let mut cache = self.cache.lock().expect("settings cache mutex poisoned");
        cache.fetch_in_flight = false;
        match result {
            Ok(settings) => {
                cache.value = Some(settings.clone());
                cache.fetched_at = Some(Instant::now());
                Ok(Some(settings))
            }
            // The stale cache, if any, stays usable for non-forced reads.
            Err(e) => Err(AppError::SettingsFetch(e.message())),
        }
    }

    /// Add `email` to the allow-list and return the refreshed settings.
    pub async fn add_admin(&self, email: &str, added_by: &str) -> Result<AdminSettings, AppError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::Validation("Email is required".to_string()));
        }

        let mut settings = self.fetch_authoritative().await?;
        if settings.admin_emails.iter().any(|e| e == &email) {
            return Err(AppError::DuplicateAdmin(format!(
                "{} is already an admin",
                email
            )));
        }

        settings.admin_emails.push(email);
        settings.last_updated = Utc::now();
        settings.updated_by = added_by.to_string();
        self.write_and_refresh(settings).await
    }

    /// Remove `email` from the allow-list.
    ///
    /// The last remaining admin cannot be removed; that rejection happens
    /// before any write reaches the store.
    pub async fn remove_admin(
        &self,
        email: &str,
        updated_by: &str,
    ) -> Result<AdminSettings, AppError> {
        let email = normalize_email(email);

        let mut settings = self.fetch_authoritative().await?;
        if !settings.admin_emails.iter().any(|e| e == &email) {
            return Err(AppError::NotFound(format!("{} is not an admin", email)));
        }
        if settings.admin_emails.len() <= 1 {
            return Err(AppError::LastAdmin(
                "At least one admin must remain".to_string(),
            ));
        }

        settings.admin_emails.retain(|e| e != &email);
        settings.last_updated = Utc::now();
        settings.updated_by = updated_by.to_string();
        self.write_and_refresh(settings).await
    }

    /// Enable or disable `email` as a notification recipient. Idempotent.
    pub async fn set_notification(
        &self,
        email: &str,
        enabled: bool,
        updated_by: &str,
    ) -> Result<AdminSettings, AppError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::Validation("Email is required".to_string()));
        }

        let mut settings = self.fetch_authoritative().await?;
        if enabled {
            if !settings.notification_emails.iter().any(|e| e == &email) {
                settings.notification_emails.push(email);
            }
        } else {
            settings.notification_emails.retain(|e| e != &email);
        }

        settings.last_updated = Utc::now();
        settings.updated_by = updated_by.to_string();
        self.write_and_refresh(settings).await
    }

    /// Synchronous membership check against the last-loaded settings.
    ///
    /// Never triggers a fetch; returns `false` until settings have loaded.
    pub fn is_admin(&self, email: &str) -> bool {
        let email = normalize_email(email);
        let cache = self.cache.lock().expect("settings cache mutex poisoned");
        cache
            .value
            .as_ref()
            .is_some_and(|s| s.admin_emails.iter().any(|e| e == &email))
    }

    /// Drop cache freshness while keeping the last value for stale reads.
    fn invalidate(&self) {
        let mut cache = self.cache.lock().expect("settings cache mutex poisoned");
        cache.fetched_at = None;
    }

    /// Retried read of the current document, bypassing the cache. Mutations
    /// start from this rather than a possibly-stale cached copy.
    async fn fetch_authoritative(&self) -> Result<AdminSettings, AppError> {
        self.config
            .retry
            .run(|| self.fetch_or_init())
            .await
            .map_err(|e| AppError::SettingsFetch(e.message()))
    }

    /// One remote read attempt, initializing the singleton document when it
    /// has never been written.
    async fn fetch_or_init(&self) -> Result<AdminSettings, AppError> {
        let body = self
            .store
            .get_document(SETTINGS_COLLECTION, SETTINGS_DOC_ID)
            .await?;

        match body {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| AppError::Database(format!("Corrupt settings document: {}", e))),
            None => {
                let settings = AdminSettings::initial(Utc::now());
                let body = serde_json::to_value(&settings).map_err(|e| {
                    AppError::Database(format!("Settings serialization failed: {}", e))
                })?;
                self.store
                    .set_document(SETTINGS_COLLECTION, SETTINGS_DOC_ID, &body)
                    .await?;
                tracing::info!("Initialized admin settings document");
                Ok(settings)
            }
        }
    }

    /// Full-document write followed by unconditional cache invalidation and a
    /// forced re-fetch, so the caller observes the authoritative post-write
    /// state.
    async fn write_and_refresh(&self, settings: AdminSettings) -> Result<AdminSettings, AppError> {
        let body = serde_json::to_value(&settings)
            .map_err(|e| AppError::Database(format!("Settings serialization failed: {}", e)))?;

        let written = self
            .store
            .set_document(SETTINGS_COLLECTION, SETTINGS_DOC_ID, &body)
            .await
            .map_err(|e| AppError::RemoteWrite(e.message()));

        // Invalidate whether or not the write landed; a failed write may
        // still have reached the store.
        self.invalidate();
        written?;

        let refreshed = self.get_settings(true).await?;
        Ok(refreshed.unwrap_or(settings))
    }
}

/// Lower-case and trim an email for storage and comparison.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
