//! Memoria draft & settings backend
//!
//! A REST backend providing durable draft storage with last-write-wins
//! reconciliation and a cached administrator allow-list, over SQLite
//! persistence.

mod api;
mod auth;
mod config;
mod db;
mod drafts;
mod errors;
mod models;
mod retry;
mod settings;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::{DocumentStore, RecordStore, SqliteDocumentStore, SqliteKv};
use drafts::DraftStore;
use retry::RetryPolicy;
use settings::{SettingsConfig, SettingsService};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<RecordStore>,
    pub drafts: Arc<DraftStore>,
    pub settings: Arc<SettingsService>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Memoria draft & settings backend");
    tracing::info!("Document database path: {:?}", config.db_path);
    tracing::info!("Draft database path: {:?}", config.drafts_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (MEMORIA_API_PSK). Authentication is disabled!");
    }

    // Initialize databases
    let documents_pool = db::init_document_database(&config.db_path).await?;
    let drafts_pool = db::init_draft_database(&config.drafts_path).await?;

    let documents: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(documents_pool));
    let records = Arc::new(RecordStore::new(documents.clone()));
    let drafts = Arc::new(DraftStore::new(Arc::new(SqliteKv::new(drafts_pool))));
    let settings = Arc::new(SettingsService::new(
        documents,
        SettingsConfig {
            ttl: config.settings_ttl,
            retry: RetryPolicy::fixed(config.fetch_retry_attempts, config.fetch_retry_delay),
        },
    ));

    // Create application state
    let state = AppState {
        records,
        drafts,
        settings,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Records
        .route("/records/{record_type}", post(api::create_record))
        .route("/records/{record_type}/{id}", get(api::get_record))
        .route("/records/{record_type}/{id}", put(api::update_record))
        .route(
            "/records/{record_type}/{id}/reconcile",
            post(api::reconcile_record),
        )
        // Drafts
        .route("/drafts/{record_type}/{id}", get(api::get_draft))
        .route("/drafts/{record_type}/{id}", put(api::save_draft))
        .route("/drafts/{record_type}/{id}", delete(api::discard_draft))
        .route("/drafts/{record_type}/{id}/exists", get(api::has_draft))
        // Admin settings
        .route("/admin/settings", get(api::get_settings))
        .route("/admin/admins", post(api::add_admin))
        .route("/admin/admins/{email}", get(api::check_admin))
        .route("/admin/admins/{email}", delete(api::remove_admin))
        .route("/admin/notifications", put(api::set_notification))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
