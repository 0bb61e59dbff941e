//! Configuration module for the Memoria backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to the document database (stands in for the hosted store)
    pub db_path: PathBuf,
    /// Path to the device-local draft database
    pub drafts_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Maximum age at which cached admin settings are served without a fetch
    pub settings_ttl: Duration,
    /// Total attempts for a settings read before giving up
    pub fetch_retry_attempts: u32,
    /// Fixed delay between settings read attempts
    pub fetch_retry_delay: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("MEMORIA_API_PSK").ok();

        let db_path = env::var("MEMORIA_DB_PATH")
            .unwrap_or_else(|_| "./data/memoria.sqlite".to_string())
            .into();

        let drafts_path = env::var("MEMORIA_DRAFTS_PATH")
            .unwrap_or_else(|_| "./data/drafts.sqlite".to_string())
            .into();

        let bind_addr = env::var("MEMORIA_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid MEMORIA_BIND_ADDR format");

        let log_level = env::var("MEMORIA_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let settings_ttl = env::var("MEMORIA_SETTINGS_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(300));

        let fetch_retry_attempts = env::var("MEMORIA_FETCH_RETRY_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        let fetch_retry_delay = env::var("MEMORIA_FETCH_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(1));

        Self {
            api_psk,
            db_path,
            drafts_path,
            bind_addr,
            log_level,
            settings_ttl,
            fetch_retry_attempts,
            fetch_retry_delay,
        }
    }
}
