use std::time::Duration;

use serde::Deserialize;

use crate::models::Credentials;
use crate::services::SearchSettings;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the catalog service (the host serving `player_api.php`)
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// Catalog account user name
    #[serde(default)]
    pub catalog_username: Option<String>,

    /// Catalog account password
    #[serde(default)]
    pub catalog_password: Option<String>,

    /// Query carried over from a prior screen, replayed once the catalog is ready
    #[serde(default)]
    pub initial_query: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Debounce quiescence window in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum number of results delivered per query
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,

    /// Minimum trimmed query length before matching starts
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,

    /// Per-request timeout for catalog source calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_catalog_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_result_limit() -> usize {
    100
}

fn default_min_query_chars() -> usize {
    2
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Credentials as configured; blank values are left for the fetcher to reject
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.catalog_username.clone().unwrap_or_default(),
            self.catalog_password.clone().unwrap_or_default(),
        )
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            quiescence: Duration::from_millis(self.debounce_ms),
            result_limit: self.result_limit,
            min_query_chars: self.min_query_chars,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
