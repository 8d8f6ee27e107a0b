//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (EDGE_CACHE_*)
//! 2. TOML config file (if EDGE_CACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// How a routed request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStrategy {
    /// Fresh round-trip first; the store is only a fallback when offline.
    NetworkFirst,
    /// Serve the stored copy at once and refresh it in the background.
    StaleWhileRevalidate,
    /// Forward to the network without touching the store.
    PassThrough,
}

impl FetchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStrategy::NetworkFirst => "network-first",
            FetchStrategy::StaleWhileRevalidate => "stale-while-revalidate",
            FetchStrategy::PassThrough => "pass-through",
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (EDGE_CACHE_*)
/// 2. TOML config file (if EDGE_CACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tag of the cache generation this deploy owns.
    ///
    /// Must change on every deploy so the previous generation is rolled over.
    /// Set via EDGE_CACHE_CACHE_TAG environment variable.
    #[serde(default)]
    pub cache_tag: String,

    /// Path to SQLite cache database.
    ///
    /// Set via EDGE_CACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Largest response body written to the store. Bigger responses are
    /// still served, just never stored.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Deployed origins of the application, e.g. `https://app.example.com`.
    ///
    /// The first entry is the base for relative `precache` paths.
    #[serde(default)]
    pub app_origins: Vec<String>,

    /// Development hosts intercepted on any port and either http scheme.
    #[serde(default = "default_dev_hosts")]
    pub dev_hosts: Vec<String>,

    /// Assets stored into the new generation during install.
    #[serde(default)]
    pub precache: Vec<String>,

    /// Activate right after install instead of waiting for open clients.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Strategy for navigations, document suffixes and the root path.
    #[serde(default = "default_document_strategy")]
    pub document_strategy: FetchStrategy,

    /// Strategy for every other intercepted request.
    #[serde(default = "default_asset_strategy")]
    pub asset_strategy: FetchStrategy,

    /// Path suffixes treated as documents.
    #[serde(default = "default_document_suffixes")]
    pub document_suffixes: Vec<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./edge-cache.sqlite")
}

fn default_user_agent() -> String {
    "edge-cache/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_dev_hosts() -> Vec<String> {
    vec!["localhost".into(), "127.0.0.1".into()]
}

fn default_true() -> bool {
    true
}

fn default_document_strategy() -> FetchStrategy {
    FetchStrategy::NetworkFirst
}

fn default_asset_strategy() -> FetchStrategy {
    FetchStrategy::StaleWhileRevalidate
}

fn default_document_suffixes() -> Vec<String> {
    vec![".html".into()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_tag: String::new(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            app_origins: Vec::new(),
            dev_hosts: default_dev_hosts(),
            precache: Vec::new(),
            skip_waiting: true,
            document_strategy: default_document_strategy(),
            asset_strategy: default_asset_strategy(),
            document_suffixes: default_document_suffixes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed application origins, in configuration order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an entry that is not an absolute
    /// http(s) URL with a host.
    pub fn origin_urls(&self) -> Result<Vec<Url>, ConfigError> {
        self.app_origins
            .iter()
            .map(|raw| {
                let url = Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
                    field: "app_origins".into(),
                    reason: format!("{raw}: {e}"),
                })?;
                if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
                    return Err(ConfigError::Invalid {
                        field: "app_origins".into(),
                        reason: format!("{raw}: expected an http(s) origin"),
                    });
                }
                Ok(url)
            })
            .collect()
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `EDGE_CACHE_`
    /// 2. TOML file from `EDGE_CACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("EDGE_CACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("EDGE_CACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
