//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, FetchStrategy};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `cache_tag` is empty, and
    /// `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - an application origin is not an http(s) origin
    /// - `precache` holds relative paths but no application origin is set
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_tag.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_tag".into(),
                hint: "Set EDGE_CACHE_CACHE_TAG to a value that changes on every deploy".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 100 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 100MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        let origins = self.origin_urls()?;

        let has_relative = self.precache.iter().any(|p| !p.contains("://"));
        if has_relative && origins.is_empty() {
            return Err(ConfigError::Invalid {
                field: "precache".into(),
                reason: "relative paths need at least one entry in app_origins".into(),
            });
        }

        if origins.is_empty() && self.dev_hosts.is_empty() {
            tracing::warn!("No app_origins or dev_hosts configured; every request will bypass the cache");
        }

        if self.document_strategy == FetchStrategy::StaleWhileRevalidate {
            tracing::warn!(
                "document_strategy is stale-while-revalidate; navigations may serve a shell \
                 that references assets removed by the last deploy"
            );
        }

        Ok(())
    }
}
