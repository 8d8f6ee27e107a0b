//! Generation Manager.
//!
//! Owns which cache generation is current and destroys every other one on
//! activation. The tag this deploy writes to is passed in at construction;
//! there is no process-wide cache name.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::cache::{CacheDb, GenerationInfo, StoredResponse, hash::compute_cache_key};

/// A stale generation whose deletion failed during activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenerationFailure {
    pub tag: String,
    pub reason: String,
}

/// What an activation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivationReport {
    /// The generation now current.
    pub current: String,
    /// Stale generations that were dropped.
    pub deleted: Vec<String>,
    /// Stale generations that could not be dropped.
    pub failed: Vec<GenerationFailure>,
}

/// Tracks the current generation and mediates all store access.
#[derive(Debug)]
pub struct GenerationManager {
    db: CacheDb,
    tag: String,
    max_entry_bytes: usize,
    current: RwLock<Option<String>>,
}

/// Default largest body [`GenerationManager::put`] accepts (10MB).
pub const DEFAULT_MAX_ENTRY_BYTES: usize = 10 * 1024 * 1024;

impl GenerationManager {
    /// Create a manager writing to generation `tag`.
    pub fn new(db: CacheDb, tag: impl Into<String>) -> Self {
        Self { db, tag: tag.into(), max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES, current: RwLock::new(None) }
    }

    /// Cap the body size of stored responses.
    pub fn with_max_entry_bytes(mut self, max_entry_bytes: usize) -> Self {
        self.max_entry_bytes = max_entry_bytes;
        self
    }

    /// The generation this deploy owns.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The generation last activated, if any.
    pub fn current_tag(&self) -> Option<String> {
        self.current.read().map(|c| c.clone()).unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Allocate the store for `tag` if absent. Repeat calls are no-ops.
    pub async fn create_generation(&self, tag: &str) -> Result<(), Error> {
        if self.db.create_generation(tag).await? {
            tracing::info!(generation = tag, "created cache generation");
        }
        Ok(())
    }

    /// Make `tag` current and drop every other generation.
    ///
    /// Each stale generation is deleted on its own; a failure is logged and
    /// reported without stopping the rest. Only failing to enumerate the
    /// generations is returned as an error.
    pub async fn activate_generation(&self, tag: &str) -> Result<ActivationReport, Error> {
        let existing = self.db.generation_tags().await?;

        let mut deleted = Vec::new();
        let mut failed = Vec::new();

        for stale in existing.into_iter().filter(|t| t != tag) {
            match self.db.delete_generation(&stale).await {
                Ok(_) => {
                    tracing::info!(generation = %stale, "deleted stale cache generation");
                    deleted.push(stale);
                }
                Err(e) => {
                    tracing::warn!(generation = %stale, error = %e, "failed to delete stale cache generation");
                    failed.push(GenerationFailure { tag: stale, reason: e.to_string() });
                }
            }
        }

        self.db.create_generation(tag).await?;
        self.set_current(tag);

        Ok(ActivationReport { current: tag.to_string(), deleted, failed })
    }

    fn set_current(&self, tag: &str) {
        let mut current = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Some(tag.to_string());
    }

    /// Every generation currently in the store.
    pub async fn generations(&self) -> Result<Vec<GenerationInfo>, Error> {
        self.db.list_generations().await
    }

    /// Look up a request identity in this deploy's generation.
    ///
    /// A lookup racing an activation that deleted the generation simply
    /// misses.
    pub async fn match_request(&self, method: &str, url: &str) -> Result<Option<StoredResponse>, Error> {
        let key = compute_cache_key(method, url);
        let hit = self.db.match_entry(&self.tag, &key).await?;
        tracing::debug!(generation = %self.tag, %method, %url, hit = hit.is_some(), "cache lookup");
        Ok(hit)
    }

    /// Store a response under its request identity in this deploy's
    /// generation, replacing any prior entry.
    ///
    /// # Errors
    ///
    /// - `Error::UnsupportedMethod` for anything but GET
    /// - `Error::EntryTooLarge` for a body over the configured limit
    /// - `Error::GenerationMissing` once this deploy's generation has been
    ///   deleted by a newer activation
    pub async fn put(&self, response: &StoredResponse) -> Result<(), Error> {
        if !response.method.eq_ignore_ascii_case("GET") {
            return Err(Error::UnsupportedMethod(format!("cannot store {} {}", response.method, response.url)));
        }
        if response.body.len() > self.max_entry_bytes {
            return Err(Error::EntryTooLarge(format!(
                "{}: {} bytes exceeds {}",
                response.url,
                response.body.len(),
                self.max_entry_bytes
            )));
        }
        let key = compute_cache_key(&response.method, &response.url);
        self.db.put_entry(&self.tag, &key, response).await?;
        tracing::debug!(generation = %self.tag, url = %response.url, "stored response");
        Ok(())
    }

    /// Number of entries in this deploy's generation.
    pub async fn entry_count(&self) -> Result<u64, Error> {
        self.db.count_entries(&self.tag).await
    }
}
