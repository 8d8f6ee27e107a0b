//! Core types and shared functionality for edge-cache.
//!
//! This crate provides:
//! - Generational response store with SQLite backend
//! - Generation Manager (current tag, rollover on activation)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod generation;

pub use cache::{CacheDb, GenerationInfo, ResponseType, StoredResponse};
pub use config::{AppConfig, ConfigError, FetchStrategy};
pub use error::Error;
pub use generation::{ActivationReport, GenerationFailure, GenerationManager};
