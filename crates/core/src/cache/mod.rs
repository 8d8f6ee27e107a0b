//! SQLite-backed generational response store.
//!
//! Each generation is a named key-value store mapping a request identity to
//! the most recent successful response stored for it. Generations are
//! created, listed and dropped wholesale; entries cascade with their
//! generation.
//!
//! - SHA-256 request-identity keys
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{ResponseType, StoredResponse};
pub use generations::GenerationInfo;
