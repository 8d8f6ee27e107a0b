//! Edge caching engine for edge-cache.
//!
//! This crate provides the request router, the caching strategy executors,
//! the reqwest-backed network, and the lifecycle bridge the host adapter
//! drives.

pub mod engine;
pub mod fetch;
pub mod lifecycle;
pub mod request;
pub mod router;
pub mod strategy;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use engine::EdgeEngine;
pub use fetch::{CacheMode, FetchClient, FetchConfig, FetchResponse, Network};
pub use lifecycle::{
    ActivationOutcome, ClientInfo, ControlMessage, FetchDecision, InstallReport, Lifecycle, MessageOutcome,
    PrecacheFailure, WorkerState,
};
pub use request::EdgeRequest;
pub use router::{BypassReason, OriginPolicy, Route, Router, StrategyTable};
pub use strategy::{ResponseSource, Served};
pub use tasks::BackgroundTasks;
