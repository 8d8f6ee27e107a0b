//! Lifecycle Bridge.
//!
//! The host runtime delivers four kinds of triggers: install, activate,
//! control messages from consumers, and intercepted fetches. [`Lifecycle`]
//! has one method per trigger; the host adapter calls them and the engine
//! drives the Generation Manager from there.
//!
//! ```text
//! Uninstalled → Installing → Installed (waiting) → Activating → Active
//! ```

pub mod clients;

use async_trait::async_trait;
use edge_cache_core::{ActivationReport, Error, FetchStrategy};
use serde::{Deserialize, Serialize};

use crate::request::EdgeRequest;
use crate::router::BypassReason;
use crate::strategy::Served;

pub use clients::{ClientInfo, ClientRegistry};

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Uninstalled,
    Installing,
    /// Installed and waiting for activation.
    Installed,
    Activating,
    Active,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Uninstalled => "uninstalled",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
        }
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Messages consumers may post to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Leave the waiting state now, whatever other consumers are open.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
}

impl ControlMessage {
    /// Recognize a message; anything else yields None.
    pub fn parse(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// An asset that could not be stored during install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecacheFailure {
    pub url: String,
    pub reason: String,
}

/// Activation plus the consumers it took over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationOutcome {
    pub report: ActivationReport,
    pub claimed_clients: usize,
}

/// What install did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub tag: String,
    pub precached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
    /// Present when install went straight on to activation.
    pub activation: Option<ActivationOutcome>,
}

/// Result of a control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MessageOutcome {
    /// Unknown shape or type.
    Ignored,
    /// Skip-waiting accepted; activation ran if the engine was waiting.
    SkipWaiting { activation: Option<ActivationOutcome> },
}

/// The engine's answer to an intercepted request.
#[derive(Debug, Clone)]
pub enum FetchDecision {
    /// Declined: the request proceeds to the network untouched.
    Bypass(BypassReason),
    /// Answered by a strategy.
    Respond { strategy: FetchStrategy, served: Served },
}

/// One method per host lifecycle trigger.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Install trigger: create and pre-populate the new generation.
    async fn on_install(&self) -> Result<InstallReport, Error>;

    /// Activate trigger: drop stale generations and claim open consumers.
    async fn on_activate(&self) -> Result<ActivationOutcome, Error>;

    /// Control message from a consumer.
    async fn on_message(&self, message: &serde_json::Value) -> Result<MessageOutcome, Error>;

    /// Intercepted request. `Err` only when the network failed and nothing
    /// was stored for the request.
    async fn on_fetch(&self, request: EdgeRequest) -> Result<FetchDecision, Error>;
}
