//! cache_generations tool implementation.
//!
//! Lists every generation in the store with its entry count.

use edge_cache_client::{EdgeEngine, WorkerState};
use edge_cache_core::GenerationInfo;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;

use super::json_result;

/// Output from the cache_generations tool.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationsOutput {
    /// Generation this deploy writes to.
    pub tag: String,
    /// Generation last activated, if any.
    pub current: Option<String>,
    pub state: WorkerState,
    pub generations: Vec<GenerationInfo>,
}

pub async fn generations_impl(engine: &EdgeEngine) -> Result<CallToolResult, McpError> {
    let manager = engine.generations();
    let output = GenerationsOutput {
        tag: manager.tag().to_string(),
        current: manager.current_tag(),
        state: engine.state().await,
        generations: manager.generations().await?,
    };
    json_result(&output)
}
