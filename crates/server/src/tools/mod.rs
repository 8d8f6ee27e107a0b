//! MCP tool implementations.
//!
//! This module contains all tools exposed by the edge-cache server.

pub mod clients;
pub mod edge_fetch;
pub mod generations;
pub mod lifecycle;

use edge_cache_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

pub use clients::{ClientCloseParams, ClientOpenParams};
pub use edge_fetch::EdgeFetchParams;
pub use lifecycle::LifecycleMessageParams;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json =
        serde_json::to_string_pretty(output).map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
