//! client_open and client_close tool implementations.
//!
//! The host reports consumers opening and closing so a waiting install
//! knows when the previous generation has no one left to serve.

use edge_cache_client::{ActivationOutcome, ClientInfo, EdgeEngine};
use edge_cache_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the client_open tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientOpenParams {
    /// Host-assigned consumer id.
    pub id: String,
    /// Page the consumer has open.
    pub url: String,
    /// Generation tag already serving this consumer, if any.
    #[serde(default)]
    pub controller: Option<String>,
}

/// Parameters for the client_close tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientCloseParams {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientsOutput {
    pub clients: Vec<ClientInfo>,
    /// Set when closing released a waiting install.
    pub activation: Option<ActivationOutcome>,
}

pub async fn open_impl(engine: &EdgeEngine, params: ClientOpenParams) -> Result<CallToolResult, McpError> {
    if params.id.trim().is_empty() {
        return Err(Error::InvalidInput("id cannot be empty".into()).into());
    }
    engine.open_client(&params.id, &params.url, params.controller).await;
    json_result(&ClientsOutput { clients: engine.clients().await, activation: None })
}

pub async fn close_impl(engine: &EdgeEngine, params: ClientCloseParams) -> Result<CallToolResult, McpError> {
    let activation = engine.close_client(&params.id).await?;
    json_result(&ClientsOutput { clients: engine.clients().await, activation })
}
