//! Lifecycle trigger tools: lifecycle_install, lifecycle_activate and
//! lifecycle_message.

use edge_cache_client::{EdgeEngine, Lifecycle};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the lifecycle_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LifecycleMessageParams {
    /// Message posted by a consumer, e.g. `{"type": "SKIP_WAITING"}`.
    pub message: serde_json::Value,
}

pub async fn install_impl(engine: &EdgeEngine) -> Result<CallToolResult, McpError> {
    let report = engine.on_install().await?;
    json_result(&report)
}

pub async fn activate_impl(engine: &EdgeEngine) -> Result<CallToolResult, McpError> {
    let outcome = engine.on_activate().await?;
    json_result(&outcome)
}

pub async fn message_impl(engine: &EdgeEngine, params: LifecycleMessageParams) -> Result<CallToolResult, McpError> {
    let outcome = engine.on_message(&params.message).await?;
    json_result(&outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{EchoNetwork, engine, output, waiting_engine};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_install_reports_precache() {
        let engine = engine("v1", Arc::new(EchoNetwork::default())).await;

        let result = install_impl(&engine).await.unwrap();
        let json = output(&result);
        assert_eq!(json["tag"], "v1");
        assert_eq!(json["precached"], json!(["https://shop.example.com/"]));
        assert_eq!(json["activation"]["report"]["current"], "v1");
    }

    #[tokio::test]
    async fn test_activate_before_install_fails() {
        let engine = engine("v1", Arc::new(EchoNetwork::default())).await;

        let err = activate_impl(&engine).await.unwrap_err();
        assert_eq!(err.code.0, -32005);
    }

    #[tokio::test]
    async fn test_unknown_message_ignored() {
        let engine = engine("v1", Arc::new(EchoNetwork::default())).await;

        let params = LifecycleMessageParams { message: json!({"type": "PING"}) };
        let result = message_impl(&engine, params).await.unwrap();
        assert_eq!(output(&result)["outcome"], "ignored");
    }

    #[tokio::test]
    async fn test_skip_waiting_message() {
        let engine = waiting_engine("v2", Arc::new(EchoNetwork::default())).await;
        engine.open_client("tab", "https://shop.example.com/", Some("v1".into())).await;
        install_impl(&engine).await.unwrap();

        let params = LifecycleMessageParams { message: json!({"type": "SKIP_WAITING"}) };
        let result = message_impl(&engine, params).await.unwrap();
        let json = output(&result);
        assert_eq!(json["outcome"], "skip_waiting");
        assert_eq!(json["activation"]["claimed_clients"], 1);
    }
}
