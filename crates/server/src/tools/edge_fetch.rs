//! edge_fetch tool implementation.
//!
//! Offers a request to the engine. Requests the engine declines go to the
//! network exactly as they came in.

use edge_cache_client::{
    BypassReason, CacheMode, EdgeEngine, EdgeRequest, FetchDecision, Lifecycle, Network, ResponseSource, Served,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use edge_cache_core::{Error, FetchStrategy, ResponseType};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for edge_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EdgeFetchParams {
    /// The URL requested by the consumer.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Whether this is a top-level page navigation.
    #[serde(default)]
    pub navigate: bool,
}

/// Output structure for edge_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeFetchOutput {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub source: ResponseSource,
    /// Strategy that answered; absent when the engine declined.
    pub strategy: Option<FetchStrategy>,
    /// Why the engine declined the request.
    pub bypass: Option<BypassReason>,
    pub response_type: ResponseType,
    pub content_type: Option<String>,
    /// Response body, encoded as `body_encoding` says.
    pub body: String,
    pub body_encoding: BodyEncoding,
    pub body_bytes: usize,
    pub fetch_ms: u64,
}

/// How `body` carries the response bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    Utf8,
    Base64,
}

fn is_textual(content_type: Option<&str>) -> bool {
    let Some(mime) = content_type.and_then(|ct| ct.split(';').next()) else {
        return false;
    };
    let mime = mime.trim().to_ascii_lowercase();
    mime.starts_with("text/")
        || mime.ends_with("+json")
        || mime.ends_with("+xml")
        || matches!(
            mime.as_str(),
            "application/json" | "application/javascript" | "application/xml" | "image/svg+xml"
        )
}

/// Text bodies as-is; everything else, or text that is not valid UTF-8, as
/// base64 so no byte is lost.
fn encode_body(content_type: Option<&str>, bytes: &[u8]) -> (String, BodyEncoding) {
    if is_textual(content_type)
        && let Ok(text) = std::str::from_utf8(bytes)
    {
        return (text.to_string(), BodyEncoding::Utf8);
    }
    (STANDARD.encode(bytes), BodyEncoding::Base64)
}

impl EdgeFetchOutput {
    fn new(served: Served, strategy: Option<FetchStrategy>, bypass: Option<BypassReason>) -> Self {
        let response = served.response;
        let content_type = response
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let (body, body_encoding) = encode_body(content_type.as_deref(), &response.bytes);

        Self {
            url: response.url.to_string(),
            final_url: response.final_url.to_string(),
            status: response.status.as_u16(),
            source: served.source,
            strategy,
            bypass,
            response_type: response.response_type,
            content_type,
            body,
            body_encoding,
            body_bytes: response.bytes.len(),
            fetch_ms: response.fetch_ms,
        }
    }
}

/// Implementation of the edge_fetch tool.
pub async fn fetch_impl(
    engine: &EdgeEngine, network: &dyn Network, params: EdgeFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let mut request = if params.navigate { EdgeRequest::navigate(&params.url)? } else { EdgeRequest::get(&params.url)? };
    if let Some(method) = params.method.as_deref() {
        request = request.with_method_name(method)?;
    }

    let output = match engine.on_fetch(request.clone()).await? {
        FetchDecision::Respond { strategy, served } => EdgeFetchOutput::new(served, Some(strategy), None),
        FetchDecision::Bypass(reason) => {
            tracing::debug!(url = %request.url, ?reason, "forwarding bypassed request");
            let response = network.fetch(&request, CacheMode::Default).await?;
            EdgeFetchOutput::new(Served::network(response), None, Some(reason))
        }
    };

    json_result(&output)
}
