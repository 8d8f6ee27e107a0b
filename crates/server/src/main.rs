//! edge-cache server entry point.
//!
//! Boots the edge caching engine behind an MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use edge_cache_client::{EdgeEngine, FetchClient, FetchConfig, Network};
use edge_cache_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        generation = %config.cache_tag,
        db = %config.db_path.display(),
        document_strategy = config.document_strategy.as_str(),
        asset_strategy = config.asset_strategy.as_str(),
        "Starting edge-cache server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let engine = Arc::new(EdgeEngine::new(&config, db, network.clone())?);

    let handler = handler::EdgeCacheServer::new(engine.clone(), network);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    engine.wait_idle().await;

    Ok(())
}
