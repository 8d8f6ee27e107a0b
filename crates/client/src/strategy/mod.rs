//! Strategy Executors.
//!
//! Each executor decides where the answer to an intercepted request comes
//! from and what is written back to this deploy's generation:
//!
//! - [`network_first`]: fresh round-trip, store on 200, store only as an
//!   offline fallback.
//! - [`stale_while_revalidate`]: stored copy at once, refreshed by a detached
//!   background fetch.
//! - [`pass_through`]: plain network, store untouched.
//!
//! Store reads and writes never fail the caller; only a failed network fetch
//! with nothing stored does.

pub mod network_first;
pub mod pass_through;
pub mod stale_while_revalidate;

use std::sync::Arc;

use edge_cache_core::{Error, FetchStrategy, GenerationManager};
use serde::Serialize;

use crate::fetch::{FetchResponse, Network};
use crate::request::EdgeRequest;
use crate::tasks::BackgroundTasks;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
}

/// A response handed back to the consumer.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: FetchResponse,
    pub source: ResponseSource,
}

impl Served {
    pub fn network(response: FetchResponse) -> Self {
        Self { response, source: ResponseSource::Network }
    }

    pub fn cache(response: FetchResponse) -> Self {
        Self { response, source: ResponseSource::Cache }
    }
}

/// Collaborators shared by every executor.
#[derive(Clone)]
pub struct StrategyContext {
    pub network: Arc<dyn Network>,
    pub generations: Arc<GenerationManager>,
    pub tasks: BackgroundTasks,
}

/// Run `strategy` for `request`.
pub async fn execute(strategy: FetchStrategy, ctx: &StrategyContext, request: &EdgeRequest) -> Result<Served, Error> {
    match strategy {
        FetchStrategy::NetworkFirst => network_first::execute(ctx, request).await,
        FetchStrategy::StaleWhileRevalidate => stale_while_revalidate::execute(ctx, request).await,
        FetchStrategy::PassThrough => pass_through::execute(ctx, request).await,
    }
}

/// Stored candidate for `request`, if any.
///
/// Lookup errors (including a generation deleted mid-read) count as a miss.
pub(crate) async fn lookup(generations: &GenerationManager, request: &EdgeRequest) -> Option<FetchResponse> {
    let stored = match generations.match_request(request.method_str(), request.url.as_str()).await {
        Ok(stored) => stored?,
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
            return None;
        }
    };

    match FetchResponse::from_stored(&stored) {
        Ok(response) => Some(response),
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "ignoring unreadable cache entry");
            None
        }
    }
}

/// Store a copy of `response` under the request identity.
pub(crate) async fn store(generations: &GenerationManager, request: &EdgeRequest, response: &FetchResponse) -> Result<(), Error> {
    generations.put(&response.to_stored(request.method_str())).await
}
