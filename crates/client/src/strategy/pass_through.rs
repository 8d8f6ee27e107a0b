//! Pass-Through: the degraded strategy of the minimal install.

use edge_cache_core::Error;

use super::{Served, StrategyContext};
use crate::fetch::CacheMode;
use crate::request::EdgeRequest;

/// Forward to the network; the store is neither read nor written.
pub async fn execute(ctx: &StrategyContext, request: &EdgeRequest) -> Result<Served, Error> {
    ctx.network.fetch(request, CacheMode::Default).await.map(Served::network)
}
