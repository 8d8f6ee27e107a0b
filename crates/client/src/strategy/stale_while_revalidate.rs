//! Stale-While-Revalidate: answer from the store, refresh in the background.

use edge_cache_core::{Error, ResponseType};
use tokio::sync::oneshot;

use super::{Served, StrategyContext, lookup, store};
use crate::fetch::CacheMode;
use crate::request::EdgeRequest;

/// Serve the stored copy immediately while a detached fetch refreshes it.
///
/// The background fetch replaces the stored entry on a 200 `basic`
/// response whether or not the caller got the stored copy. A failed
/// background fetch is swallowed; the caller only sees it when nothing was
/// stored and it had to wait on that fetch.
pub async fn execute(ctx: &StrategyContext, request: &EdgeRequest) -> Result<Served, Error> {
    let (tx, rx) = oneshot::channel();

    let network = ctx.network.clone();
    let generations = ctx.generations.clone();
    let background = request.clone();
    ctx.tasks
        .spawn(format!("revalidate {}", request.url), async move {
            match network.fetch(&background, CacheMode::Default).await {
                Ok(response) => {
                    let _ = tx.send(Some(response.clone()));
                    if response.is_storable() && response.response_type == ResponseType::Basic {
                        store(&generations, &background, &response).await?;
                    }
                    Ok(())
                }
                Err(e) => {
                    tracing::debug!("background revalidation of {} failed: {}", background.url, e);
                    let _ = tx.send(None);
                    Ok(())
                }
            }
        })
        .await;

    if let Some(cached) = lookup(&ctx.generations, request).await {
        return Ok(Served::cache(cached));
    }

    match rx.await {
        Ok(Some(response)) => Ok(Served::network(response)),
        _ => Err(Error::Offline(format!("{} {}: no stored copy and network failed", request.method, request.url))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ResponseSource;
    use crate::tasks::BackgroundTasks;
    use crate::testing::{MockNetwork, manager};
    use std::time::Duration;

    const URL: &str = "https://shop.example.com/assets/main.css";

    async fn context(network: std::sync::Arc<MockNetwork>) -> StrategyContext {
        StrategyContext { network, generations: manager("v1").await, tasks: BackgroundTasks::new() }
    }

    #[tokio::test]
    async fn test_miss_waits_for_network_and_stores() {
        let network = MockNetwork::new();
        network.respond(URL, 200, "body{color:red}");
        let ctx = context(network).await;

        let served = execute(&ctx, &EdgeRequest::get(URL).unwrap()).await.unwrap();
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(&served.response.bytes[..], b"body{color:red}");

        ctx.tasks.wait_idle().await;
        let stored = ctx.generations.match_request("GET", URL).await.unwrap().unwrap();
        assert_eq!(stored.body, b"body{color:red}".to_vec());
    }

    #[tokio::test]
    async fn test_hit_returns_without_waiting_for_network() {
        let network = MockNetwork::new();
        network.respond(URL, 200, "old");
        let ctx = context(network.clone()).await;
        execute(&ctx, &EdgeRequest::get(URL).unwrap()).await.unwrap();
        ctx.tasks.wait_idle().await;

        network.respond(URL, 200, "new");
        let gate = network.gate(URL);

        let served = tokio::time::timeout(Duration::from_secs(5), execute(&ctx, &EdgeRequest::get(URL).unwrap()))
            .await
            .expect("stored copy must not wait on the network")
            .unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(&served.response.bytes[..], b"old");

        gate.open();
        ctx.tasks.wait_idle().await;

        let stored = ctx.generations.match_request("GET", URL).await.unwrap().unwrap();
        assert_eq!(stored.body, b"new".to_vec());
    }

    #[tokio::test]
    async fn test_hit_not_held_up_by_draining_tasks() {
        let network = MockNetwork::new();
        network.respond(URL, 200, "old");
        let ctx = context(network.clone()).await;
        execute(&ctx, &EdgeRequest::get(URL).unwrap()).await.unwrap();
        ctx.tasks.wait_idle().await;

        let gate = network.gate(URL);
        execute(&ctx, &EdgeRequest::get(URL).unwrap()).await.unwrap();

        let draining = tokio::spawn({
            let tasks = ctx.tasks.clone();
            async move { tasks.wait_idle().await }
        });
        tokio::task::yield_now().await;

        let served = tokio::time::timeout(Duration::from_millis(500), execute(&ctx, &EdgeRequest::get(URL).unwrap()))
            .await
            .expect("stored copy must not wait on pending revalidations")
            .unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(&served.response.bytes[..], b"old");

        gate.open();
        draining.await.unwrap();
        ctx.tasks.wait_idle().await;
    }

    #[tokio::test]
    async fn test_background_failure_is_swallowed() {
        let network = MockNetwork::new();
        network.respond(URL, 200, "kept");
        let ctx = context(network.clone()).await;
        execute(&ctx, &EdgeRequest::get(URL).unwrap()).await.unwrap();
        ctx.tasks.wait_idle().await;

        network.fail(URL);
        let served = execute(&ctx, &EdgeRequest::get(URL).unwrap()).await.unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
        ctx.tasks.wait_idle().await;

        let stored = ctx.generations.match_request("GET", URL).await.unwrap().unwrap();
        assert_eq!(stored.body, b"kept".to_vec());
    }

    #[tokio::test]
    async fn test_miss_and_offline_fails() {
        let network = MockNetwork::new();
        network.fail(URL);
        let ctx = context(network).await;

        let result = execute(&ctx, &EdgeRequest::get(URL).unwrap()).await;
        assert!(matches!(result, Err(Error::Offline(_))));
    }

    #[tokio::test]
    async fn test_non_200_is_returned_not_stored() {
        let network = MockNetwork::new();
        network.respond(URL, 503, "busy");
        let ctx = context(network).await;

        let served = execute(&ctx, &EdgeRequest::get(URL).unwrap()).await.unwrap();
        assert_eq!(served.response.status.as_u16(), 503);
        ctx.tasks.wait_idle().await;
        assert!(ctx.generations.match_request("GET", URL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cross_origin_response_not_stored() {
        let network = MockNetwork::new();
        network.respond_cross_origin(URL, 200, "redirected elsewhere");
        let ctx = context(network).await;

        let served = execute(&ctx, &EdgeRequest::get(URL).unwrap()).await.unwrap();
        assert_eq!(served.source, ResponseSource::Network);
        ctx.tasks.wait_idle().await;
        assert!(ctx.generations.match_request("GET", URL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_uses_default_transport_cache() {
        let network = MockNetwork::new();
        network.respond(URL, 200, "x");
        let ctx = context(network.clone()).await;

        execute(&ctx, &EdgeRequest::get(URL).unwrap()).await.unwrap();
        ctx.tasks.wait_idle().await;
        assert_eq!(network.calls(), vec![(URL.to_string(), CacheMode::Default)]);
    }
}
