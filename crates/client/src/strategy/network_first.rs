//! Network-First: always try a fresh fetch, fall back to the store offline.

use edge_cache_core::Error;

use super::{Served, StrategyContext, lookup, store};
use crate::fetch::CacheMode;
use crate::request::EdgeRequest;

/// Fetch with transport caching disabled.
///
/// - 200: stored under the request identity, then returned.
/// - any other status: returned untouched, not stored.
/// - network failure: the stored copy, or `Error::Offline` when there is none.
pub async fn execute(ctx: &StrategyContext, request: &EdgeRequest) -> Result<Served, Error> {
    match ctx.network.fetch(request, CacheMode::NoCache).await {
        Ok(response) => {
            if response.is_storable()
                && let Err(e) = store(&ctx.generations, request, &response).await
            {
                tracing::warn!(url = %request.url, error = %e, "failed to store network response");
            }
            Ok(Served::network(response))
        }
        Err(e) if e.is_network_failure() => {
            tracing::debug!("network failed for {}, trying cache: {}", request.url, e);
            match lookup(&ctx.generations, request).await {
                Some(cached) => Ok(Served::cache(cached)),
                None => Err(Error::Offline(format!("{} {}: {}", request.method, request.url, e))),
            }
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ResponseSource;
    use crate::tasks::BackgroundTasks;
    use crate::testing::{MockNetwork, manager};
    use reqwest::{Method, StatusCode};

    const URL: &str = "https://shop.example.com/index.html";

    async fn context(network: std::sync::Arc<MockNetwork>) -> StrategyContext {
        StrategyContext { network, generations: manager("v1").await, tasks: BackgroundTasks::new() }
    }

    #[tokio::test]
    async fn test_success_is_returned_and_stored() {
        let network = MockNetwork::new();
        network.respond(URL, 200, "<h1>fresh</h1>");
        let ctx = context(network.clone()).await;
        let request = EdgeRequest::navigate(URL).unwrap();

        let served = execute(&ctx, &request).await.unwrap();
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(&served.response.bytes[..], b"<h1>fresh</h1>");

        let stored = ctx.generations.match_request("GET", URL).await.unwrap().unwrap();
        let expected = served.response.to_stored("GET");
        assert_eq!(stored.url, expected.url);
        assert_eq!(stored.status, expected.status);
        assert_eq!(stored.headers, expected.headers);
        assert_eq!(stored.body, expected.body);
    }

    #[tokio::test]
    async fn test_forces_round_trip() {
        let network = MockNetwork::new();
        network.respond(URL, 200, "ok");
        let ctx = context(network.clone()).await;

        execute(&ctx, &EdgeRequest::get(URL).unwrap()).await.unwrap();
        assert_eq!(network.calls(), vec![(URL.to_string(), CacheMode::NoCache)]);
    }

    #[tokio::test]
    async fn test_non_200_is_returned_not_stored() {
        let network = MockNetwork::new();
        network.respond(URL, 404, "missing");
        let ctx = context(network.clone()).await;

        let served = execute(&ctx, &EdgeRequest::get(URL).unwrap()).await.unwrap();
        assert_eq!(served.response.status, StatusCode::NOT_FOUND);
        assert_eq!(served.source, ResponseSource::Network);
        assert!(ctx.generations.match_request("GET", URL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_200_does_not_replace_stored_copy() {
        let network = MockNetwork::new();
        network.respond(URL, 200, "good");
        let ctx = context(network.clone()).await;
        execute(&ctx, &EdgeRequest::get(URL).unwrap()).await.unwrap();

        network.respond(URL, 500, "oops");
        execute(&ctx, &EdgeRequest::get(URL).unwrap()).await.unwrap();

        let stored = ctx.generations.match_request("GET", URL).await.unwrap().unwrap();
        assert_eq!(stored.body, b"good".to_vec());
    }

    #[tokio::test]
    async fn test_offline_falls_back_to_store() {
        let network = MockNetwork::new();
        network.respond(URL, 200, "cached copy");
        let ctx = context(network.clone()).await;
        let first = execute(&ctx, &EdgeRequest::get(URL).unwrap()).await.unwrap();

        network.fail(URL);
        let served = execute(&ctx, &EdgeRequest::get(URL).unwrap()).await.unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.bytes, first.response.bytes);
        assert_eq!(served.response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_offline_without_store_fails() {
        let network = MockNetwork::new();
        network.fail(URL);
        let ctx = context(network).await;

        let result = execute(&ctx, &EdgeRequest::get(URL).unwrap()).await;
        assert!(matches!(result, Err(Error::Offline(_))));
    }

    #[tokio::test]
    async fn test_store_failure_does_not_fail_response() {
        let network = MockNetwork::new();
        network.respond(URL, 200, "posted");
        let ctx = context(network).await;
        let request = EdgeRequest::get(URL).unwrap().with_method(Method::POST);

        let served = execute(&ctx, &request).await.unwrap();
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(ctx.generations.entry_count().await.unwrap(), 0);
    }
}
