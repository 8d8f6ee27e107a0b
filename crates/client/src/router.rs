//! Strategy Router.
//!
//! Classifies an intercepted request into exactly one outcome, in order:
//!
//! 1. non-http(s) scheme → bypass
//! 2. origin is neither a deployed application origin nor a development
//!    host → bypass
//! 3. navigation, document suffix, or the root path → document strategy
//! 4. anything else → asset strategy
//!
//! The strategy table is configuration, so the "everything network-first"
//! and the "assets stale-while-revalidate" policies share the same executors.

use edge_cache_core::{AppConfig, ConfigError, FetchStrategy};
use serde::Serialize;
use url::{Origin, Url};

use crate::request::EdgeRequest;

/// Why a request was not intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassReason {
    /// Scheme other than http/https.
    Scheme,
    /// Origin outside the application's own origins.
    ForeignOrigin,
    /// The engine does not control requests yet.
    NotActive,
}

/// Result of routing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Bypass(BypassReason),
    Handle(FetchStrategy),
}

/// Which origins the engine intercepts.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    app_origins: Vec<Origin>,
    dev_hosts: Vec<String>,
}

impl OriginPolicy {
    pub fn new(app_origins: &[Url], dev_hosts: &[String]) -> Self {
        Self {
            app_origins: app_origins.iter().map(Url::origin).collect(),
            dev_hosts: dev_hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
        }
    }

    /// Exact origin match for deployed origins; host match on any port for
    /// development hosts.
    pub fn allows(&self, url: &Url) -> bool {
        if self.app_origins.contains(&url.origin()) {
            return true;
        }
        url.host_str()
            .is_some_and(|host| self.dev_hosts.iter().any(|dev| dev.eq_ignore_ascii_case(host)))
    }
}

/// Classification table for intercepted requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyTable {
    pub document_strategy: FetchStrategy,
    pub asset_strategy: FetchStrategy,
    pub document_suffixes: Vec<String>,
}

impl StrategyTable {
    /// Every intercepted request goes to the network first.
    pub fn network_first() -> Self {
        Self {
            document_strategy: FetchStrategy::NetworkFirst,
            asset_strategy: FetchStrategy::NetworkFirst,
            document_suffixes: vec![".html".into()],
        }
    }

    /// Documents go to the network first; assets are served from the store
    /// and refreshed in the background.
    pub fn stale_while_revalidate() -> Self {
        Self { asset_strategy: FetchStrategy::StaleWhileRevalidate, ..Self::network_first() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            document_strategy: config.document_strategy,
            asset_strategy: config.asset_strategy,
            document_suffixes: config.document_suffixes.clone(),
        }
    }

    fn is_document(&self, request: &EdgeRequest) -> bool {
        let path = request.url.path();
        request.navigation
            || path == "/"
            || self.document_suffixes.iter().any(|suffix| ends_with_ignore_case(path, suffix))
    }

    pub fn classify(&self, request: &EdgeRequest) -> FetchStrategy {
        if self.is_document(request) { self.document_strategy } else { self.asset_strategy }
    }
}

fn ends_with_ignore_case(path: &str, suffix: &str) -> bool {
    path.len()
        .checked_sub(suffix.len())
        .and_then(|start| path.get(start..))
        .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}

/// Picks a strategy for each request.
#[derive(Debug, Clone)]
pub struct Router {
    origins: OriginPolicy,
    table: StrategyTable,
}

impl Router {
    pub fn new(origins: OriginPolicy, table: StrategyTable) -> Self {
        Self { origins, table }
    }

    /// Build from application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let origins = OriginPolicy::new(&config.origin_urls()?, &config.dev_hosts);
        Ok(Self::new(origins, StrategyTable::from_config(config)))
    }

    pub fn table(&self) -> &StrategyTable {
        &self.table
    }

    pub fn route(&self, request: &EdgeRequest) -> Route {
        if !matches!(request.url.scheme(), "http" | "https") {
            return Route::Bypass(BypassReason::Scheme);
        }
        if !self.origins.allows(&request.url) {
            return Route::Bypass(BypassReason::ForeignOrigin);
        }
        Route::Handle(self.table.classify(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(table: StrategyTable) -> Router {
        let origins = OriginPolicy::new(
            &[Url::parse("https://shop.example.com").unwrap()],
            &["localhost".to_string(), "127.0.0.1".to_string()],
        );
        Router::new(origins, table)
    }

    fn get(url: &str) -> EdgeRequest {
        EdgeRequest::get(url).unwrap()
    }

    #[test]
    fn test_non_http_scheme_bypasses() {
        let r = router(StrategyTable::stale_while_revalidate());
        assert_eq!(r.route(&get("chrome-extension://abc/page.html")), Route::Bypass(BypassReason::Scheme));
        assert_eq!(r.route(&get("data:text/plain,hi")), Route::Bypass(BypassReason::Scheme));
    }

    #[test]
    fn test_foreign_origin_bypasses() {
        let r = router(StrategyTable::stale_while_revalidate());
        assert_eq!(
            r.route(&get("https://cdn.jsdelivr.net/npm/lib.js")),
            Route::Bypass(BypassReason::ForeignOrigin)
        );
        // http is a different origin than the deployed https one
        assert_eq!(r.route(&get("http://shop.example.com/")), Route::Bypass(BypassReason::ForeignOrigin));
    }

    #[test]
    fn test_lookalike_host_bypasses() {
        let r = router(StrategyTable::stale_while_revalidate());
        assert_eq!(
            r.route(&get("https://shop.example.com.attacker.net/app.js")),
            Route::Bypass(BypassReason::ForeignOrigin)
        );
        assert_eq!(r.route(&get("https://localhost.attacker.net/")), Route::Bypass(BypassReason::ForeignOrigin));
    }

    #[test]
    fn test_dev_host_any_port() {
        let r = router(StrategyTable::stale_while_revalidate());
        assert_eq!(r.route(&get("http://localhost:5173/app.js")), Route::Handle(FetchStrategy::StaleWhileRevalidate));
        assert_eq!(r.route(&get("http://127.0.0.1:8000/")), Route::Handle(FetchStrategy::NetworkFirst));
    }

    #[test]
    fn test_documents_go_network_first() {
        let r = router(StrategyTable::stale_while_revalidate());
        assert_eq!(r.route(&get("https://shop.example.com/")), Route::Handle(FetchStrategy::NetworkFirst));
        assert_eq!(r.route(&get("https://shop.example.com/about.html")), Route::Handle(FetchStrategy::NetworkFirst));
        let nav = EdgeRequest::navigate("https://shop.example.com/products/42").unwrap();
        assert_eq!(r.route(&nav), Route::Handle(FetchStrategy::NetworkFirst));
    }

    #[test]
    fn test_document_suffix_ignores_case() {
        let r = router(StrategyTable::stale_while_revalidate());
        assert_eq!(r.route(&get("https://shop.example.com/INDEX.HTML")), Route::Handle(FetchStrategy::NetworkFirst));
        assert_eq!(
            r.route(&get("https://shop.example.com/Docs/Guide.Html")),
            Route::Handle(FetchStrategy::NetworkFirst)
        );
        assert_eq!(
            r.route(&get("https://shop.example.com/html")),
            Route::Handle(FetchStrategy::StaleWhileRevalidate)
        );
    }

    #[test]
    fn test_assets_follow_table() {
        let swr = router(StrategyTable::stale_while_revalidate());
        assert_eq!(
            swr.route(&get("https://shop.example.com/assets/main.css")),
            Route::Handle(FetchStrategy::StaleWhileRevalidate)
        );

        let nf = router(StrategyTable::network_first());
        assert_eq!(
            nf.route(&get("https://shop.example.com/assets/main.css")),
            Route::Handle(FetchStrategy::NetworkFirst)
        );
    }

    #[test]
    fn test_query_does_not_change_document_classification() {
        let r = router(StrategyTable::stale_while_revalidate());
        assert_eq!(
            r.route(&get("https://shop.example.com/index.html?v=1712345678")),
            Route::Handle(FetchStrategy::NetworkFirst)
        );
        assert_eq!(
            r.route(&get("https://shop.example.com/sw.js?v=1712345678")),
            Route::Handle(FetchStrategy::StaleWhileRevalidate)
        );
    }

    #[test]
    fn test_from_config() {
        let config = AppConfig {
            cache_tag: "v1".into(),
            app_origins: vec!["https://shop.example.com".into()],
            asset_strategy: FetchStrategy::PassThrough,
            document_suffixes: vec![".html".into(), ".htm".into()],
            ..Default::default()
        };
        let r = Router::from_config(&config).unwrap();
        assert_eq!(r.route(&get("https://shop.example.com/old.htm")), Route::Handle(FetchStrategy::NetworkFirst));
        assert_eq!(r.route(&get("https://shop.example.com/a.png")), Route::Handle(FetchStrategy::PassThrough));
    }
}
