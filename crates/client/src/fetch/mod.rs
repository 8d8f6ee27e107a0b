//! HTTP fetch pipeline used by every strategy executor.
//!
//! ### Network seam
//! - Executors depend on the [`Network`] trait, not on reqwest, so the host
//!   (or a test) can substitute the transport.
//! - [`FetchClient`] is the reqwest-backed implementation.
//!
//! ### Status handling
//! - Any HTTP status is a response. Only transport failures and timeouts are
//!   errors.
//! - Max redirects: 5 (configurable)
//! - Bodies of any size come back whole; the store applies its own limit.
//!
//! ### Transport caching
//! - [`CacheMode::NoCache`] sends `Cache-Control: no-cache` and
//!   `Pragma: no-cache` so intermediaries must revalidate with the origin.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize};

use crate::request::EdgeRequest;
use edge_cache_core::{AppConfig, Error, ResponseType, StoredResponse};

/// Transport-level cache behaviour for a single fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Let intermediaries answer from their caches.
    Default,
    /// Force a true round-trip to the origin.
    NoCache,
}

/// Something that can perform a network fetch.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch `request`, returning whatever response the origin produced.
    async fn fetch(&self, request: &EdgeRequest, mode: CacheMode) -> Result<FetchResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "edge-cache/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "edge-cache/0.1".to_string(),
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// Response from a fetch operation or rebuilt from the store.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: reqwest::Url,
    /// The final URL after redirects
    pub final_url: reqwest::Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Same-origin or not
    pub response_type: ResponseType,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds (0 for stored responses)
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Status 200 exactly; the only status ever stored.
    pub fn is_storable(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Snapshot this response for the store under `method` + its request URL.
    pub fn to_stored(&self, method: &str) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();

        StoredResponse {
            url: self.url.to_string(),
            method: method.to_ascii_uppercase(),
            status: self.status.as_u16(),
            response_type: self.response_type,
            headers,
            body: self.bytes.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Rebuild a response from a stored snapshot.
    ///
    /// Header pairs that are no longer valid HTTP are dropped.
    pub fn from_stored(stored: &StoredResponse) -> Result<Self, Error> {
        let url = reqwest::Url::parse(&stored.url).map_err(|e| Error::CorruptEntry(format!("{}: {e}", stored.url)))?;
        let status = StatusCode::from_u16(stored.status)
            .map_err(|e| Error::CorruptEntry(format!("status {}: {e}", stored.status)))?;

        let mut headers = header::HeaderMap::new();
        for (name, value) in &stored.headers {
            match (header::HeaderName::from_bytes(name.as_bytes()), header::HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::debug!("dropping invalid stored header {}", name),
            }
        }

        Ok(Self {
            final_url: url.clone(),
            url,
            status,
            response_type: stored.response_type,
            headers,
            bytes: Bytes::from(stored.body.clone()),
            fetch_ms: 0,
        })
    }
}

/// reqwest-backed [`Network`].
pub struct FetchClient {
    http: Client,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::NetworkFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }
}

fn transport_error(context: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{context}: {err}"))
    } else {
        Error::NetworkFailed(format!("{context}: {err}"))
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &EdgeRequest, mode: CacheMode) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = request.url.clone();

        let mut builder = self.http.request(request.method.clone(), url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if mode == CacheMode::NoCache {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| transport_error(url.as_str(), e))?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(|e| transport_error(url.as_str(), e))?;

        let response_type =
            if final_url.origin() == url.origin() { ResponseType::Basic } else { ResponseType::Cors };

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url, final_url, status, response_type, headers, bytes, fetch_ms })
    }
}
