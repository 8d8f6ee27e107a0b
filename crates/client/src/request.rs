//! Intercepted request descriptor.

use bytes::Bytes;
use edge_cache_core::Error;
use reqwest::Method;
use url::Url;

/// A request offered to the engine by a consumer.
#[derive(Debug, Clone)]
pub struct EdgeRequest {
    pub url: Url,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    /// Top-level page navigation rather than a sub-resource load.
    pub navigation: bool,
    pub body: Option<Bytes>,
}

impl EdgeRequest {
    /// A sub-resource GET for `url`.
    ///
    /// Any scheme is accepted here; the router decides what to intercept.
    pub fn get(url: &str) -> Result<Self, Error> {
        let mut url = Url::parse(url.trim()).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        url.set_fragment(None);
        Ok(Self { url, method: Method::GET, headers: Vec::new(), navigation: false, body: None })
    }

    /// A page navigation to `url`.
    pub fn navigate(url: &str) -> Result<Self, Error> {
        Ok(Self { navigation: true, ..Self::get(url)? })
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the method from its name, e.g. `"post"` or `"GET"`.
    pub fn with_method_name(self, method: &str) -> Result<Self, Error> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {method}")))?;
        Ok(self.with_method(method))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Method name used for the request identity.
    pub fn method_str(&self) -> &str {
        self.method.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_method_name() {
        let request = EdgeRequest::get("https://shop.example.com/api").unwrap().with_method_name("post").unwrap();
        assert_eq!(request.method_str(), "POST");
        assert!(EdgeRequest::get("https://shop.example.com/").unwrap().with_method_name("BAD METHOD").is_err());
    }

    #[test]
    fn test_get_strips_fragment() {
        let req = EdgeRequest::get("https://example.com/app.js#x").unwrap();
        assert_eq!(req.url.as_str(), "https://example.com/app.js");
        assert_eq!(req.method, Method::GET);
        assert!(!req.navigation);
    }

    #[test]
    fn test_navigate_flag() {
        let req = EdgeRequest::navigate("https://example.com/shop").unwrap();
        assert!(req.navigation);
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(EdgeRequest::get("not a url"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_builders() {
        let req = EdgeRequest::get("https://example.com/api")
            .unwrap()
            .with_method(Method::POST)
            .with_header("content-type", "application/json")
            .with_body("{}");
        assert_eq!(req.method_str(), "POST");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.body.as_deref(), Some(&b"{}"[..]));
    }
}
