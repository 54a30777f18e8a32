//! Cache key derivation.

use std::fmt;

use crate::types::{Method, RequestBody, RequestOptions};

/// Identity of a request for caching and deduplication.
///
/// Built from `(method, endpoint, canonical body)`. Two requests that agree on
/// all three map to equal keys; a difference in any one of them yields a
/// different key. The endpoint is kept verbatim (query string included), so
/// prefix invalidation can match against it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: Method,
    endpoint: String,
    body: Option<String>,
}

impl CacheKey {
    pub fn new(method: &Method, endpoint: &str, body: Option<&RequestBody>) -> Self {
        Self {
            method: method.clone(),
            endpoint: endpoint.to_string(),
            body: body.map(RequestBody::canonical),
        }
    }

    /// Key for a call to `endpoint` with the given options.
    pub fn for_request(endpoint: &str, options: &RequestOptions) -> Self {
        Self::new(&options.method, endpoint, options.body.as_ref())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.endpoint)?;
        if let Some(ref body) = self.body {
            write!(f, " {body}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_body(v: serde_json::Value) -> RequestBody {
        RequestBody::Json(v)
    }

    #[test]
    fn key_deterministic() {
        let body = json_body(json!({ "q": "rust" }));
        let k1 = CacheKey::new(&Method::GET, "/posts", Some(&body));
        let k2 = CacheKey::new(&Method::GET, "/posts", Some(&body));
        assert_eq!(k1, k2);
    }

    #[test]
    fn key_differs_on_method() {
        let k1 = CacheKey::new(&Method::GET, "/posts", None);
        let k2 = CacheKey::new(&Method::POST, "/posts", None);
        assert_ne!(k1, k2);
    }

    #[test]
    fn key_differs_on_endpoint() {
        let k1 = CacheKey::new(&Method::GET, "/posts?page=1", None);
        let k2 = CacheKey::new(&Method::GET, "/posts?page=2", None);
        assert_ne!(k1, k2);
    }

    #[test]
    fn key_differs_on_body() {
        let a = json_body(json!({ "q": "rust" }));
        let b = json_body(json!({ "q": "go" }));
        let k1 = CacheKey::new(&Method::GET, "/search", Some(&a));
        let k2 = CacheKey::new(&Method::GET, "/search", Some(&b));
        let k3 = CacheKey::new(&Method::GET, "/search", None);
        assert_ne!(k1, k2);
        assert_ne!(k1, k3);
    }

    #[test]
    fn key_ignores_json_key_order() {
        let a = json_body(json!({ "a": 1, "b": 2 }));
        let b = json_body(json!({ "b": 2, "a": 1 }));
        assert_eq!(
            CacheKey::new(&Method::GET, "/x", Some(&a)),
            CacheKey::new(&Method::GET, "/x", Some(&b))
        );
    }

    #[test]
    fn display_includes_method_and_endpoint() {
        let key = CacheKey::new(&Method::GET, "/dashboard", None);
        assert_eq!(key.to_string(), "GET /dashboard");
    }
}
