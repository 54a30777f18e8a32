//! Outbound HTTP transport.
//!
//! The cache layer talks to the backend through the [`Transport`] trait so it
//! can be exercised without a network. [`HttpTransport`] is the reqwest-backed
//! implementation used in production.

mod http;

pub use http::{DEFAULT_BASE_URL, HttpTransport};

use async_trait::async_trait;

use crate::Result;
use crate::types::{Method, RequestBody, RequestOptions};

/// A fully resolved request, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path (and query) relative to the backend base URL, e.g. `/posts?page=1`.
    pub endpoint: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn new(endpoint: &str, options: &RequestOptions) -> Self {
        Self {
            method: options.method.clone(),
            endpoint: endpoint.to_string(),
            headers: options.headers.clone(),
            body: options.body.clone(),
        }
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }
}

/// Raw response as received from the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// JSON response with the given status.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string()).with_header("content-type", "application/json")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Sends requests to the backend.
///
/// Implementations report transport failures (connection refused, TLS, body
/// read errors) as [`DevSocialError::Http`](crate::DevSocialError::Http) and
/// return every HTTP status, including errors, as an [`HttpResponse`].
/// Status interpretation belongs to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logging/debugging.
    fn name(&self) -> &str;

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}
