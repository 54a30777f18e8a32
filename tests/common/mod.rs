//! Shared test transport: counts calls, records requests, optional delay.
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use devsocial::{CachedClient, DevSocial, HttpRequest, HttpResponse, Method, Result, Transport};

type Responder = Box<dyn Fn(&HttpRequest, u32) -> Result<HttpResponse> + Send + Sync>;

/// In-memory backend. `respond` receives the request and the 1-based call
/// number.
pub struct MockTransport {
    calls: AtomicU32,
    requests: Mutex<Vec<HttpRequest>>,
    get_delay: Duration,
    respond: Responder,
}

impl MockTransport {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&HttpRequest, u32) -> Result<HttpResponse> + Send + Sync + 'static,
    {
        Self {
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            get_delay: Duration::ZERO,
            respond: Box::new(respond),
        }
    }

    /// Backend that answers every call with `{ success, data: { call } }`.
    pub fn versioned() -> Self {
        Self::new(|_, n| Ok(HttpResponse::json(200, &json!({ "success": true, "data": { "call": n } }))))
    }

    /// Delay applied to GET requests only.
    pub fn with_get_delay(mut self, delay: Duration) -> Self {
        self.get_delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of calls with the given method whose endpoint starts with `prefix`.
    pub fn calls_to(&self, method: &Method, prefix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.method == method && r.endpoint.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());
        if request.method == Method::GET && !self.get_delay.is_zero() {
            tokio::time::sleep(self.get_delay).await;
        }
        (self.respond)(&request, n)
    }
}

/// Client over `transport` with the default policy and invalidation tables.
pub fn client(transport: std::sync::Arc<MockTransport>) -> CachedClient {
    DevSocial::builder()
        .transport(transport)
        .build()
        .expect("client should build")
}

/// Wait until every in-flight request (including background refreshes) has
/// settled.
pub async fn settle(client: &CachedClient) {
    for _ in 0..1_000 {
        if client.pending_len() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("requests still in flight");
}

/// `call` field of a versioned response payload.
pub fn call_of(data: &Option<serde_json::Value>) -> u64 {
    data.as_ref()
        .and_then(|d| d.get("call"))
        .and_then(|c| c.as_u64())
        .expect("payload should carry a call number")
}
