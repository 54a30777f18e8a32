//! CachedClient - caching, deduplicating front for the DevSocial API
//!
//! # Read path (GET)
//!
//! 1. Derive the [`CacheKey`] and look up the [`CachePolicy`]. Endpoints with
//!    no policy (or a bypass policy) go straight to the network.
//! 2. A fresh entry is returned without touching the network.
//! 3. A stale entry under a stale-while-revalidate policy is returned
//!    immediately while a background refresh runs.
//! 4. Anything else joins (or starts) the single in-flight request for the
//!    key and waits for it.
//!
//! Every network call for a cacheable GET runs as its own tokio task. The
//! task stores the result and deregisters itself from [`PendingRequests`]
//! whether or not anyone is still waiting, so a dropped caller never leaves
//! its key stuck.
//!
//! # Write path
//!
//! Other methods always hit the network. After a successful POST, PUT, PATCH
//! or DELETE, every prefix the [`InvalidationTable`] lists for the call is
//! purged from the cache, and matching in-flight reads are detached so their
//! (pre-mutation) results are never stored.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::invalidation::InvalidationTable;
use crate::cache::{
    CacheEntry, CacheKey, CachePolicy, Flight, Freshness, PendingRequests, PolicyTable,
    ResponseCache, path_has_prefix,
};
use crate::session::{SessionProvider, UnauthorizedHook};
use crate::telemetry;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::types::{ApiResponse, ErrorBody, RequestOptions};
use crate::{DevSocialError, Result, SocialApi};

/// Default deadline for a single network request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// API client with a response cache and single-flight request deduplication.
///
/// Cheap to clone; clones share one cache and one pending-request registry.
/// Build one per process (or per signed-in user) with
/// [`DevSocial::builder()`](crate::DevSocial::builder).
#[derive(Clone)]
pub struct CachedClient {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) session: Arc<dyn SessionProvider>,
    pub(crate) on_unauthorized: Option<UnauthorizedHook>,
    pub(crate) policies: PolicyTable,
    pub(crate) invalidations: InvalidationTable,
    pub(crate) public_prefixes: Vec<String>,
    pub(crate) cache: ResponseCache,
    pub(crate) pending: PendingRequests,
    pub(crate) request_timeout: Duration,
}

impl CachedClient {
    pub(crate) fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Send a request through the cache.
    ///
    /// `endpoint` is a path relative to the API base URL and must start with
    /// `/` (e.g. `/posts?page=2`).
    pub async fn request(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse<Value>> {
        if !endpoint.starts_with('/') {
            return Err(DevSocialError::InvalidInput(format!(
                "endpoint must start with '/': {endpoint}"
            )));
        }
        if options.is_read() {
            self.read(endpoint, options).await
        } else {
            self.mutate(endpoint, options).await
        }
    }

    /// Purge cached entries under `prefix` and detach matching in-flight reads.
    ///
    /// Returns the number of cache entries removed.
    pub fn invalidate(&self, prefix: &str) -> usize {
        self.inner.invalidate(prefix)
    }

    /// Drop every cached entry and detach all in-flight reads.
    pub fn clear(&self) {
        let detached = self.inner.pending.detach_matching(|_| true);
        self.inner.cache.clear();
        debug!(detached, "response cache cleared");
    }

    /// Number of cached entries.
    pub fn cache_len(&self) -> u64 {
        self.inner.cache.len()
    }

    /// Number of GET requests currently in flight.
    pub fn pending_len(&self) -> usize {
        self.inner.pending.len()
    }

    /// Policy governing `endpoint`, if any.
    pub fn policy_for(&self, endpoint: &str) -> Option<&CachePolicy> {
        self.inner.policies.lookup(endpoint)
    }

    /// Name of the underlying transport.
    pub fn transport_name(&self) -> &str {
        self.inner.transport.name()
    }

    async fn read(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse<Value>> {
        let policy = match self.inner.policies.lookup(endpoint) {
            Some(policy) if !policy.is_bypass() => policy,
            _ => {
                debug!(endpoint, "no cache policy, fetching directly");
                let entry = self.inner.fetch_entry(endpoint, &options, None).await?;
                return Ok(entry.data.clone());
            }
        };

        let key = CacheKey::for_request(endpoint, &options);
        let cached = self.inner.cache.get(&key);

        if let Some(ref entry) = cached {
            match policy.freshness(entry.age()) {
                Freshness::Fresh => {
                    metrics::counter!(telemetry::CACHE_HITS_TOTAL, "freshness" => "fresh")
                        .increment(1);
                    debug!(%key, "cache hit");
                    return Ok(entry.data.clone());
                }
                Freshness::Stale => {
                    metrics::counter!(telemetry::CACHE_HITS_TOTAL, "freshness" => "stale")
                        .increment(1);
                    let flight = self.flight(key.clone(), endpoint, options, cached.clone(), true);
                    if flight.started() {
                        debug!(%key, "serving stale entry, revalidating in background");
                    } else {
                        debug!(%key, "serving stale entry, revalidation already in flight");
                    }
                    return Ok(entry.data.clone());
                }
                Freshness::Expired => {}
            }
        }

        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        let flight = self.flight(key.clone(), endpoint, options, cached, false);
        if !flight.started() {
            metrics::counter!(telemetry::DEDUP_JOINS_TOTAL).increment(1);
            debug!(%key, "joining in-flight request");
        }
        let entry = flight.into_future().await?;
        Ok(entry.data.clone())
    }

    /// Join or start the single flight for `key`.
    fn flight(
        &self,
        key: CacheKey,
        endpoint: &str,
        options: RequestOptions,
        previous: Option<Arc<CacheEntry>>,
        background: bool,
    ) -> Flight {
        let inner = self.inner.clone();
        let endpoint = endpoint.to_string();
        let task_key = key.clone();
        self.inner.pending.join_or_start(&key, move |id| {
            let handle = tokio::spawn(async move {
                let _guard = FlightGuard {
                    inner: inner.clone(),
                    key: task_key.clone(),
                    id,
                };
                let result = inner
                    .fetch_entry(&endpoint, &options, previous.as_deref())
                    .await;
                match result {
                    Ok(ref entry) => {
                        let stored = entry.data.success
                            && inner.pending.complete(&task_key, id, || {
                                inner.cache.insert(task_key.clone(), entry.clone())
                            });
                        if background {
                            metrics::counter!(telemetry::REVALIDATIONS_TOTAL, "status" => "ok")
                                .increment(1);
                        }
                        debug!(key = %task_key, stored, "request settled");
                    }
                    Err(ref e) => {
                        if background {
                            metrics::counter!(telemetry::REVALIDATIONS_TOTAL, "status" => "error")
                                .increment(1);
                            warn!(
                                key = %task_key,
                                error = %e,
                                "background revalidation failed, keeping stale entry"
                            );
                        } else {
                            debug!(key = %task_key, error = %e, "request failed");
                        }
                    }
                }
                result
            });
            async move {
                handle.await.unwrap_or_else(|e| {
                    Err(DevSocialError::Internal(format!("request task failed: {e}")))
                })
            }
            .boxed()
        })
    }

    async fn mutate(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse<Value>> {
        debug!(endpoint, method = %options.method, "sending uncached request");
        let response = self
            .inner
            .send(endpoint, HttpRequest::new(endpoint, &options))
            .await?;
        let data = parse_body(&response)?;
        if data.success && options.is_mutation() {
            let prefixes = self
                .inner
                .invalidations
                .prefixes_for(&options.method, endpoint);
            let removed: usize = prefixes.iter().map(|p| self.inner.invalidate(p)).sum();
            debug!(endpoint, method = %options.method, removed, "mutation invalidated cache");
        }
        Ok(data)
    }
}

/// Deregisters a flight even if its task panics or is aborted.
struct FlightGuard {
    inner: Arc<Inner>,
    key: CacheKey,
    id: u64,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.inner.pending.complete(&self.key, self.id, || {});
    }
}

impl Inner {
    fn invalidate(&self, prefix: &str) -> usize {
        // Detach first: a flight committing in between is then purged below.
        let detached = self
            .pending
            .detach_matching(|key| path_has_prefix(key.endpoint(), prefix));
        let removed = self.cache.invalidate_prefix(prefix);
        metrics::counter!(telemetry::INVALIDATIONS_TOTAL).increment(removed as u64);
        if removed > 0 || detached > 0 {
            debug!(prefix, removed, detached, "invalidated");
        }
        removed
    }

    fn is_public(&self, endpoint: &str) -> bool {
        self.public_prefixes
            .iter()
            .any(|prefix| path_has_prefix(endpoint, prefix))
    }

    /// Fetch `endpoint` and build a cache entry from the response.
    ///
    /// When `previous` carries an etag it is sent as `If-None-Match`; a 304
    /// answer yields a fresh copy of `previous`.
    async fn fetch_entry(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        previous: Option<&CacheEntry>,
    ) -> Result<Arc<CacheEntry>> {
        let mut request = HttpRequest::new(endpoint, options);
        if let Some(etag) = previous.and_then(|p| p.etag.as_deref()) {
            request.set_header("If-None-Match", etag);
        }

        let response = self.send(endpoint, request).await?;

        if response.is_not_modified() {
            return match previous {
                Some(prev) => Ok(Arc::new(prev.revalidated())),
                None => Err(DevSocialError::InvalidResponse(
                    "304 Not Modified without a cached entry".to_string(),
                )),
            };
        }

        let data = parse_body(&response)?;
        let etag = response.header("etag").map(str::to_string);
        Ok(Arc::new(CacheEntry::new(data, etag)))
    }

    /// Send with a deadline covering the session lookup, the transport call
    /// and status handling.
    async fn send(&self, endpoint: &str, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method.to_string();
        let start = Instant::now();
        let outcome =
            tokio::time::timeout(self.request_timeout, self.dispatch(endpoint, request)).await;
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "method" => method.clone())
            .record(start.elapsed().as_secs_f64());

        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(DevSocialError::Timeout(self.request_timeout)),
        };

        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::REQUESTS_TOTAL, "method" => method, "status" => status)
            .increment(1);
        result
    }

    async fn dispatch(&self, endpoint: &str, mut request: HttpRequest) -> Result<HttpResponse> {
        if let Some(token) = self.session.bearer_token().await {
            request.set_header("Authorization", format!("Bearer {token}"));
        }
        let response = self.transport.send(request).await?;
        self.check_status(endpoint, response).await
    }

    async fn check_status(&self, endpoint: &str, response: HttpResponse) -> Result<HttpResponse> {
        if response.is_success() || response.is_not_modified() {
            return Ok(response);
        }

        let error = ErrorBody::parse(&response.body).unwrap_or_default();
        let message = if error.message.is_empty() {
            status_reason(response.status)
        } else {
            error.message
        };

        match response.status {
            401 if !self.is_public(endpoint) => {
                warn!(endpoint, "unauthorized on protected endpoint, clearing session");
                self.session.clear().await;
                if let Some(ref hook) = self.on_unauthorized {
                    hook(endpoint);
                }
                Err(DevSocialError::SessionExpired)
            }
            429 => {
                let retry_after = response
                    .header("retry-after")
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(DevSocialError::RateLimited {
                    message,
                    retry_after,
                })
            }
            status => Err(DevSocialError::Api {
                status,
                message,
                details: error.details,
            }),
        }
    }
}

/// Parse a 2xx body; an empty body (e.g. 204) counts as bare success.
fn parse_body(response: &HttpResponse) -> Result<ApiResponse<Value>> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ApiResponse {
            success: true,
            data: None,
            message: None,
        });
    }
    ApiResponse::from_body(&response.body)
}

fn status_reason(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}

#[async_trait]
impl SocialApi for CachedClient {
    async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse<Value>> {
        CachedClient::request(self, endpoint, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_success() {
        let resp = parse_body(&HttpResponse::new(204, "")).unwrap();
        assert!(resp.success);
        assert!(resp.data.is_none());
    }

    #[test]
    fn status_reason_falls_back_to_code() {
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(599), "HTTP 599");
    }
}
