//! Telemetry metric name constants.
//!
//! Centralised metric names for client operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `devsocial_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `method`: HTTP method (e.g. "GET", "POST")
//! - `status`: request outcome, "ok" or "error"
//! - `freshness`: cache hit kind: "fresh" or "stale"

/// Total requests sent over the network.
///
/// Labels: `method`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "devsocial_requests_total";

/// Network request duration in seconds.
///
/// Labels: `method`.
pub const REQUEST_DURATION_SECONDS: &str = "devsocial_request_duration_seconds";

/// Total cache hits served without waiting on the network.
///
/// Labels: `freshness` ("fresh" | "stale").
pub const CACHE_HITS_TOTAL: &str = "devsocial_cache_hits_total";

/// Total cache misses for cacheable GETs.
pub const CACHE_MISSES_TOTAL: &str = "devsocial_cache_misses_total";

/// Total callers that joined an already in-flight request.
pub const DEDUP_JOINS_TOTAL: &str = "devsocial_dedup_joins_total";

/// Total background stale-while-revalidate refreshes.
///
/// Labels: `status` ("ok" | "error").
pub const REVALIDATIONS_TOTAL: &str = "devsocial_revalidations_total";

/// Total cache entries removed by invalidation.
pub const INVALIDATIONS_TOTAL: &str = "devsocial_invalidations_total";
