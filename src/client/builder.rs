//! Builder for configuring client instances

use std::sync::Arc;
use std::time::Duration;

use super::cached::{CachedClient, DEFAULT_REQUEST_TIMEOUT, Inner};
use super::invalidation::{InvalidationRule, InvalidationTable};
use crate::cache::{CachePolicy, DEFAULT_MAX_ENTRIES, PendingRequests, PolicyTable, ResponseCache};
use crate::config::ClientConfig;
use crate::session::{NoSession, SessionProvider, StaticSession, UnauthorizedHook};
use crate::transport::{DEFAULT_BASE_URL, HttpTransport, Transport};
use crate::{DevSocialError, Result};

/// Endpoints reachable without a session unless configured otherwise.
pub const DEFAULT_PUBLIC_PREFIXES: &[&str] = &["/trending"];

/// Main entry point for creating clients.
pub struct DevSocial;

impl DevSocial {
    /// Create a new builder for configuring the client.
    pub fn builder() -> DevSocialBuilder {
        DevSocialBuilder::new()
    }
}

/// Builder for [`CachedClient`].
pub struct DevSocialBuilder {
    base_url: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    session: Option<Arc<dyn SessionProvider>>,
    on_unauthorized: Option<UnauthorizedHook>,
    policies: PolicyTable,
    invalidations: InvalidationTable,
    public_prefixes: Vec<String>,
    max_entries: u64,
    timeout: Duration,
}

impl DevSocialBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            transport: None,
            session: None,
            on_unauthorized: None,
            policies: PolicyTable::default(),
            invalidations: InvalidationTable::default(),
            public_prefixes: DEFAULT_PUBLIC_PREFIXES.iter().map(|p| p.to_string()).collect(),
            max_entries: DEFAULT_MAX_ENTRIES,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Apply a loaded [`ClientConfig`]. Later builder calls override it.
    pub fn config(mut self, config: &ClientConfig) -> Result<Self> {
        if let Some(ref url) = config.base_url {
            self.base_url = Some(url.clone());
        }
        self.timeout = config.request_timeout();
        self.max_entries = config.cache.max_entries;
        if let Some(policies) = config.policy_table()? {
            self.policies = policies;
        }
        if let Some(invalidations) = config.invalidation_table()? {
            self.invalidations = invalidations;
        }
        if let Some(ref public) = config.cache.public_endpoints {
            self.public_prefixes = public.clone();
        }
        Ok(self)
    }

    /// API base URL (default: `http://localhost:3000/api`).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Use a custom transport instead of HTTP. Overrides `base_url`.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sign requests with a fixed bearer token.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.session = Some(Arc::new(StaticSession::new(token)));
        self
    }

    /// Use a custom session provider.
    pub fn session(mut self, session: Arc<dyn SessionProvider>) -> Self {
        self.session = Some(session);
        self
    }

    /// Callback run after a protected endpoint answers 401.
    pub fn on_unauthorized<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_unauthorized = Some(Arc::new(hook));
        self
    }

    /// Replace the whole policy table.
    pub fn cache_policies(mut self, policies: PolicyTable) -> Self {
        self.policies = policies;
        self
    }

    /// Add a policy, replacing any existing one for the same prefix.
    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.policies.push(policy);
        self
    }

    /// Replace the whole invalidation table.
    pub fn invalidations(mut self, table: InvalidationTable) -> Self {
        self.invalidations = table;
        self
    }

    /// Add one invalidation rule.
    pub fn invalidation_rule(mut self, rule: InvalidationRule) -> Self {
        self.invalidations.push(rule);
        self
    }

    /// Mark a prefix as public: a 401 there is reported, not treated as a
    /// lost session.
    pub fn public_endpoint(mut self, prefix: impl Into<String>) -> Self {
        self.public_prefixes.push(prefix.into());
        self
    }

    /// Maximum number of cached responses (default: 1,000).
    pub fn max_entries(mut self, max: u64) -> Self {
        self.max_entries = max;
        self
    }

    /// Per-request deadline (default: 30 s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<CachedClient> {
        if self.timeout.is_zero() {
            return Err(DevSocialError::Configuration(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_entries == 0 {
            return Err(DevSocialError::Configuration(
                "max_entries must be greater than zero".to_string(),
            ));
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                let base_url = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
                reqwest::Url::parse(base_url).map_err(|e| {
                    DevSocialError::Configuration(format!("invalid base URL '{base_url}': {e}"))
                })?;
                Arc::new(HttpTransport::new(base_url)?)
            }
        };

        let session: Arc<dyn SessionProvider> = match self.session {
            Some(session) => session,
            None => Arc::new(NoSession),
        };

        Ok(CachedClient::from_inner(Inner {
            transport,
            session,
            on_unauthorized: self.on_unauthorized,
            policies: self.policies,
            invalidations: self.invalidations,
            public_prefixes: self.public_prefixes,
            cache: ResponseCache::with_max_entries(self.max_entries),
            pending: PendingRequests::new(),
            request_timeout: self.timeout,
        }))
    }
}

impl Default for DevSocialBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_defaults() {
        let client = DevSocial::builder().build().unwrap();
        assert_eq!(client.transport_name(), "http");
        assert_eq!(client.cache_len(), 0);
        assert!(client.policy_for("/trending").is_some());
    }

    #[test]
    fn rejects_invalid_base_url() {
        let err = DevSocial::builder().base_url("not a url").build().err().unwrap();
        assert!(matches!(err, DevSocialError::Configuration(_)));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = DevSocial::builder()
            .timeout(Duration::ZERO)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, DevSocialError::Configuration(_)));
    }

    #[test]
    fn added_policy_takes_part_in_lookup() {
        let client = DevSocial::builder()
            .cache_policy(CachePolicy::new("/notifications", Duration::from_secs(10)))
            .build()
            .unwrap();
        let policy = client.policy_for("/notifications/3").unwrap();
        assert_eq!(policy.ttl, Duration::from_secs(10));
    }
}
