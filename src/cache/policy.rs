//! Per-endpoint cache policies.
//!
//! A [`PolicyTable`] is an ordered list of [`CachePolicy`] entries, each
//! bound to an endpoint prefix. Lookup picks the longest matching prefix;
//! when two configured prefixes have the same length the earlier one wins.
//! Endpoints with no matching policy are never cached or deduplicated.

use std::time::Duration;

/// How long responses under one endpoint prefix stay usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    /// Endpoint prefix, matched on path-segment boundaries.
    pub prefix: String,
    /// Maximum age of a fresh entry. Zero disables caching for the prefix.
    pub ttl: Duration,
    /// Serve expired entries immediately while refreshing in the background.
    pub stale_while_revalidate: bool,
}

/// Classification of a cached entry's age under a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Younger than the TTL: serve without touching the network.
    Fresh,
    /// Expired, but the policy allows serving it while revalidating.
    Stale,
    /// Expired and must be refetched before answering.
    Expired,
}

impl CachePolicy {
    pub fn new(prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            ttl,
            stale_while_revalidate: false,
        }
    }

    /// Policy that explicitly opts a prefix out of caching.
    pub fn bypass(prefix: impl Into<String>) -> Self {
        Self::new(prefix, Duration::ZERO)
    }

    pub fn stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = enabled;
        self
    }

    pub fn is_bypass(&self) -> bool {
        self.ttl.is_zero()
    }

    pub fn matches(&self, endpoint: &str) -> bool {
        path_has_prefix(endpoint, &self.prefix)
    }

    /// Classify an entry of the given age.
    pub fn freshness(&self, age: Duration) -> Freshness {
        if age < self.ttl {
            Freshness::Fresh
        } else if self.stale_while_revalidate {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }
}

/// Whether `endpoint` falls under `prefix`, respecting path-segment boundaries.
///
/// `/posts` matches `/posts`, `/posts/42` and `/posts?page=2`, but not
/// `/postscript`. A prefix of `/` matches every endpoint.
pub fn path_has_prefix(endpoint: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    match endpoint.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
        None => false,
    }
}

/// Ordered set of cache policies, fixed once the client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    policies: Vec<CachePolicy>,
}

impl PolicyTable {
    pub fn new(policies: Vec<CachePolicy>) -> Self {
        Self { policies }
    }

    /// A table that caches nothing.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Find the policy governing `endpoint` (longest prefix wins).
    pub fn lookup(&self, endpoint: &str) -> Option<&CachePolicy> {
        let mut best: Option<&CachePolicy> = None;
        for policy in self.policies.iter().filter(|p| p.matches(endpoint)) {
            let longer = best.is_none_or(|b| {
                policy.prefix.trim_end_matches('/').len() > b.prefix.trim_end_matches('/').len()
            });
            if longer {
                best = Some(policy);
            }
        }
        best
    }

    /// Add a policy, replacing any existing one for the same prefix.
    pub fn push(&mut self, policy: CachePolicy) {
        let prefix = policy.prefix.trim_end_matches('/');
        match self
            .policies
            .iter_mut()
            .find(|p| p.prefix.trim_end_matches('/') == prefix)
        {
            Some(existing) => *existing = policy,
            None => self.policies.push(policy),
        }
    }

    pub fn policies(&self) -> &[CachePolicy] {
        &self.policies
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Default for PolicyTable {
    /// Policies for the DevSocial backend.
    fn default() -> Self {
        Self::new(vec![
            CachePolicy::new("/users/profile", Duration::from_secs(120)),
            CachePolicy::new("/users", Duration::from_secs(300)),
            CachePolicy::new("/trending", Duration::from_secs(60)).stale_while_revalidate(true),
            CachePolicy::new("/leaderboard", Duration::from_secs(180))
                .stale_while_revalidate(true),
            CachePolicy::new("/dashboard", Duration::from_secs(60)),
            CachePolicy::new("/posts", Duration::from_secs(30)),
        ])
    }
}
