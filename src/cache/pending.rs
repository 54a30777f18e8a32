//! Registry of in-flight GET requests (single-flight).
//!
//! At most one network call per [`CacheKey`] is outstanding at a time. The
//! first caller for a key becomes the leader and registers a shared future;
//! later callers join it and observe the same result.
//!
//! Each registration carries a flight id. Completion and removal only act on
//! the registration they were issued for, so a flight that was detached by
//! invalidation can never overwrite or deregister a newer one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use super::{CacheEntry, CacheKey};
use crate::Result;

/// Future shared by every caller waiting on one network request.
pub type SharedFetch = Shared<BoxFuture<'static, Result<Arc<CacheEntry>>>>;

/// Outcome of [`PendingRequests::join_or_start`].
pub enum Flight {
    /// This caller started the request.
    Started(SharedFetch),
    /// A request for the same key was already in flight.
    Joined(SharedFetch),
}

impl Flight {
    pub fn started(&self) -> bool {
        matches!(self, Flight::Started(_))
    }

    pub fn into_future(self) -> SharedFetch {
        match self {
            Flight::Started(f) | Flight::Joined(f) => f,
        }
    }
}

struct Registration {
    id: u64,
    fetch: SharedFetch,
}

/// Map from cache key to the in-flight request for it.
#[derive(Default)]
pub struct PendingRequests {
    inflight: Mutex<HashMap<CacheKey, Registration>>,
    next_id: AtomicU64,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Registration>> {
        // The map holds no invariants a panicking holder could break halfway.
        self.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Join the flight for `key`, or start one with `start`.
    ///
    /// `start` receives the new flight id and runs under the registry lock,
    /// so it must only spawn work, never await it.
    pub fn join_or_start<F>(&self, key: &CacheKey, start: F) -> Flight
    where
        F: FnOnce(u64) -> BoxFuture<'static, Result<Arc<CacheEntry>>>,
    {
        let mut inflight = self.lock();
        if let Some(existing) = inflight.get(key) {
            return Flight::Joined(existing.fetch.clone());
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let fetch = start(id).shared();
        inflight.insert(
            key.clone(),
            Registration {
                id,
                fetch: fetch.clone(),
            },
        );
        Flight::Started(fetch)
    }

    /// Settle flight `id` for `key`.
    ///
    /// If the flight is still registered, `commit` runs under the lock and
    /// the registration is removed; returns `true`. A flight that was already
    /// detached or completed is left alone and `commit` is not called.
    pub fn complete<F: FnOnce()>(&self, key: &CacheKey, id: u64, commit: F) -> bool {
        let mut inflight = self.lock();
        match inflight.get(key) {
            Some(reg) if reg.id == id => {
                commit();
                inflight.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Detach every flight whose key satisfies `predicate`.
    ///
    /// Detached flights keep running for the callers already waiting on them,
    /// but their results are not committed and new callers start afresh.
    pub fn detach_matching<P: Fn(&CacheKey) -> bool>(&self, predicate: P) -> usize {
        let mut inflight = self.lock();
        let before = inflight.len();
        inflight.retain(|key, _| !predicate(key));
        before - inflight.len()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
