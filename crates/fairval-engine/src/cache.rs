//! Read-through cache of provider results
//!
//! Entries are keyed by provider kind, listing code and as-of date. A cache
//! slot holds the shared future of the fetch, not just its output, so that
//! concurrent callers for the same key await one in-flight call instead of
//! issuing their own. Failed fetches are evicted once they settle.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cached::{Cached, TimedCache};
use chrono::NaiveDate;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::debug;

use crate::error::SourceError;
use crate::model::StockCode;
use crate::sources::{SourceKind, SourcePayload};

/// Cache key for provider results
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: SourceKind,
    pub code: StockCode,
    pub as_of: NaiveDate,
}

impl CacheKey {
    pub fn new(source: SourceKind, code: StockCode, as_of: NaiveDate) -> Self {
        Self {
            source,
            code,
            as_of,
        }
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<SourcePayload, SourceError>>>;

/// Thread-safe single-flight cache for provider results
#[derive(Clone)]
pub struct SourceCache {
    entries: Arc<Mutex<TimedCache<CacheKey, SharedFetch>>>,
}

impl SourceCache {
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(TimedCache::with_lifespan(ttl))),
        }
    }

    // Never held across an await.
    fn lock(&self) -> MutexGuard<'_, TimedCache<CacheKey, SharedFetch>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the cached result for `key`, joining an in-flight fetch if there
    /// is one, or start `fetcher` and share it with later callers.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: CacheKey,
        fetcher: F,
    ) -> Result<SourcePayload, SourceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SourcePayload, SourceError>> + Send + 'static,
    {
        let shared = {
            let mut entries = self.lock();
            let existing = entries.cache_get(&key).cloned();
            if let Some(existing) = existing {
                debug!("Cache hit for key: {:?}", key);
                existing
            } else {
                debug!("Cache miss for key: {:?}", key);
                let fresh = fetcher().boxed().shared();
                entries.flush();
                entries.cache_set(key.clone(), fresh.clone());
                fresh
            }
        };

        let outcome = shared.clone().await;

        if outcome.is_err() {
            let mut entries = self.lock();
            let same_fetch = entries
                .cache_get(&key)
                .is_some_and(|current| current.ptr_eq(&shared));
            if same_fetch {
                debug!("Evicting failed fetch for key: {:?}", key);
                entries.cache_remove(&key);
            }
        }

        outcome
    }

    /// Invalidate a specific cache entry
    pub fn invalidate(&self, key: &CacheKey) {
        self.lock().cache_remove(key);
    }

    /// Clear all cached entries
    pub fn clear(&self) {
        self.lock().cache_clear();
    }

    /// Get the number of live entries, dropping expired ones
    pub fn len(&self) -> usize {
        let mut entries = self.lock();
        entries.flush();
        entries.cache_size()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
