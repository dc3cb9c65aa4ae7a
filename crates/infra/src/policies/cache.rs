//! Lookup result caching with moka
//!
//! Keeps resolved lookups in memory so repeated identifier lookups within the
//! TTL are answered without a network call.
//!
//! # Architecture
//!
//! - **Found entries**: the resolved value
//! - **Not-found markers**: confirmed misses, when `cache_not_found` is set
//! - **Error Handling**: errors are never cached
//! - **Keys**: [`PolicyContext::cache_key`], i.e. operation key + identifier
//!
//! Concurrent lookups for the same uncached key may each reach the network;
//! the first result to finish populates the cache.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tenantlink_core::{LookupOperation, LookupPolicy, LookupResult, PolicyContext};
use tenantlink_domain::CacheSettings;
use tracing::debug;

/// Cached outcome of a lookup
#[derive(Debug, Clone, PartialEq)]
pub enum CachedEntry<T> {
    /// The lookup resolved to a value
    Found(T),

    /// The lookup confirmed there is no such tenant
    NotFound,
}

impl<T> CachedEntry<T> {
    fn into_option(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }
}

/// In-memory cache policy for lookup results
pub struct CachePolicy<T> {
    cache: Cache<String, CachedEntry<T>>,
    ttl: Duration,
    max_capacity: u64,
    cache_not_found: bool,
}

impl<T> CachePolicy<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(settings: &CacheSettings) -> Self {
        let cache = Cache::builder()
            .time_to_live(settings.ttl())
            .max_capacity(settings.max_capacity)
            .build();

        let policy = Self {
            cache,
            ttl: settings.ttl(),
            max_capacity: settings.max_capacity,
            cache_not_found: settings.cache_not_found,
        };
        policy.log_config();
        policy
    }

    /// Log cache configuration
    pub fn log_config(&self) {
        tracing::info!(
            ttl_seconds = self.ttl.as_secs(),
            max_capacity = self.max_capacity,
            cache_not_found = self.cache_not_found,
            "Lookup cache configuration loaded"
        );
    }

    /// Cached entry for a by-identifier lookup, if any
    pub async fn get(&self, identifier: &str) -> Option<CachedEntry<T>> {
        self.cache.get(&PolicyContext::for_identifier(identifier).cache_key()).await
    }

    /// Drop the cached by-identifier lookup for `identifier`
    pub async fn invalidate(&self, identifier: &str) {
        let key = PolicyContext::for_identifier(identifier).cache_key();
        self.cache.invalidate(&key).await;
        debug!(key = %key, "Cache entry invalidated");
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        self.cache.invalidate_all();
        debug!("Lookup cache cleared");
    }

    /// Approximate number of cached entries
    ///
    /// Moka updates the count lazily; call [`Self::sync`] first for an exact
    /// value.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Apply pending cache maintenance (evictions, counters)
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl<T> fmt::Debug for CachePolicy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachePolicy")
            .field("ttl", &self.ttl)
            .field("max_capacity", &self.max_capacity)
            .field("cache_not_found", &self.cache_not_found)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T> LookupPolicy<T> for CachePolicy<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "cache"
    }

    async fn execute(
        &self,
        context: &PolicyContext,
        operation: LookupOperation<T>,
    ) -> LookupResult<T> {
        let key = context.cache_key();

        if let Some(entry) = self.cache.get(&key).await {
            debug!(key = %key, found = matches!(entry, CachedEntry::Found(_)), "Cache hit");
            return Ok(entry.into_option());
        }

        debug!(key = %key, "Cache miss");
        let result = operation().await;

        match &result {
            Ok(Some(value)) => {
                self.cache.insert(key, CachedEntry::Found(value.clone())).await;
            }
            Ok(None) if self.cache_not_found => {
                self.cache.insert(key, CachedEntry::NotFound).await;
            }
            Ok(None) => {}
            Err(e) => debug!(key = %key, error = %e, "Lookup failed, not caching"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tenantlink_core::lookup_operation;
    use tenantlink_domain::TenantStoreError;

    use super::*;

    fn settings() -> CacheSettings {
        CacheSettings { ttl_secs: 60, ..CacheSettings::default() }
    }

    fn counting(
        calls: &Arc<AtomicUsize>,
        result: LookupResult<String>,
    ) -> LookupOperation<String> {
        let calls = Arc::clone(calls);
        lookup_operation(move || {
            let calls = Arc::clone(&calls);
            let result = result.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                result
            }
        })
    }

    #[tokio::test]
    async fn found_results_are_served_from_cache() {
        let cache = CachePolicy::new(&settings());
        let calls = Arc::new(AtomicUsize::new(0));
        let context = PolicyContext::for_identifier("acme");

        for _ in 0..3 {
            let op = counting(&calls, Ok(Some("tenant-acme".to_string())));
            let value = cache.execute(&context, op).await.unwrap();
            assert_eq!(value.as_deref(), Some("tenant-acme"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("acme").await, Some(CachedEntry::Found("tenant-acme".to_string())));
    }

    #[tokio::test]
    async fn not_found_is_cached_when_enabled() {
        let cache = CachePolicy::<String>::new(&settings());
        let calls = Arc::new(AtomicUsize::new(0));
        let context = PolicyContext::for_identifier("unknown");

        assert_eq!(cache.execute(&context, counting(&calls, Ok(None))).await.unwrap(), None);
        assert_eq!(cache.execute(&context, counting(&calls, Ok(None))).await.unwrap(), None);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("unknown").await, Some(CachedEntry::NotFound));
    }

    #[tokio::test]
    async fn not_found_is_refetched_when_disabled() {
        let cache = CachePolicy::<String>::new(&CacheSettings {
            cache_not_found: false,
            ..settings()
        });
        let calls = Arc::new(AtomicUsize::new(0));
        let context = PolicyContext::for_identifier("unknown");

        cache.execute(&context, counting(&calls, Ok(None))).await.unwrap();
        cache.execute(&context, counting(&calls, Ok(None))).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_are_never_cached() {
        let cache = CachePolicy::<String>::new(&settings());
        let calls = Arc::new(AtomicUsize::new(0));
        let context = PolicyContext::for_identifier("flaky");

        let err = cache
            .execute(&context, counting(&calls, Err(TenantStoreError::network("reset"))))
            .await
            .unwrap_err();
        assert_eq!(err, TenantStoreError::network("reset"));

        let value = cache
            .execute(&context, counting(&calls, Ok(Some("tenant-flaky".to_string()))))
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("tenant-flaky"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_and_clear() {
        let cache = CachePolicy::new(&settings());
        let calls = Arc::new(AtomicUsize::new(0));

        for identifier in ["a", "b"] {
            let context = PolicyContext::for_identifier(identifier);
            cache.execute(&context, counting(&calls, Ok(Some(identifier.to_string())))).await.unwrap();
        }
        cache.sync().await;
        assert_eq!(cache.entry_count(), 2);

        cache.invalidate("a").await;
        assert_eq!(cache.get("a").await, None);
        assert!(cache.get("b").await.is_some());

        cache.clear();
        cache.sync().await;
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = CachePolicy::new(&CacheSettings { ttl_secs: 1, ..CacheSettings::default() });
        let calls = Arc::new(AtomicUsize::new(0));
        let context = PolicyContext::for_identifier("acme");

        cache.execute(&context, counting(&calls, Ok(Some("v1".to_string())))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let value =
            cache.execute(&context, counting(&calls, Ok(Some("v2".to_string())))).await.unwrap();

        assert_eq!(value.as_deref(), Some("v2"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
