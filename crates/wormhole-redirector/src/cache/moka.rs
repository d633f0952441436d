use async_trait::async_trait;
use moka::future::Cache;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};
use typed_builder::TypedBuilder;
use wormhole_core::{CacheError, ShortCode, UrlCache, UrlRecord};

/// Type alias for cache results.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Why a single-flight load produced nothing to cache.
#[derive(Debug, Clone)]
enum Miss {
    Absent,
    Failed(CacheError),
}

/// An in-memory cache implementation using Moka.
///
/// Only records that exist are stored. A miss is never remembered, so a code
/// created right after a failed lookup resolves on the next request.
#[derive(Debug, Clone)]
pub struct MokaUrlCache {
    cache: Cache<String, UrlRecord>,
}

impl MokaUrlCache {
    /// Creates a new Moka URL cache with a maximum capacity of 10,000 entries.
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_capacity).build();
        Self { cache }
    }

    /// Entries expire `ttl` after insertion.
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Returns a builder for creating a custom cache configuration.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfig::builder()
    }
}

impl Default for MokaUrlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlCache for MokaUrlCache {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let record = self.cache.get(code.as_str()).await;
        trace!(code = %code, hit = record.is_some(), "moka lookup");
        Ok(record)
    }

    async fn set_url(&self, code: &ShortCode, record: &UrlRecord) -> Result<()> {
        self.cache
            .insert(code.as_str().to_string(), record.clone())
            .await;
        debug!(code = %code, "cached record in moka");
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        self.cache.invalidate(code.as_str()).await;
        debug!(code = %code, "removed record from moka (if present)");
        Ok(())
    }

    async fn get_or_compute<F, Fut>(&self, code: &ShortCode, fetch: F) -> Result<Option<UrlRecord>>
    where
        F: FnOnce(&ShortCode) -> Fut + Send,
        Fut: Future<Output = Result<Option<UrlRecord>>> + Send,
    {
        // try_get_with coalesces concurrent loads of one key into a single fetch
        let loaded = self
            .cache
            .try_get_with(code.as_str().to_string(), async {
                trace!(code = %code, "cache miss, performing single-flight fetch");
                match fetch(code).await {
                    Ok(Some(record)) => Ok(record),
                    Ok(None) => Err(Miss::Absent),
                    Err(err) => Err(Miss::Failed(err)),
                }
            })
            .await;

        match loaded {
            Ok(record) => Ok(Some(record)),
            Err(miss) => match miss.as_ref() {
                Miss::Absent => Ok(None),
                Miss::Failed(err) => Err(err.clone()),
            },
        }
    }
}

/// Configuration for creating a MokaUrlCache with custom settings.
#[derive(Debug, TypedBuilder, Default)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold.
    #[builder(default, setter(strip_option))]
    max_capacity: Option<u64>,
    /// Time-to-live for cache entries.
    #[builder(default, setter(strip_option))]
    ttl: Option<Duration>,
    /// Time-to-idle for cache entries.
    #[builder(default, setter(strip_option))]
    tti: Option<Duration>,
}

impl From<CacheConfig> for MokaUrlCache {
    fn from(config: CacheConfig) -> Self {
        let mut builder = Cache::builder();

        if let Some(capacity) = config.max_capacity {
            builder = builder.max_capacity(capacity);
        }

        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }

        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }

        MokaUrlCache {
            cache: builder.build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::Timestamp;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn test_record(url: &str) -> UrlRecord {
        UrlRecord {
            original_url: url.to_string(),
            created_at: Timestamp::now(),
            expire_at: None,
        }
    }

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    #[tokio::test]
    async fn cache_get_set_and_del() {
        let cache = MokaUrlCache::new();
        let c = code("abc123");
        let record = test_record("https://example.com");

        assert!(cache.get_url(&c).await.unwrap().is_none());

        cache.set_url(&c, &record).await.unwrap();
        assert_eq!(cache.get_url(&c).await.unwrap(), Some(record));

        cache.del(&c).await.unwrap();
        assert!(cache.get_url(&c).await.unwrap().is_none());

        // deleting a missing key is fine
        cache.del(&c).await.unwrap();
    }

    #[tokio::test]
    async fn cache_with_ttl_expires() {
        let cache = MokaUrlCache::with_ttl(100, Duration::from_millis(50));
        let c = code("abc123");

        cache
            .set_url(&c, &test_record("https://example.com"))
            .await
            .unwrap();
        assert!(cache.get_url(&c).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.get_url(&c).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cache_builder_pattern() {
        let cache: MokaUrlCache = MokaUrlCache::builder()
            .max_capacity(1000)
            .ttl(Duration::from_secs(60))
            .tti(Duration::from_secs(30))
            .build()
            .into();

        let c = code("abc123");
        cache
            .set_url(&c, &test_record("https://example.com"))
            .await
            .unwrap();
        assert!(cache.get_url(&c).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn misses_are_not_remembered() {
        let cache = MokaUrlCache::new();
        let c = code("later");

        let first = cache.get_or_compute(&c, |_| async { Ok(None) }).await.unwrap();
        assert!(first.is_none());

        let second = cache
            .get_or_compute(&c, |_| async { Ok(Some(test_record("https://later.example"))) })
            .await
            .unwrap();
        assert_eq!(second.unwrap().original_url, "https://later.example");
        assert!(cache.get_url(&c).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn single_flight_prevents_concurrent_fetch() {
        let cache = MokaUrlCache::new();
        let fetch_count = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for _ in 0..10 {
            let cache = cache.clone();
            let count = fetch_count.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(&code("abc123"), |_code| async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        count.fetch_add(1, Ordering::SeqCst);
                        Ok(Some(test_record("https://example.com")))
                    })
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(fetch_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn single_flight_propagates_fetch_error() {
        let cache = MokaUrlCache::new();
        let c = code("abc123");

        let err = cache
            .get_or_compute(&c, |_code| async {
                Err(CacheError::Timeout("simulated timeout".to_string()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CacheError::Timeout(_)));
        assert!(cache.get_url(&c).await.unwrap().is_none());
    }
}
