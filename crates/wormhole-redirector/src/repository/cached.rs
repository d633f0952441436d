use super::Invalidate;
use async_trait::async_trait;
use tracing::{debug, trace, warn};
use wormhole_core::{
    CacheError, Link, ReadRepository, ShortCode, StorageError, UrlCache, UrlRecord,
};

/// Type alias for repository results.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A read-only repository decorator that adds caching.
///
/// This implementation composes any [`ReadRepository`] with any [`UrlCache`]
/// implementation to provide transparent caching of the redirect projection.
/// [`ReadRepository::get`] checks the cache first, falling back to the inner
/// repository, and caches what it finds. `lookup` always reads the inner
/// repository because it returns live counters.
#[derive(Debug, Clone)]
pub struct CachedRepository<R, C> {
    inner: R,
    cache: C,
}

impl<R: ReadRepository, C: UrlCache> CachedRepository<R, C> {
    pub fn new(inner: R, cache: C) -> Self {
        Self { inner, cache }
    }

    /// Returns a reference to the inner repository.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Returns a reference to the cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }
}

fn unwrap_loader(err: CacheError) -> StorageError {
    match err {
        CacheError::Loader(inner) => *inner,
        other => StorageError::Cache(other),
    }
}

#[async_trait]
impl<R: ReadRepository, C: UrlCache> ReadRepository for CachedRepository<R, C> {
    async fn lookup(&self, code: &ShortCode) -> Result<Link> {
        self.inner.lookup(code).await
    }

    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        trace!(code = %code, "Fetching URL record with cache");

        self.cache
            .get_or_compute(code, move |c| {
                let code = c.clone();
                async move {
                    trace!(code = %code, "Cache miss, fetching from inner repository");
                    self.inner
                        .get(&code)
                        .await
                        .map_err(|e| CacheError::Loader(Box::new(e)))
                }
            })
            .await
            .map_err(unwrap_loader)
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        match self.cache.get_url(code).await {
            Ok(Some(_)) => {
                debug!(code = %code, "Cache hit indicates code exists");
                return Ok(true);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(code = %code, error = %e, "Cache error on existence check, falling back to inner repository");
            }
        }

        self.inner.exists(code).await
    }
}

#[async_trait]
impl<R: ReadRepository, C: UrlCache> Invalidate for CachedRepository<R, C> {
    async fn invalidate(&self, code: &ShortCode) -> Result<()> {
        trace!(code = %code, "Invalidating cache entry");
        self.cache.del(code).await.map_err(StorageError::Cache)
    }
}
