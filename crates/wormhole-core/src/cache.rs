use crate::error::CacheError;
use crate::repository::UrlRecord;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::future::Future;

pub type Result<T> = std::result::Result<T, CacheError>;

/// A cache for URL records.
///
/// This trait provides a domain-specific caching abstraction for [`UrlRecord`]s,
/// using [`ShortCode`] as the key. Only records that exist are cached, so a
/// code created after a miss becomes visible on the next lookup.
#[async_trait]
pub trait UrlCache: Send + Sync + 'static {
    /// Get URL record from cache.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get_url(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Store URL record in cache.
    async fn set_url(&self, code: &ShortCode, record: &UrlRecord) -> Result<()>;

    /// Remove URL record from cache.
    ///
    /// It is not an error if the key does not exist.
    async fn del(&self, code: &ShortCode) -> Result<()>;

    /// Get URL record from cache, computing it if not present.
    async fn get_or_compute<F, Fut>(&self, code: &ShortCode, fetch: F) -> Result<Option<UrlRecord>>
    where
        F: FnOnce(&ShortCode) -> Fut + Send,
        Fut: Future<Output = Result<Option<UrlRecord>>> + Send,
    {
        match self.get_url(code).await? {
            Some(record) => Ok(Some(record)),
            None => {
                let record = fetch(code).await?;
                if let Some(ref value) = record {
                    self.set_url(code, value).await?;
                }
                Ok(record)
            }
        }
    }
}
