use crate::error::{Result, StorageError};
use crate::link::{Link, NewLink};
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The read-side projection of a link used on the redirect path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The original URL that was shortened.
    pub original_url: String,
    pub created_at: Timestamp,
    /// When the record expires, if ever.
    pub expire_at: Option<Timestamp>,
}

impl UrlRecord {
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expire_at.is_some_and(|expire_at| now >= expire_at)
    }
}

/// A read-only view of a link store.
///
/// This trait provides only the read operations from [`Repository`],
/// allowing services like the redirector to have read-only access.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves the live link for a given short code.
    ///
    /// Returns `Err(NotFound)` if the code does not exist, was deleted,
    /// or has expired.
    async fn lookup(&self, code: &ShortCode) -> Result<Link>;

    /// Checks whether a short code is already taken.
    ///
    /// The answer is advisory: only [`Repository::create`] decides.
    async fn exists(&self, code: &ShortCode) -> Result<bool>;

    /// Retrieves the redirect projection for a short code.
    /// Returns `None` if the code does not resolve.
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        match self.lookup(code).await {
            Ok(link) => Ok(Some(link.into())),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
pub trait Repository: ReadRepository {
    /// Inserts a new link only if the code is free.
    /// Returns `Err(DuplicateCode)` if the code is already taken.
    async fn create(&self, code: &ShortCode, link: NewLink) -> Result<Link>;

    /// Atomically adds one click and stamps `last_click_at`.
    async fn increment_click(&self, code: &ShortCode, at: Timestamp) -> Result<()>;

    /// Deletes the link for a given short code.
    /// Returns `Err(NotFound)` if there was nothing to delete.
    async fn delete(&self, code: &ShortCode) -> Result<()>;
}

#[async_trait]
impl<T: ReadRepository + ?Sized> ReadRepository for Arc<T> {
    async fn lookup(&self, code: &ShortCode) -> Result<Link> {
        (**self).lookup(code).await
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        (**self).exists(code).await
    }

    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        (**self).get(code).await
    }
}

#[async_trait]
impl<T: Repository + ?Sized> Repository for Arc<T> {
    async fn create(&self, code: &ShortCode, link: NewLink) -> Result<Link> {
        (**self).create(code, link).await
    }

    async fn increment_click(&self, code: &ShortCode, at: Timestamp) -> Result<()> {
        (**self).increment_click(code, at).await
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        (**self).delete(code).await
    }
}
