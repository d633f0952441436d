//! Read-side repositories for the redirect path.

pub mod cached;

pub use cached::CachedRepository;

use async_trait::async_trait;
use std::sync::Arc;
use wormhole_core::{ReadRepository, ShortCode, StorageError};

/// A read repository that may hold copies of records it has served.
#[async_trait]
pub trait Invalidate: ReadRepository {
    /// Drops any copy of `code` so the next read goes to the store.
    async fn invalidate(&self, code: &ShortCode) -> Result<(), StorageError>;
}

/// A shared store serves every read fresh, so there is nothing to drop.
#[async_trait]
impl<T: ReadRepository + ?Sized> Invalidate for Arc<T> {
    async fn invalidate(&self, _code: &ShortCode) -> Result<(), StorageError> {
        Ok(())
    }
}
