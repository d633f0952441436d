use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use wormhole_core::{ClickMeta, ShortCode};

#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Resolves a short code to the URL to redirect to, recording the click.
    /// Returns `Err(NotFound)` if the code does not exist or has expired.
    async fn resolve(&self, code: &ShortCode, meta: ClickMeta) -> Result<String>;

    /// Forgets anything cached for `code`, e.g. after it was deleted.
    async fn invalidate(&self, code: &ShortCode);
}

#[async_trait]
impl<T: Redirector + ?Sized> Redirector for Arc<T> {
    async fn resolve(&self, code: &ShortCode, meta: ClickMeta) -> Result<String> {
        (**self).resolve(code, meta).await
    }

    async fn invalidate(&self, code: &ShortCode) {
        (**self).invalidate(code).await
    }
}
