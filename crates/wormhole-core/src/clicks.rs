use crate::error::Result;
use crate::link::{ClickEvent, ReferrerCount};
use crate::repository::Repository;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::sync::Arc;

/// Append-only storage for click events.
///
/// Events for the same short code are kept in the order they were appended.
#[async_trait]
pub trait ClickLog: Send + Sync + 'static {
    /// Appends a batch of events, preserving their order.
    async fn append(&self, events: Vec<ClickEvent>) -> Result<()>;

    /// Returns up to `limit` events for `code`, newest first.
    async fn recent(&self, code: &ShortCode, limit: usize) -> Result<Vec<ClickEvent>>;

    /// Returns up to `limit` referrers for `code` by descending frequency.
    ///
    /// Clicks without a referrer are not counted.
    async fn top_referrers(&self, code: &ShortCode, limit: usize) -> Result<Vec<ReferrerCount>>;
}

#[async_trait]
impl<T: ClickLog + ?Sized> ClickLog for Arc<T> {
    async fn append(&self, events: Vec<ClickEvent>) -> Result<()> {
        (**self).append(events).await
    }

    async fn recent(&self, code: &ShortCode, limit: usize) -> Result<Vec<ClickEvent>> {
        (**self).recent(code, limit).await
    }

    async fn top_referrers(&self, code: &ShortCode, limit: usize) -> Result<Vec<ReferrerCount>> {
        (**self).top_referrers(code, limit).await
    }
}

/// A backend that keeps both links and their click history.
pub trait LinkStore: Repository + ClickLog {}

impl<T: Repository + ClickLog + ?Sized> LinkStore for T {}
