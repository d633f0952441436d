use std::sync::Arc;

use crate::redirector::Redirector;
use crate::repository::Invalidate;
use crate::{RedirectorError, Result};
use async_trait::async_trait;
use jiff::Timestamp;
use tracing::{debug, trace, warn};
use wormhole_analytics::ClickRecorder;
use wormhole_core::{ClickEvent, ClickMeta, ShortCode};

/// Service for handling URL redirects.
///
/// Uses a read-only repository to fetch URL records, handles expiration
/// checks, and queues a click for every successful resolve.
#[derive(Debug)]
pub struct RedirectorService<R> {
    repository: Arc<R>,
    recorder: ClickRecorder,
}

impl<R> Clone for RedirectorService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            recorder: self.recorder.clone(),
        }
    }
}

impl<R: Invalidate> RedirectorService<R> {
    pub fn new(repository: R, recorder: ClickRecorder) -> Self {
        Self {
            repository: Arc::new(repository),
            recorder,
        }
    }

    pub fn recorder(&self) -> &ClickRecorder {
        &self.recorder
    }
}

#[async_trait]
impl<R: Invalidate> Redirector for RedirectorService<R> {
    async fn resolve(&self, code: &ShortCode, meta: ClickMeta) -> Result<String> {
        trace!(code = %code, "resolving short code");

        let now = Timestamp::now();
        let mut record = self.repository.get(code).await?;

        // A cached copy can outlive its expiry, and the code may have been
        // created again since. Drop it and ask the store once more.
        if record.as_ref().is_some_and(|r| r.is_expired_at(now)) {
            debug!(code = %code, "cached record has expired, re-reading store");
            self.repository.as_ref().invalidate(code).await?;
            record = self.repository.get(code).await?;
        }

        let Some(record) = record.filter(|r| !r.is_expired_at(now)) else {
            trace!(code = %code, "short code not found");
            return Err(RedirectorError::NotFound(code.to_string()));
        };

        self.recorder.record(ClickEvent::new(code.clone(), now, meta));

        debug!(code = %code, url = %record.original_url, "resolved short code");
        Ok(record.original_url)
    }

    async fn invalidate(&self, code: &ShortCode) {
        if let Err(err) = self.repository.as_ref().invalidate(code).await {
            warn!(code = %code, error = %err, "failed to invalidate cached record");
        }
    }
}
