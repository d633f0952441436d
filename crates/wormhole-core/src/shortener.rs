use crate::error::ShortenerError;
use crate::link::Link;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use std::time::Duration;

type Result<T> = std::result::Result<T, ShortenerError>;

/// Expiration policy for a shortened URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpirationPolicy {
    /// The shortened URL never expires.
    Never,
    /// The shortened URL expires after a certain duration from now.
    AfterDuration(Duration),
    /// The shortened URL expires at a specific timestamp.
    AtTimestamp(Timestamp),
}

/// What happens to a short code once its link is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodeReusePolicy {
    /// The code is free again immediately; its click history is dropped.
    #[default]
    Reuse,
    /// The code is tombstoned and never handed out again.
    Retire,
}

/// Parameters for creating a shortened URL.
#[derive(Debug, Clone)]
pub struct ShortenParams {
    /// The original URL to be shortened.
    pub original_url: String,
    /// The expiration policy for the shortened URL.
    pub expiration: ExpirationPolicy,
    /// Optional custom alias, validated by the shortener.
    pub custom_alias: Option<String>,
}

impl ShortenParams {
    pub fn new(original_url: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            expiration: ExpirationPolicy::Never,
            custom_alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.custom_alias = Some(alias.into());
        self
    }

    pub fn with_expiration(mut self, expiration: ExpirationPolicy) -> Self {
        self.expiration = expiration;
        self
    }
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates a shortened URL and returns the stored link.
    async fn shorten(&self, params: ShortenParams) -> Result<Link>;

    /// Deletes a shortened URL by its short code.
    /// Returns `Err(NotFound)` if there was no such link.
    async fn delete(&self, code: &ShortCode) -> Result<()>;
}
