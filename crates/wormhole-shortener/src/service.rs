use crate::config::ShortenerConfig;
use crate::validate::validate_url;
use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, info};
use wormhole_core::{
    ExpirationPolicy, Link, NewLink, Repository, ShortCode, ShortenParams, Shortener,
    ShortenerError, StorageError,
};
use wormhole_generator::Generator;

type Result<T> = std::result::Result<T, ShortenerError>;

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps a `Repository` and a `Generator` to handle:
/// - Short code allocation (custom alias or generated)
/// - Expiration policy conversion
/// - URL validation
///
/// Uniqueness is decided by [`Repository::create`]; the `exists` checks made
/// here only skip candidates that are obviously taken.
#[derive(Debug)]
pub struct ShortenerService<R, G> {
    repository: Arc<R>,
    generator: Arc<G>,
    config: ShortenerConfig,
}

impl<R, G> Clone for ShortenerService<R, G> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            generator: Arc::clone(&self.generator),
            config: self.config.clone(),
        }
    }
}

impl<R: Repository, G: Generator> ShortenerService<R, G> {
    pub fn new(repository: R, generator: G) -> Self {
        Self::with_config(repository, generator, ShortenerConfig::default())
    }

    pub fn with_config(repository: R, generator: G, config: ShortenerConfig) -> Self {
        Self {
            repository: Arc::new(repository),
            generator: Arc::new(generator),
            config,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn config(&self) -> &ShortenerConfig {
        &self.config
    }

    /// Picks a short code that is free at the time of the call.
    ///
    /// A custom alias is validated and checked once. Without an alias the
    /// generator is asked up to `max_attempts` times. Nothing is reserved:
    /// the returned code may still be lost to a concurrent create.
    pub async fn allocate(&self, custom_alias: Option<&str>) -> Result<ShortCode> {
        if let Some(alias) = custom_alias {
            return self.claimable_alias(alias).await;
        }

        match self.next_free_code(&mut self.attempts()).await? {
            Some((code, _)) => Ok(code),
            None => Err(self.exhausted()),
        }
    }

    async fn claimable_alias(&self, alias: &str) -> Result<ShortCode> {
        let code = ShortCode::new(alias)?;
        if self.config.is_reserved(code.as_str()) {
            return Err(ShortenerError::AliasInvalid(format!(
                "'{code}' is a reserved word"
            )));
        }

        if self.repository.exists(&code).await? {
            return Err(ShortenerError::AliasTaken(code.to_string()));
        }
        Ok(code)
    }

    fn attempts(&self) -> RangeInclusive<u32> {
        1..=self.config.max_attempts
    }

    /// Draws from the generator until a usable code turns up, spending
    /// `attempts` as it goes. `None` once the budget is used up.
    async fn next_free_code(
        &self,
        attempts: &mut RangeInclusive<u32>,
    ) -> Result<Option<(ShortCode, u32)>> {
        for attempt in attempts.by_ref() {
            if let Some(code) = self.free_candidate(attempt).await? {
                return Ok(Some((code, attempt)));
            }
        }
        Ok(None)
    }

    /// One generator draw. `None` means the candidate is unusable.
    async fn free_candidate(&self, attempt: u32) -> Result<Option<ShortCode>> {
        let code: ShortCode = self.generator.generate().into();

        if self.config.is_reserved(code.as_str()) || self.repository.exists(&code).await? {
            debug!(code = %code, attempt, "generated code collided");
            return Ok(None);
        }
        Ok(Some(code))
    }

    fn exhausted(&self) -> ShortenerError {
        ShortenerError::GenerationExhausted {
            attempts: self.config.max_attempts,
        }
    }

    fn expire_at(expiration: ExpirationPolicy, now: Timestamp) -> Result<Option<Timestamp>> {
        match expiration {
            ExpirationPolicy::Never => Ok(None),
            ExpirationPolicy::AfterDuration(duration) => {
                let duration = SignedDuration::try_from(duration).map_err(|e| {
                    ShortenerError::InvalidExpiration(format!("invalid duration: {e}"))
                })?;
                now.checked_add(duration).map(Some).map_err(|e| {
                    ShortenerError::InvalidExpiration(format!("expiration out of range: {e}"))
                })
            }
            ExpirationPolicy::AtTimestamp(timestamp) => Ok(Some(timestamp)),
        }
    }
}

#[async_trait]
impl<R: Repository, G: Generator> Shortener for ShortenerService<R, G> {
    async fn shorten(&self, params: ShortenParams) -> Result<Link> {
        validate_url(&params.original_url, self.config.max_url_length)?;

        let created_at = Timestamp::now();
        let new_link = NewLink {
            original_url: params.original_url,
            created_at,
            expire_at: Self::expire_at(params.expiration, created_at)?,
        };

        if let Some(alias) = params.custom_alias.as_deref() {
            let code = self.allocate(Some(alias)).await?;
            return match self.repository.create(&code, new_link).await {
                Ok(link) => {
                    info!(code = %link.short_code, "created link with custom alias");
                    Ok(link)
                }
                Err(StorageError::DuplicateCode(code)) => Err(ShortenerError::AliasTaken(code)),
                Err(e) => Err(e.into()),
            };
        }

        // A lost create race spends from the same budget as a collision.
        let mut attempts = self.attempts();
        while let Some((code, attempt)) = self.next_free_code(&mut attempts).await? {
            match self.repository.create(&code, new_link.clone()).await {
                Ok(link) => {
                    info!(code = %link.short_code, attempt, "created link");
                    return Ok(link);
                }
                Err(StorageError::DuplicateCode(_)) => {
                    debug!(code = %code, attempt, "lost create race for generated code");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(self.exhausted())
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        self.repository.delete(code).await?;
        info!(code = %code, "deleted link");
        Ok(())
    }
}
