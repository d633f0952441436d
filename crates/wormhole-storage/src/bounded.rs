use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use jiff::Timestamp;
use std::future::Future;
use std::time::Duration;
use tracing::warn;
use typed_builder::TypedBuilder;
use wormhole_core::error::{Result, StorageError};
use wormhole_core::{
    ClickEvent, ClickLog, Link, NewLink, ReadRepository, ReferrerCount, Repository, ShortCode,
    UrlRecord,
};

/// Time and retry limits applied to every store call.
#[derive(Debug, Clone, TypedBuilder)]
pub struct RetryPolicy {
    /// Upper bound for a single attempt.
    #[builder(default = Duration::from_secs(2))]
    pub timeout: Duration,
    #[builder(default = 3)]
    pub max_retries: u32,
    #[builder(default = Duration::from_millis(50))]
    pub base_delay: Duration,
    #[builder(default = Duration::from_secs(1))]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Exponential backoff with jitter, starting at `base_delay` and capped at
    /// `max_delay`, for at most `max_retries` retries.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries as usize)
            .with_jitter()
    }
}

/// Decorator that bounds how long any call into the inner store may block.
///
/// An attempt that exceeds [`RetryPolicy::timeout`] fails with
/// [`StorageError::Unavailable`]. Reads that fail as unavailable are retried
/// with backoff; writes are attempted once.
#[derive(Debug, Clone)]
pub struct BoundedRepository<R> {
    inner: R,
    policy: RetryPolicy,
}

impl<R> BoundedRepository<R> {
    pub fn new(inner: R, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    async fn once<T, Fut>(&self, op: &'static str, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.policy.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Unavailable(format!(
                "{op} timed out after {}ms",
                self.policy.timeout.as_millis()
            ))),
        }
    }

    async fn retrying<T, F, Fut>(&self, op: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        (|| self.once(op, call()))
            .retry(self.policy.backoff())
            .when(StorageError::is_retryable)
            .notify(|err: &StorageError, delay: Duration| {
                warn!(op, ?delay, error = %err, "store unavailable, retrying");
            })
            .await
    }
}

#[async_trait]
impl<R: ReadRepository> ReadRepository for BoundedRepository<R> {
    async fn lookup(&self, code: &ShortCode) -> Result<Link> {
        self.retrying("lookup", || self.inner.lookup(code)).await
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        self.retrying("exists", || self.inner.exists(code)).await
    }

    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        self.retrying("get", || self.inner.get(code)).await
    }
}

#[async_trait]
impl<R: Repository> Repository for BoundedRepository<R> {
    async fn create(&self, code: &ShortCode, link: NewLink) -> Result<Link> {
        self.once("create", self.inner.create(code, link)).await
    }

    async fn increment_click(&self, code: &ShortCode, at: Timestamp) -> Result<()> {
        self.once("increment_click", self.inner.increment_click(code, at))
            .await
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        self.once("delete", self.inner.delete(code)).await
    }
}

#[async_trait]
impl<R: ClickLog> ClickLog for BoundedRepository<R> {
    async fn append(&self, events: Vec<ClickEvent>) -> Result<()> {
        self.once("append", self.inner.append(events)).await
    }

    async fn recent(&self, code: &ShortCode, limit: usize) -> Result<Vec<ClickEvent>> {
        self.retrying("recent", || self.inner.recent(code, limit))
            .await
    }

    async fn top_referrers(&self, code: &ShortCode, limit: usize) -> Result<Vec<ReferrerCount>> {
        self.retrying("top_referrers", || self.inner.top_referrers(code, limit))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryRepository;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Fails the first `failures` lookups with `error`, then delegates.
    struct Flaky {
        inner: InMemoryRepository,
        failures: u32,
        error: StorageError,
        calls: AtomicU32,
        stall: bool,
    }

    impl Flaky {
        fn new(failures: u32, error: StorageError) -> Self {
            Self {
                inner: InMemoryRepository::new(),
                failures,
                error,
                calls: AtomicU32::new(0),
                stall: false,
            }
        }

        fn stalled() -> Self {
            Self {
                stall: true,
                ..Self::new(0, StorageError::Unavailable(String::new()))
            }
        }
    }

    #[async_trait]
    impl ReadRepository for Flaky {
        async fn lookup(&self, code: &ShortCode) -> Result<Link> {
            if self.stall {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(self.error.clone());
            }
            self.inner.lookup(code).await
        }

        async fn exists(&self, code: &ShortCode) -> Result<bool> {
            self.inner.exists(code).await
        }
    }

    #[async_trait]
    impl Repository for Flaky {
        async fn create(&self, code: &ShortCode, link: NewLink) -> Result<Link> {
            if self.stall {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.inner.create(code, link).await
        }

        async fn increment_click(&self, code: &ShortCode, at: Timestamp) -> Result<()> {
            self.inner.increment_click(code, at).await
        }

        async fn delete(&self, code: &ShortCode) -> Result<()> {
            self.inner.delete(code).await
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::builder()
            .timeout(Duration::from_millis(50))
            .base_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(5))
            .build()
    }

    fn new_link() -> NewLink {
        NewLink {
            original_url: "https://example.com".to_string(),
            created_at: Timestamp::now(),
            expire_at: None,
        }
    }

    #[tokio::test]
    async fn stalled_call_surfaces_unavailable() {
        let repo = BoundedRepository::new(Flaky::stalled(), fast_policy());
        let code = ShortCode::new_unchecked("abc123");

        let err = repo.create(&code, new_link()).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));

        let err = repo.lookup(&code).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }

    #[tokio::test]
    async fn unavailable_reads_are_retried_until_success() {
        let flaky = Arc::new(Flaky::new(2, StorageError::Unavailable("down".into())));
        let repo = BoundedRepository::new(flaky.clone(), fast_policy());
        let code = ShortCode::new_unchecked("abc123");
        repo.create(&code, new_link()).await.unwrap();

        let link = repo.lookup(&code).await.unwrap();
        assert_eq!(link.original_url, "https://example.com");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_stop_after_the_limit() {
        let flaky = Arc::new(Flaky::new(100, StorageError::Unavailable("down".into())));
        let repo = BoundedRepository::new(flaky.clone(), fast_policy());

        let err = repo
            .lookup(&ShortCode::new_unchecked("abc123"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let flaky = Arc::new(Flaky::new(1, StorageError::Query("bad sql".into())));
        let repo = BoundedRepository::new(flaky.clone(), fast_policy());

        let err = repo
            .lookup(&ShortCode::new_unchecked("abc123"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Query(_)));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_schedule_follows_the_policy() {
        use backon::BackoffBuilder;

        let policy = RetryPolicy::builder()
            .max_retries(4)
            .base_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(300))
            .build();

        let delays: Vec<Duration> = policy.backoff().build().collect();
        assert_eq!(delays.len(), 4);
        assert!(delays[0] >= Duration::from_millis(100));
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(600)));
    }
}
