use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;
use wormhole_core::error::{Result, StorageError};
use wormhole_core::{
    ClickEvent, ClickLog, LinkStore, ReadRepository, Repository, ShortCode, Stats,
};

pub const DEFAULT_TOP_REFERRERS: usize = 5;
pub const DEFAULT_RECENT_CLICKS: usize = 10;

#[derive(Debug, Clone, TypedBuilder)]
pub struct RecorderConfig {
    /// Events buffered in memory before `record` spills sends onto tasks.
    #[builder(default = 10_000)]
    pub queue_capacity: usize,
    /// Most events persisted per worker round.
    #[builder(default = 256)]
    pub batch_size: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

enum Command {
    Record(ClickEvent),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Sends that could not be queued synchronously and are still waiting for room.
#[derive(Default)]
struct Overflow {
    pending: AtomicUsize,
    drained: Notify,
}

impl Overflow {
    fn enter(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    fn leave(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    async fn wait_drained(&self) {
        loop {
            let drained = self.drained.notified();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            drained.await;
        }
    }
}

struct Inner {
    tx: mpsc::Sender<Command>,
    store: Arc<dyn LinkStore>,
    overflow: Overflow,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Records redirects off the request path.
///
/// `record` never waits on storage. A single background worker owns the
/// receiving end of the queue, so events for one code are persisted in the
/// order they were queued. Persistence failures are logged and dropped.
#[derive(Clone)]
pub struct ClickRecorder {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ClickRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickRecorder")
            .field(
                "queued",
                &(self.inner.tx.max_capacity() - self.inner.tx.capacity()),
            )
            .field("overflow", &self.inner.overflow.pending.load(Ordering::Relaxed))
            .finish()
    }
}

impl ClickRecorder {
    /// Starts the background worker on the current tokio runtime.
    pub fn spawn(store: Arc<dyn LinkStore>, config: RecorderConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let worker = tokio::spawn(run_worker(
            Arc::clone(&store),
            rx,
            config.batch_size.max(1),
        ));

        Self {
            inner: Arc::new(Inner {
                tx,
                store,
                overflow: Overflow::default(),
                worker: Mutex::new(Some(worker)),
            }),
        }
    }

    /// Queues a click and returns at once.
    ///
    /// When the queue is full the send is handed to a spawned task instead
    /// of being dropped. Clicks recorded after `shutdown` are discarded.
    pub fn record(&self, event: ClickEvent) {
        match self.inner.tx.try_send(Command::Record(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => {
                debug!("click queue full, deferring send");
                self.inner.overflow.enter();
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    if inner.tx.send(command).await.is_err() {
                        warn!("click recorder stopped before a deferred click was queued");
                    }
                    inner.overflow.leave();
                });
            }
            Err(TrySendError::Closed(_)) => {
                warn!("click recorder is shut down, dropping click");
            }
        }
    }

    /// Waits until every click recorded before this call has been persisted.
    pub async fn flush(&self) {
        self.inner.overflow.wait_drained().await;

        let (ack, done) = oneshot::channel();
        if self.inner.tx.send(Command::Flush(ack)).await.is_err() {
            return;
        }
        let _ = done.await;
    }

    /// Persists everything still queued, then stops the worker.
    pub async fn shutdown(&self) {
        let Some(worker) = self.inner.worker.lock().await.take() else {
            return;
        };

        self.inner.overflow.wait_drained().await;
        if self.inner.tx.send(Command::Shutdown).await.is_err() {
            warn!("click worker exited before shutdown was requested");
        }
        if let Err(err) = worker.await {
            warn!(error = %err, "click worker panicked");
        }
        info!("click recorder stopped");
    }

    /// Aggregates the recorded clicks for one link.
    ///
    /// Returns `Err(NotFound)` if the link does not resolve.
    pub async fn stats_for(
        &self,
        code: &ShortCode,
        top_n: usize,
        recent_k: usize,
    ) -> Result<Stats> {
        let store = &self.inner.store;
        let link = store.lookup(code).await?;
        let top_referrers = store.top_referrers(code, top_n).await?;
        let recent_clicks = store.recent(code, recent_k).await?;

        Ok(Stats {
            short_code: link.short_code,
            original_url: link.original_url,
            clicks: link.click_count,
            created_at: link.created_at,
            last_click_at: link.last_click_at,
            top_referrers,
            recent_clicks,
        })
    }
}

async fn run_worker(
    store: Arc<dyn LinkStore>,
    mut rx: mpsc::Receiver<Command>,
    batch_size: usize,
) {
    let mut commands = Vec::with_capacity(batch_size);

    while rx.recv_many(&mut commands, batch_size).await > 0 {
        let mut events = Vec::with_capacity(commands.len());

        for command in commands.drain(..) {
            match command {
                Command::Record(event) => events.push(event),
                Command::Flush(ack) => {
                    persist(store.as_ref(), std::mem::take(&mut events)).await;
                    let _ = ack.send(());
                }
                Command::Shutdown => rx.close(),
            }
        }

        persist(store.as_ref(), events).await;
    }

    debug!("click worker drained");
}

async fn persist(store: &dyn LinkStore, events: Vec<ClickEvent>) {
    if events.is_empty() {
        return;
    }

    let mut counted = Vec::with_capacity(events.len());
    for event in events {
        match store.increment_click(&event.short_code, event.timestamp).await {
            Ok(()) => counted.push(event),
            Err(StorageError::NotFound(_)) => {
                debug!(code = %event.short_code, "link vanished, dropping click");
            }
            Err(err) => {
                warn!(code = %event.short_code, error = %err, "failed to count click");
            }
        }
    }

    if counted.is_empty() {
        return;
    }

    let count = counted.len();
    if let Err(err) = store.append(counted).await {
        warn!(count, error = %err, "failed to append click events");
    }
}
