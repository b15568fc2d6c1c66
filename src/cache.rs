//! Upload cache: keyed store of in-flight and recently-completed upload
//! operations.
//!
//! The cache guarantees at most one active network submission per
//! [`UploadKey`]: the first caller for a key drives the upload, every
//! concurrent caller awaits the same outcome channel. Completed entries stay
//! resolvable (optionally until a grace window elapses) so late duplicates
//! get the cached locator; failed entries are evicted at settle time so the
//! next attempt is fresh.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, TransmitError};
use crate::request::UploadKey;

/// Lifecycle of one upload operation. Transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Pending,
    Submitted,
    Polling,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadState::Completed
                | UploadState::Failed
                | UploadState::TimedOut
                | UploadState::Cancelled
        )
    }

    /// Terminal without a resource locator: the entry must not be served
    /// from cache again.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            UploadState::Failed | UploadState::TimedOut | UploadState::Cancelled
        )
    }

    fn rank(&self) -> u8 {
        match self {
            UploadState::Pending => 0,
            UploadState::Submitted => 1,
            UploadState::Polling => 2,
            UploadState::Completed
            | UploadState::Failed
            | UploadState::TimedOut
            | UploadState::Cancelled => 3,
        }
    }
}

struct OperationInner {
    state: UploadState,
    attempts: u32,
}

/// One keyed upload in flight or settled. Owned by the [`UploadCache`];
/// the strategy and poller hold `Arc` references only, so every waiter
/// observes the same terminal outcome.
pub struct UploadOperation {
    id: Uuid,
    key: UploadKey,
    created_at: Instant,
    inner: Mutex<OperationInner>,
    outcome_tx: watch::Sender<Option<Result<String>>>,
    cancel_tx: watch::Sender<bool>,
}

impl UploadOperation {
    fn new(key: UploadKey) -> Arc<Self> {
        let (outcome_tx, _) = watch::channel(None);
        let (cancel_tx, _) = watch::channel(false);
        Arc::new(Self {
            id: Uuid::new_v4(),
            key,
            created_at: Instant::now(),
            inner: Mutex::new(OperationInner {
                state: UploadState::Pending,
                attempts: 0,
            }),
            outcome_tx,
            cancel_tx,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &UploadKey {
        &self.key
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn state(&self) -> UploadState {
        self.inner.lock().state
    }

    pub fn attempts(&self) -> u32 {
        self.inner.lock().attempts
    }

    pub fn mark_submitted(&self) {
        self.advance(UploadState::Submitted);
    }

    pub fn mark_polling(&self) {
        self.advance(UploadState::Polling);
    }

    /// Count one status check. Returns the total so far.
    pub fn record_attempt(&self) -> u32 {
        let mut inner = self.inner.lock();
        inner.attempts += 1;
        inner.attempts
    }

    /// Forward-only transition; regressions and terminal re-entry are ignored.
    fn advance(&self, next: UploadState) {
        let mut inner = self.inner.lock();
        if !inner.state.is_terminal() && next.rank() > inner.state.rank() {
            inner.state = next;
        }
    }

    /// Resolves once the operation has been cancelled. Used by the poller to
    /// stop scheduling checks when the owning cache entry is invalidated.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel_tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                // Sender outlives all waiters; park rather than wake spuriously.
                futures::future::pending::<()>().await;
            }
        }
    }

    fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Await the shared terminal outcome.
    pub async fn outcome(&self) -> Result<String> {
        let mut rx = self.outcome_tx.subscribe();
        loop {
            let settled = rx.borrow_and_update().clone();
            if let Some(outcome) = settled {
                return outcome;
            }
            if rx.changed().await.is_err() {
                return Err(TransmitError::Cancelled(
                    "upload operation dropped before settling".into(),
                ));
            }
        }
    }

    /// Record the terminal state and wake every waiter.
    fn settle(&self, outcome: Result<String>) {
        let terminal = match &outcome {
            Ok(_) => UploadState::Completed,
            Err(TransmitError::Timeout { .. }) => UploadState::TimedOut,
            Err(TransmitError::Cancelled(_)) => UploadState::Cancelled,
            Err(_) => UploadState::Failed,
        };
        self.advance(terminal);
        let _ = self.outcome_tx.send(Some(outcome));
    }
}

/// Keyed store of upload operations.
pub struct UploadCache {
    entries: Arc<Mutex<HashMap<UploadKey, Arc<UploadOperation>>>>,
    completed_ttl: Option<Duration>,
}

impl UploadCache {
    /// Completed entries stay resolvable for the process lifetime.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            completed_ttl: None,
        }
    }

    /// Completed entries are evicted once the grace window elapses.
    pub fn with_completed_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            completed_ttl: Some(ttl),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// The registered operation for a key, if any.
    pub fn operation(&self, key: &UploadKey) -> Option<Arc<UploadOperation>> {
        self.entries.lock().get(key).cloned()
    }

    /// Return the outcome of the operation registered under `key`, creating
    /// and driving one via `factory` if none exists. Guarantees at most one
    /// concurrent submission per key: later callers join the in-flight
    /// operation and observe its exact outcome.
    pub async fn get_or_create<F, Fut>(&self, key: UploadKey, factory: F) -> Result<String>
    where
        F: FnOnce(Arc<UploadOperation>) -> Fut,
        Fut: std::future::Future<Output = Result<String>>,
    {
        let (operation, owner) = {
            let mut entries = self.entries.lock();
            match entries.get(&key) {
                Some(existing) if !existing.state().is_failure() => (existing.clone(), false),
                _ => {
                    let operation = UploadOperation::new(key.clone());
                    entries.insert(key, operation.clone());
                    (operation, true)
                }
            }
        };

        if !owner {
            debug!(operation = %operation.id(), "Joining upload already registered for key");
            return operation.outcome().await;
        }

        info!(operation = %operation.id(), url = %operation.key().url, "Registered new upload operation");
        let outcome = factory(operation.clone()).await;
        self.settle(&operation, outcome.clone());
        outcome
    }

    /// Cancel and drop the entry for `key`, if present. The poller observes
    /// the cancellation and resolves with a cancellation outcome.
    pub fn invalidate(&self, key: &UploadKey) {
        if let Some(operation) = self.entries.lock().remove(key) {
            warn!(operation = %operation.id(), "Invalidated upload cache entry");
            operation.cancel();
        }
    }

    /// Cancel every in-flight operation and clear the cache.
    pub fn shutdown(&self) {
        let mut entries = self.entries.lock();
        info!(count = entries.len(), "Shutting down upload cache");
        for (_, operation) in entries.drain() {
            operation.cancel();
        }
    }

    fn settle(&self, operation: &Arc<UploadOperation>, outcome: Result<String>) {
        let failed = outcome.is_err();
        operation.settle(outcome);
        if failed {
            // A cached failure must never short-circuit a retry. Only this
            // operation may be evicted: an invalidated key may already hold
            // a fresh registration.
            if Self::remove_exact(&self.entries, operation) {
                info!(operation = %operation.id(), "Evicted failed upload operation");
            }
        } else if let Some(ttl) = self.completed_ttl {
            let entries = self.entries.clone();
            let operation = operation.clone();
            tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                if Self::remove_exact(&entries, &operation) {
                    debug!(operation = %operation.id(), "Evicted completed upload after grace window");
                }
            });
        }
    }

    fn remove_exact(
        entries: &Mutex<HashMap<UploadKey, Arc<UploadOperation>>>,
        operation: &Arc<UploadOperation>,
    ) -> bool {
        let mut entries = entries.lock();
        if entries
            .get(operation.key())
            .is_some_and(|current| Arc::ptr_eq(current, operation))
        {
            entries.remove(operation.key());
            true
        } else {
            false
        }
    }
}

impl Default for UploadCache {
    fn default() -> Self {
        Self::new()
    }
}
