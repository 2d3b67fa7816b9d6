use crate::knowledge::{KnowledgeRecord, KnowledgeView};
use crate::tactics::{Tactic, TacticAdapter};
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{Level, event, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("tactic {0} not found")]
    NotFound(u64),
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Persistent tactic library.
#[async_trait]
pub trait TacticStore: Send + Sync {
    async fn list_tactics(&self) -> Result<Vec<Tactic>, StoreError>;

    /// Stores a new tactic and returns its assigned id.
    async fn create_tactic(&self, tactic: Tactic) -> Result<u64, StoreError>;

    async fn update_tactic(&self, tactic: &Tactic) -> Result<(), StoreError>;
}

/// Append-only log of played moves.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn list_records(&self) -> Result<Vec<KnowledgeRecord>, StoreError>;

    async fn append_records(&self, records: &[KnowledgeRecord]) -> Result<(), StoreError>;
}

/// Process-local store. `set_failing(true)` makes every call return
/// `Unavailable`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tactics: RwLock<Vec<Tactic>>,
    records: RwLock<Vec<KnowledgeRecord>>,
    next_id: AtomicU64,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tactics(tactics: Vec<Tactic>) -> Self {
        let next_id = tactics.iter().map(|tactic| tactic.id).max().unwrap_or(0);
        Self {
            tactics: RwLock::new(tactics),
            next_id: AtomicU64::new(next_id),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of trait calls served so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store set to fail".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TacticStore for InMemoryStore {
    async fn list_tactics(&self) -> Result<Vec<Tactic>, StoreError> {
        self.check()?;
        Ok(self.tactics.read().await.clone())
    }

    async fn create_tactic(&self, mut tactic: Tactic) -> Result<u64, StoreError> {
        self.check()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        tactic.id = id;
        self.tactics.write().await.push(tactic);
        Ok(id)
    }

    async fn update_tactic(&self, tactic: &Tactic) -> Result<(), StoreError> {
        self.check()?;
        let mut tactics = self.tactics.write().await;
        let slot = tactics
            .iter_mut()
            .find(|existing| existing.id == tactic.id)
            .ok_or(StoreError::NotFound(tactic.id))?;
        *slot = tactic.clone();
        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    async fn list_records(&self) -> Result<Vec<KnowledgeRecord>, StoreError> {
        self.check()?;
        Ok(self.records.read().await.clone())
    }

    async fn append_records(&self, records: &[KnowledgeRecord]) -> Result<(), StoreError> {
        self.check()?;
        self.records.write().await.extend_from_slice(records);
        Ok(())
    }
}

/// Reads both sources once. A failed read degrades to an empty source.
pub async fn load_sources(
    tactics: &dyn TacticStore,
    knowledge: &dyn KnowledgeStore,
) -> (TacticAdapter, KnowledgeView) {
    let adapter = match tactics.list_tactics().await {
        Ok(list) => TacticAdapter::new(list),
        Err(err) => {
            warn!(target: "durak_bot::store", error = %err, "tactic load failed; continuing without tactics");
            TacticAdapter::empty()
        }
    };
    let view = match knowledge.list_records().await {
        Ok(records) => KnowledgeView::new(records),
        Err(err) => {
            warn!(target: "durak_bot::store", error = %err, "knowledge load failed; continuing without records");
            KnowledgeView::empty()
        }
    };
    event!(
        target: "durak_bot::store",
        Level::INFO,
        tactics = adapter.len(),
        records = view.len(),
        "sources loaded"
    );
    (adapter, view)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, first one included (default: 3)
    pub attempts: u32,
    /// Delay before the second try; doubles after each failure (default: 50ms)
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(failed_attempts.saturating_sub(1)))
    }

    /// Runs `op` until it succeeds or the attempts run out. The final error
    /// is logged and dropped.
    pub async fn with_retry<T, F, Fut>(&self, label: &str, mut op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let attempts = self.attempts.max(1);
        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => return Some(value),
                Err(err) if attempt < attempts => {
                    event!(
                        target: "durak_bot::store",
                        Level::DEBUG,
                        op = label,
                        attempt,
                        error = %err,
                        "store write failed; retrying"
                    );
                    tokio::time::sleep(self.delay_for(attempt)).await;
                }
                Err(err) => {
                    warn!(
                        target: "durak_bot::store",
                        op = label,
                        attempts,
                        error = %err,
                        "store write dropped"
                    );
                }
            }
        }
        None
    }
}
