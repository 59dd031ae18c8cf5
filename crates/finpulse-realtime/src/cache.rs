//! Cache bridge: targeted invalidation of snapshot-cache entries.
//!
//! Every event kind maps to a fixed set of [`CacheKey`]s through
//! [`invalidation_keys`]. The bridge runs its own worker task so a slow
//! refetch never holds up event application; requests queued while the
//! worker is busy are merged into one call.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    error::{RealtimeError, RealtimeResult},
    event::EventKind,
};

/// Names of the snapshot queries backing aggregate views.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    DashboardSummary,
    Transactions,
    SpendingByCategory,
    Budgets,
    BudgetStatus,
    Goals,
    GoalStats,
    Notifications,
}

impl CacheKey {
    pub const ALL: [CacheKey; 8] = [
        Self::DashboardSummary,
        Self::Transactions,
        Self::SpendingByCategory,
        Self::Budgets,
        Self::BudgetStatus,
        Self::Goals,
        Self::GoalStats,
        Self::Notifications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DashboardSummary => "dashboard-summary",
            Self::Transactions => "transactions",
            Self::SpendingByCategory => "spending-by-category",
            Self::Budgets => "budgets",
            Self::BudgetStatus => "budget-status",
            Self::Goals => "goals",
            Self::GoalStats => "goal-stats",
            Self::Notifications => "notifications",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot keys made stale by an event of `kind`.
pub fn invalidation_keys(kind: EventKind) -> &'static [CacheKey] {
    use CacheKey::*;

    match kind {
        EventKind::TransactionCreated => &[
            Transactions,
            DashboardSummary,
            SpendingByCategory,
            BudgetStatus,
        ],
        EventKind::NotificationCreated => &[Notifications],
        EventKind::BudgetAlert => &[Budgets, BudgetStatus, DashboardSummary],
        EventKind::GoalProgressUpdate => &[Goals, GoalStats, DashboardSummary],
        EventKind::GoalCompleted => &[Goals, GoalStats, DashboardSummary],
        EventKind::MilestoneReached => &[Goals, GoalStats],
        EventKind::ConnectionAck => &[],
    }
}

/// The cached-query layer holding snapshot data.
#[async_trait]
pub trait SnapshotCache: Send + Sync + 'static {
    /// Mark `keys` stale and refetch them.
    async fn invalidate(&self, keys: &[CacheKey]) -> RealtimeResult<()>;

    /// Refetch everything after a reconnect. Events missed during the outage
    /// are not replayed, so the snapshot is authoritative for the gap.
    async fn resync(&self) -> RealtimeResult<()> {
        self.invalidate(&CacheKey::ALL).await
    }
}

/// Cache that ignores every request.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSnapshotCache;

#[async_trait]
impl SnapshotCache for NoopSnapshotCache {
    async fn invalidate(&self, _keys: &[CacheKey]) -> RealtimeResult<()> {
        Ok(())
    }
}

#[derive(Debug)]
enum BridgeRequest {
    Invalidate(EventKind),
    Resync,
    Flush(oneshot::Sender<()>),
}

/// Handle to the bridge worker. Dropping it stops the worker.
pub struct CacheBridge {
    tx: mpsc::UnboundedSender<BridgeRequest>,
    task: JoinHandle<()>,
}

impl CacheBridge {
    pub fn spawn(cache: Arc<dyn SnapshotCache>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(bridge_worker(cache, rx));
        Self { tx, task }
    }

    /// Queue invalidation for an applied event. Kinds with no keys are skipped.
    pub fn invalidate(&self, kind: EventKind) {
        if invalidation_keys(kind).is_empty() {
            return;
        }
        let _ = self.tx.send(BridgeRequest::Invalidate(kind));
    }

    pub fn resync(&self) {
        let _ = self.tx.send(BridgeRequest::Resync);
    }

    /// Wait until everything queued before this call has been handed to the
    /// cache.
    pub async fn flush(&self) -> RealtimeResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.notify_when_flushed(ack_tx);
        ack_rx.await.map_err(|_| RealtimeError::SessionClosed)
    }

    /// Non-blocking form of [`flush`](Self::flush): `ack` fires once the
    /// requests queued so far have been handled.
    pub(crate) fn notify_when_flushed(&self, ack: oneshot::Sender<()>) {
        let _ = self.tx.send(BridgeRequest::Flush(ack));
    }
}

impl Drop for CacheBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Default)]
struct Batch {
    resync: bool,
    keys: Vec<CacheKey>,
    waiters: Vec<oneshot::Sender<()>>,
}

impl Batch {
    fn push(&mut self, request: BridgeRequest) {
        match request {
            BridgeRequest::Invalidate(kind) => {
                for key in invalidation_keys(kind) {
                    if !self.keys.contains(key) {
                        self.keys.push(*key);
                    }
                }
            }
            BridgeRequest::Resync => self.resync = true,
            BridgeRequest::Flush(waiter) => self.waiters.push(waiter),
        }
    }

    async fn run(self, cache: &dyn SnapshotCache) {
        if self.resync {
            debug!("Resyncing snapshot cache");
            if let Err(err) = cache.resync().await {
                warn!(error = %err, "Snapshot resync failed");
            }
        } else if !self.keys.is_empty() {
            let names: Vec<_> = self.keys.iter().map(CacheKey::as_str).collect();
            debug!(keys = ?names, "Invalidating snapshot keys");
            if let Err(err) = cache.invalidate(&self.keys).await {
                warn!(error = %err, keys = ?names, "Snapshot invalidation failed");
            }
        }

        for waiter in self.waiters {
            let _ = waiter.send(());
        }
    }
}

async fn bridge_worker(
    cache: Arc<dyn SnapshotCache>,
    mut rx: mpsc::UnboundedReceiver<BridgeRequest>,
) {
    while let Some(first) = rx.recv().await {
        let mut batch = Batch::default();
        batch.push(first);
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }
        batch.run(cache.as_ref()).await;
    }
    debug!("Cache bridge stopped");
}
