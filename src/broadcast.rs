//! Progress broadcaster: fan-out of job events to subscribers.
//!
//! Two pools: per-job subscribers and global subscribers. Delivery is
//! best-effort and non-blocking per subscriber — `try_send` into a bounded
//! channel, and a subscriber whose channel is full or closed is dropped and
//! unregistered on the spot. The execution loop never waits on a slow
//! consumer.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::model::{JobId, JobStatus, TradePairOutcome};

/// Per-subscriber channel capacity. A consumer this far behind is dropped.
const SUBSCRIBER_CAPACITY: usize = 64;

/// Identifier handed out on subscribe; used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(uuid::Uuid);

impl SubscriberId {
    fn new() -> Self {
        SubscriberId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Payload of one broadcast event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEventKind {
    /// Job entered a new lifecycle state
    StatusChanged {
        status: JobStatus,
        message: String,
    },
    /// One trade pair finished (successfully or not)
    TradeCompleted {
        pair_index: u32,
        total_trades: u32,
        trades_completed: u32,
        /// Exact `100 × trades_completed / total_trades`
        progress_pct: f64,
        volume_generated: Decimal,
        fees_spent: Decimal,
        /// `remaining × mean observed delay`, seconds
        estimated_remaining_secs: u64,
        outcome: TradePairOutcome,
    },
    /// Job-level error
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

/// One event delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: ProgressEventKind,
}

impl ProgressEvent {
    pub fn new(job_id: JobId, kind: ProgressEventKind) -> Self {
        Self {
            job_id,
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Status and error events are of global interest; trade-by-trade
    /// progress is job-scoped only.
    fn is_global(&self) -> bool {
        matches!(
            self.kind,
            ProgressEventKind::StatusChanged { .. } | ProgressEventKind::Error { .. }
        )
    }
}

/// Snapshot of subscriber counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastStats {
    pub total_subscribers: usize,
    pub job_subscribers: usize,
    pub global_subscribers: usize,
    pub jobs_with_subscribers: usize,
}

type Pool = HashMap<SubscriberId, mpsc::Sender<ProgressEvent>>;

/// Fan-out hub for job progress events.
#[derive(Default)]
pub struct ProgressBroadcaster {
    job_pools: RwLock<HashMap<JobId, Pool>>,
    global_pool: RwLock<Pool>,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events for one job.
    pub fn subscribe_job(&self, job_id: &JobId) -> (SubscriberId, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let id = SubscriberId::new();
        self.job_pools
            .write()
            .entry(job_id.clone())
            .or_default()
            .insert(id, tx);
        debug!(%job_id, subscriber = %id, "job subscriber connected");
        (id, rx)
    }

    /// Subscribe to status/error events across all jobs.
    pub fn subscribe_global(&self) -> (SubscriberId, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let id = SubscriberId::new();
        self.global_pool.write().insert(id, tx);
        debug!(subscriber = %id, "global subscriber connected");
        (id, rx)
    }

    /// Remove a subscriber from every pool. Idempotent.
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.global_pool.write().remove(&id);
        let mut pools = self.job_pools.write();
        for pool in pools.values_mut() {
            pool.remove(&id);
        }
        pools.retain(|_, pool| !pool.is_empty());
    }

    /// Deliver an event to the job's pool, and to the global pool when the
    /// event is of global interest. Never blocks.
    pub fn publish(&self, event: ProgressEvent) {
        self.deliver_job_pool(&event);
        if event.is_global() {
            self.deliver_global_pool(&event);
        }
    }

    fn deliver_job_pool(&self, event: &ProgressEvent) {
        let mut dropped = Vec::new();
        {
            let pools = self.job_pools.read();
            let Some(pool) = pools.get(&event.job_id) else {
                return;
            };
            for (id, tx) in pool {
                if tx.try_send(event.clone()).is_err() {
                    dropped.push(*id);
                }
            }
        }
        if !dropped.is_empty() {
            let mut pools = self.job_pools.write();
            if let Some(pool) = pools.get_mut(&event.job_id) {
                for id in &dropped {
                    pool.remove(id);
                    warn!(job_id = %event.job_id, subscriber = %id, "dropping unresponsive subscriber");
                }
                if pool.is_empty() {
                    pools.remove(&event.job_id);
                }
            }
        }
    }

    fn deliver_global_pool(&self, event: &ProgressEvent) {
        let mut dropped = Vec::new();
        {
            let pool = self.global_pool.read();
            for (id, tx) in pool.iter() {
                if tx.try_send(event.clone()).is_err() {
                    dropped.push(*id);
                }
            }
        }
        if !dropped.is_empty() {
            let mut pool = self.global_pool.write();
            for id in &dropped {
                pool.remove(id);
                warn!(subscriber = %id, "dropping unresponsive global subscriber");
            }
        }
    }

    /// Subscriber counts; read-only.
    pub fn stats(&self) -> BroadcastStats {
        let pools = self.job_pools.read();
        let job_subscribers: usize = pools.values().map(|p| p.len()).sum();
        let global_subscribers = self.global_pool.read().len();
        BroadcastStats {
            total_subscribers: job_subscribers + global_subscribers,
            job_subscribers,
            global_subscribers,
            jobs_with_subscribers: pools.len(),
        }
    }
}
