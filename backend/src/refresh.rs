//! Keeps cached ledger reads fresh.
//!
//! Two triggers exist. A poller re-fetches the pool object on a fixed
//! interval. A committed transaction schedules exactly one refresh after the
//! settle delay, covering the pool and the sender's cached queries; other
//! wallets are untouched. A commit with no known sender marks everything
//! stale and refetches only the pool. Repeated notifications for the same
//! digest are ignored. Each completed refresh bumps the generation published
//! on a `watch` channel.

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
    time::Duration,
};

use serde::Serialize;
use tokio::{
    sync::{mpsc, watch},
    time::{Instant, MissedTickBehavior},
};

use crate::cache::{QueryCache, QueryKey};

const REMEMBERED_DIGESTS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    TransactionCommitted { digest: String, sender: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshReason {
    Startup,
    Poll,
    Commit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshGeneration {
    pub generation: u64,
    pub reason: RefreshReason,
}

#[derive(Clone)]
pub struct RefreshHandle {
    events: mpsc::UnboundedSender<LedgerEvent>,
    generation: watch::Receiver<RefreshGeneration>,
}

impl RefreshHandle {
    pub fn transaction_committed(&self, digest: impl Into<String>, sender: Option<String>) {
        let event = LedgerEvent::TransactionCommitted {
            digest: digest.into(),
            sender,
        };
        if self.events.send(event).is_err() {
            tracing::warn!("refresh coordinator stopped, commit not scheduled");
        }
    }

    pub fn current(&self) -> RefreshGeneration {
        *self.generation.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RefreshGeneration> {
        self.generation.clone()
    }
}

pub struct RefreshCoordinator {
    cache: Arc<QueryCache>,
    pool_key: QueryKey,
    poll_interval: Duration,
    settle_delay: Duration,
}

impl RefreshCoordinator {
    pub fn new(
        cache: Arc<QueryCache>,
        pool_id: &str,
        poll_interval: Duration,
        settle_delay: Duration,
    ) -> Self {
        Self {
            cache,
            pool_key: QueryKey::Object(pool_id.to_string()),
            poll_interval,
            settle_delay,
        }
    }

    /// Starts the poller and the commit listener on the current runtime.
    pub fn spawn(self) -> RefreshHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (generation_tx, generation_rx) = watch::channel(RefreshGeneration {
            generation: 0,
            reason: RefreshReason::Startup,
        });
        let generation_tx = Arc::new(generation_tx);
        let commit_pool_key = self.pool_key.clone();

        tokio::spawn(poll_pool(
            self.cache.clone(),
            self.pool_key,
            self.poll_interval,
            generation_tx.clone(),
        ));
        tokio::spawn(listen_for_commits(
            self.cache,
            commit_pool_key,
            events_rx,
            self.settle_delay,
            generation_tx,
        ));

        RefreshHandle {
            events: events_tx,
            generation: generation_rx,
        }
    }
}

fn bump(generation: &watch::Sender<RefreshGeneration>, reason: RefreshReason) {
    generation.send_modify(|current| {
        current.generation += 1;
        current.reason = reason;
    });
}

async fn poll_pool(
    cache: Arc<QueryCache>,
    pool_key: QueryKey,
    every: Duration,
    generation: Arc<watch::Sender<RefreshGeneration>>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match cache.refetch(&pool_key).await {
            Ok(_) => bump(&generation, RefreshReason::Poll),
            Err(error) => tracing::warn!(%error, "pool poll failed, retrying next tick"),
        }
    }
}

async fn listen_for_commits(
    cache: Arc<QueryCache>,
    pool_key: QueryKey,
    mut events: mpsc::UnboundedReceiver<LedgerEvent>,
    settle_delay: Duration,
    generation: Arc<watch::Sender<RefreshGeneration>>,
) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut order: VecDeque<String> = VecDeque::new();

    while let Some(event) = events.recv().await {
        let LedgerEvent::TransactionCommitted { digest, sender } = event;
        if !seen.insert(digest.clone()) {
            tracing::debug!(%digest, "duplicate commit notification ignored");
            continue;
        }
        order.push_back(digest.clone());
        if order.len() > REMEMBERED_DIGESTS {
            if let Some(oldest) = order.pop_front() {
                seen.remove(&oldest);
            }
        }

        tracing::info!(%digest, ?sender, "transaction committed, refresh scheduled");
        let cache = cache.clone();
        let pool_key = pool_key.clone();
        let generation = generation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(settle_delay).await;
            let refreshed = refresh_after_commit(&cache, &pool_key, sender.as_deref()).await;
            tracing::info!(%digest, refreshed, "post-commit refresh done");
            bump(&generation, RefreshReason::Commit);
        });
    }
}

async fn refresh_after_commit(
    cache: &QueryCache,
    pool_key: &QueryKey,
    sender: Option<&str>,
) -> usize {
    match sender {
        Some(sender) => {
            cache
                .refresh_where(|key| key == pool_key || key.owner() == Some(sender))
                .await
        }
        None => {
            cache.invalidate_all().await;
            cache.refresh_where(|key| key == pool_key).await
        }
    }
}
