use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use tokio::{sync::RwLock, time::Instant};

use crate::{
    config::{CACHE_IDLE_TTL, CACHE_MAX_ENTRIES},
    error::{DashboardError, Result},
    sui::{CoinObject, LedgerRpc, ObjectData},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Coins { owner: String, coin_type: String },
    Object(String),
    OwnedObjects { owner: String, struct_type: String },
}

impl QueryKey {
    /// The wallet a per-owner query belongs to. Shared objects have none.
    pub fn owner(&self) -> Option<&str> {
        match self {
            QueryKey::Coins { owner, .. } | QueryKey::OwnedObjects { owner, .. } => Some(owner),
            QueryKey::Object(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum QueryValue {
    Coins(Vec<CoinObject>),
    Object(ObjectData),
    OwnedObjects(Vec<ObjectData>),
}

fn mismatch(expected: &str, got: &QueryValue) -> DashboardError {
    DashboardError::decode("query cache", format!("expected {expected}, found {got:?}"))
}

#[derive(Debug, Clone)]
struct Entry {
    value: QueryValue,
    fetched_at: DateTime<Utc>,
    last_read: Instant,
    stale: bool,
}

impl Entry {
    fn idle_since(&self, now: Instant, idle_ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_read) >= idle_ttl
    }
}

/// In-memory read-through cache over `LedgerRpc`.
///
/// Entries stay fresh until invalidated; a read of a stale or missing entry
/// goes to the ledger. Failed fetches are not cached.
///
/// Entries nobody has read for `idle_ttl` are dropped, and the cache never
/// holds more than `max_entries`; past that the least recently read entry
/// goes first. Both sweeps run on insert.
pub struct QueryCache {
    rpc: Arc<dyn LedgerRpc>,
    entries: RwLock<HashMap<QueryKey, Entry>>,
    fetches: AtomicU64,
    max_entries: usize,
    idle_ttl: Duration,
}

impl QueryCache {
    pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
        Self::with_limits(rpc, CACHE_MAX_ENTRIES, CACHE_IDLE_TTL)
    }

    pub fn with_limits(rpc: Arc<dyn LedgerRpc>, max_entries: usize, idle_ttl: Duration) -> Self {
        Self {
            rpc,
            entries: RwLock::new(HashMap::new()),
            fetches: AtomicU64::new(0),
            max_entries: max_entries.max(1),
            idle_ttl,
        }
    }

    pub async fn coins(&self, owner: &str, coin_type: &str) -> Result<Vec<CoinObject>> {
        let key = QueryKey::Coins {
            owner: owner.to_string(),
            coin_type: coin_type.to_string(),
        };
        match self.get(key).await? {
            QueryValue::Coins(coins) => Ok(coins),
            other => Err(mismatch("coins", &other)),
        }
    }

    pub async fn object(&self, object_id: &str) -> Result<ObjectData> {
        match self.get(QueryKey::Object(object_id.to_string())).await? {
            QueryValue::Object(object) => Ok(object),
            other => Err(mismatch("object", &other)),
        }
    }

    pub async fn owned_objects(&self, owner: &str, struct_type: &str) -> Result<Vec<ObjectData>> {
        let key = QueryKey::OwnedObjects {
            owner: owner.to_string(),
            struct_type: struct_type.to_string(),
        };
        match self.get(key).await? {
            QueryValue::OwnedObjects(objects) => Ok(objects),
            other => Err(mismatch("owned objects", &other)),
        }
    }

    async fn get(&self, key: QueryKey) -> Result<QueryValue> {
        let now = Instant::now();
        if let Some(entry) = self.entries.write().await.get_mut(&key) {
            if !entry.stale && !entry.idle_since(now, self.idle_ttl) {
                entry.last_read = now;
                return Ok(entry.value.clone());
            }
        }
        self.fetch(&key, true).await
    }

    /// Fetches `key` from the ledger regardless of freshness. Does not count
    /// as a read for eviction.
    pub async fn refetch(&self, key: &QueryKey) -> Result<QueryValue> {
        self.fetch(key, false).await
    }

    async fn fetch(&self, key: &QueryKey, read: bool) -> Result<QueryValue> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let value = match key {
            QueryKey::Coins { owner, coin_type } => {
                QueryValue::Coins(self.rpc.get_coins(owner, coin_type).await?)
            }
            QueryKey::Object(id) => QueryValue::Object(self.rpc.get_object(id).await?),
            QueryKey::OwnedObjects { owner, struct_type } => {
                QueryValue::OwnedObjects(self.rpc.get_owned_objects(owner, struct_type).await?)
            }
        };
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let last_read = match entries.get(key) {
            Some(entry) if !read => entry.last_read,
            _ => now,
        };
        entries.insert(
            key.clone(),
            Entry {
                value: value.clone(),
                fetched_at: Utc::now(),
                last_read,
                stale: false,
            },
        );
        self.evict(&mut entries, key, now);
        Ok(value)
    }

    fn evict(&self, entries: &mut HashMap<QueryKey, Entry>, keep: &QueryKey, now: Instant) {
        let before = entries.len();
        entries.retain(|key, entry| key == keep || !entry.idle_since(now, self.idle_ttl));
        while entries.len() > self.max_entries {
            let coldest = entries
                .iter()
                .filter(|(key, _)| *key != keep)
                .min_by_key(|(_, entry)| entry.last_read)
                .map(|(key, _)| key.clone());
            match coldest {
                Some(key) => {
                    entries.remove(&key);
                }
                None => break,
            }
        }
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = entries.len(), "query cache evicted entries");
        }
    }

    /// Marks every entry stale without fetching. Each is re-read on demand.
    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        entries.values_mut().for_each(|entry| entry.stale = true);
    }

    /// Marks the entries matching `affected` stale and re-issues each of
    /// those queries once. Returns how many refetches succeeded.
    pub async fn refresh_where<F>(&self, affected: F) -> usize
    where
        F: Fn(&QueryKey) -> bool,
    {
        let keys: Vec<QueryKey> = {
            let mut entries = self.entries.write().await;
            entries
                .iter_mut()
                .filter(|(key, _)| affected(key))
                .map(|(key, entry)| {
                    entry.stale = true;
                    key.clone()
                })
                .collect()
        };

        let mut refreshed = 0;
        for key in &keys {
            match self.refetch(key).await {
                Ok(_) => refreshed += 1,
                Err(error) => tracing::warn!(?key, %error, "refetch failed"),
            }
        }
        refreshed
    }

    pub async fn fetched_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        self.entries.read().await.get(key).map(|entry| entry.fetched_at)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Total ledger round trips issued through this cache.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}
