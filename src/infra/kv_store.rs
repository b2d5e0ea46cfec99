//! Bounded, TTL-expiring key-value storage with atomic increment.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, Weak},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use redis::{Script, aio::ConnectionManager};
use secrecy::{ExposeSecret, SecretString};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::InfraError;
use crate::app_error::{AppError, AppResult};

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;
    async fn delete(&self, key: &str) -> AppResult<()>;
    /// Increment the counter at `key` and return the new value. A new key
    /// starts at 1 and expires after `ttl`; incrementing keeps the expiry.
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> AppResult<u64>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local store. Not shared between instances.
///
/// Expired entries are invisible to reads and removed by the sweeper or when
/// an insert hits the capacity bound.
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, Entry>>,
    max_entries: usize,
}

impl InMemoryKeyValueStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Start the background sweep. The task ends on [`SweepHandle::stop`] or
    /// once the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> SweepHandle {
        let store = Arc::downgrade(self);
        let stop = CancellationToken::new();
        let handle = tokio::spawn(run_sweeper(store, every, stop.clone()));
        info!(every_secs = every.as_secs_f64(), "KV sweeper started");
        SweepHandle { stop, handle }
    }

    /// Stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn purge_expired(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<String> {
        self.lock()
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value.clone())
    }

    fn set_at(&self, key: &str, value: String, ttl: Duration, now: Instant) {
        let mut entries = self.lock();
        self.make_room(&mut entries, key, now);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    fn incr_at(&self, key: &str, ttl: Duration, now: Instant) -> AppResult<u64> {
        let mut entries = self.lock();

        if let Some(entry) = entries.get_mut(key)
            && entry.expires_at > now
        {
            let current: u64 = entry
                .value
                .parse()
                .map_err(|_| AppError::Cache(format!("value at {key} is not a counter")))?;
            let next = current.saturating_add(1);
            entry.value = next.to_string();
            return Ok(next);
        }

        self.make_room(&mut entries, key, now);
        entries.insert(
            key.to_string(),
            Entry {
                value: "1".to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(1)
    }

    /// Frees one slot for a new `key`: expired entries go first, then the
    /// entry closest to expiry.
    fn make_room(&self, entries: &mut HashMap<String, Entry>, key: &str, now: Instant) {
        if entries.contains_key(key) || entries.len() < self.max_entries {
            return;
        }

        entries.retain(|_, e| e.expires_at > now);
        if entries.len() < self.max_entries {
            return;
        }

        let victim = entries
            .iter()
            .min_by_key(|(_, e)| e.expires_at)
            .map(|(k, _)| k.clone());
        if let Some(victim) = victim {
            debug!(key = %victim, "KV store full, evicting");
            entries.remove(&victim);
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.get_at(key, Instant::now()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.set_at(key, value.to_string(), ttl, Instant::now());
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.lock().remove(key);
        Ok(())
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> AppResult<u64> {
        self.incr_at(key, ttl, Instant::now())
    }
}

async fn run_sweeper(store: Weak<InMemoryKeyValueStore>, every: Duration, stop: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                let Some(store) = store.upgrade() else { break };
                let purged = store.purge_expired(Instant::now());
                if purged > 0 {
                    debug!(purged, remaining = store.len(), "KV sweep");
                }
            }
        }
    }
    info!("KV sweeper stopped");
}

/// Owns the sweep task of an [`InMemoryKeyValueStore`].
pub struct SweepHandle {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl SweepHandle {
    pub async fn stop(self) {
        self.stop.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "KV sweeper task panicked");
        }
    }
}

/// Lua script for atomic increment with TTL.
/// Returns the new count after increment.
/// If the key doesn't exist, it's created with TTL.
/// If the key exists but has no TTL, TTL is set.
const INCR_WITH_TTL_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
elseif redis.call('TTL', KEYS[1]) == -1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return current
"#;

/// Redis-backed store, shared by every instance pointing at the same server.
#[derive(Clone)]
pub struct RedisKeyValueStore {
    manager: ConnectionManager,
    incr_script: Script,
}

impl RedisKeyValueStore {
    pub async fn new(redis_url: &SecretString) -> Result<Self, InfraError> {
        let client =
            redis::Client::open(redis_url.expose_secret()).map_err(InfraError::RedisConnection)?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(InfraError::RedisConnection)?;
        info!("Connected to Redis");
        Ok(Self {
            manager,
            incr_script: Script::new(INCR_WITH_TTL_SCRIPT),
        })
    }
}

fn redis_err(e: redis::RedisError) -> AppError {
    AppError::Cache(e.to_string())
}

/// Redis expiries are whole seconds and must be positive.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.manager.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map_err(redis_err)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(redis_err)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(redis_err)
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> AppResult<u64> {
        let mut conn = self.manager.clone();
        let current: u64 = self
            .incr_script
            .key(key)
            .arg(ttl_secs(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(redis_err)?;
        Ok(current)
    }
}
