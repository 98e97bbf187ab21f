use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::config::StoreConfig;
use crate::entry::Entry;

/// The store contract a [`Counter`](crate::Counter) aggregates against.
///
/// Any backend offering integer get/set-with-expiry/delete plus a named-set
/// structure can drive a counter. Implementations must be safe for concurrent
/// use from multiple counters and threads; the counter imposes no locking of
/// its own. Each primitive is expected to be individually atomic, but no
/// atomicity is assumed across primitives.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored integer, or `None` if the key is missing or expired.
    fn get(&self, key: &str) -> Option<i64>;

    /// Stores `value` under `key`. A non-zero `ttl` makes the store expire
    /// the key on its own after that duration; `Duration::ZERO` means the
    /// key never expires until explicitly deleted.
    fn set(&self, key: &str, value: i64, ttl: Duration);

    /// Removes `key`, whether it holds an integer or a named set.
    /// No-op if the key is missing.
    fn delete(&self, key: &str);

    /// Adds `member` to the named set `set`, creating the set if needed.
    fn set_add(&self, set: &str, member: &str);

    /// Removes `member` from the named set `set`. No-op if absent.
    fn set_remove(&self, set: &str, member: &str);

    /// Returns the current members of `set`. No ordering guarantee.
    /// A missing set reads as empty.
    fn set_members(&self, set: &str) -> Vec<String>;
}

/// Internal shared state for the memory store
struct StoreInner {
    values: DashMap<String, Entry>,
    sets: DashMap<String, DashSet<String>>,
    /// Sender to signal shutdown to the janitor task
    shutdown_tx: watch::Sender<bool>,
}

/// Thread-safe in-memory [`KeyValueStore`] with TTL support
///
/// Uses `DashMap` for lock-free concurrent access. Reads never block other
/// reads, and writes only block access to the specific key being written.
///
/// Expired entries are removed lazily whenever they are read. When the store
/// is created inside a Tokio runtime it additionally spawns a background
/// janitor task that periodically sweeps expired entries; without a runtime
/// the lazy path alone keeps reads correct. The janitor stops when the store
/// is dropped.
///
/// # Example
///
/// ```rust
/// use temporal_counter::MemoryStore;
/// use temporal_counter::KeyValueStore;
/// use std::time::Duration;
///
/// let store = MemoryStore::new();
/// store.set("slots", 3, Duration::from_secs(300));
/// assert_eq!(store.get("slots"), Some(3));
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    /// Creates a new store with default configuration
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates a new store with custom configuration
    ///
    /// The janitor task is spawned only when a Tokio runtime is available;
    /// the cleanup interval has no effect otherwise.
    pub fn with_config(config: StoreConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let inner = Arc::new(StoreInner {
            values: DashMap::new(),
            sets: DashMap::new(),
            shutdown_tx,
        });

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let janitor_inner = Arc::clone(&inner);
            handle.spawn(Self::janitor_task(
                janitor_inner,
                config.cleanup_interval,
                shutdown_rx,
            ));
        }

        Self { inner }
    }

    /// Background task that periodically sweeps expired entries
    async fn janitor_task(
        inner: Arc<StoreInner>,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        // Skip the first immediate tick - we want to wait for the interval first
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    Self::cleanup_internal(&inner);
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    }

    /// Internal cleanup logic (shared between manual and background cleanup)
    fn cleanup_internal(inner: &StoreInner) -> usize {
        let mut removed_count = 0;

        inner.values.retain(|_, entry| {
            if entry.is_expired() {
                removed_count += 1;
                false
            } else {
                true
            }
        });

        removed_count
    }

    /// Stores a value that expired in the past (for testing purposes)
    #[cfg(test)]
    fn set_expired(&self, key: impl Into<String>, value: i64) {
        let expires_at = Instant::now() - Duration::from_secs(1);
        let _ = self.inner.values.insert(key.into(), Entry::new(value, expires_at));
    }

    /// Manually triggers a sweep of all expired entries
    ///
    /// Returns the number of entries removed. Also done automatically by the
    /// janitor task when one is running.
    pub fn cleanup(&self) -> usize {
        Self::cleanup_internal(&self.inner)
    }

    /// Returns the number of integer entries in the store (including expired
    /// ones that have not been swept yet)
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.values.len()
    }

    /// Returns `true` if the store holds no integer entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.values.is_empty()
    }

    /// Gracefully shuts down the background janitor task
    ///
    /// This is called automatically when the last clone of the store is
    /// dropped, but can be called manually if needed.
    pub fn shutdown(&self) {
        let _ = self.inner.shutdown_tx.send(true);
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<i64> {
        let entry = self.inner.values.get(key)?;

        if entry.value().is_expired() {
            // Drop the read reference before removing
            drop(entry);
            // Use remove_if to atomically verify expiration and remove.
            // This prevents a race where another thread replaces the entry
            // between our check and removal, which would drop a live value.
            let _ = self.inner.values.remove_if(key, |_, v| v.is_expired());
            return None;
        }

        Some(entry.value().value())
    }

    fn set(&self, key: &str, value: i64, ttl: Duration) {
        // Cap TTL to ~100 years to prevent overflow when adding to Instant.
        // This value is used both as a maximum for explicit TTLs and as the
        // "never expire" duration when TTL is zero.
        const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

        // A zero TTL means "never expire" - implemented as expiring in ~100
        // years rather than using Option<Instant> to keep the entry simple
        // and avoid branching in hot paths.
        let safe_ttl = if ttl.is_zero() { MAX_TTL } else { ttl.min(MAX_TTL) };

        let expires_at = Instant::now() + safe_ttl;
        let _ = self
            .inner
            .values
            .insert(key.to_string(), Entry::new(value, expires_at));
    }

    fn delete(&self, key: &str) {
        let _ = self.inner.values.remove(key);
        let _ = self.inner.sets.remove(key);
    }

    fn set_add(&self, set: &str, member: &str) {
        self.inner
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string());
    }

    fn set_remove(&self, set: &str, member: &str) {
        let emptied = match self.inner.sets.get(set) {
            Some(members) => {
                let _ = members.remove(member);
                members.is_empty()
            }
            None => return,
        };

        // An emptied set reads the same as a missing one; drop the map entry
        // unless a concurrent set_add repopulated it in the meantime.
        if emptied {
            let _ = self.inner.sets.remove_if(set, |_, members| members.is_empty());
        }
    }

    fn set_members(&self, set: &str) -> Vec<String> {
        match self.inner.sets.get(set) {
            Some(members) => members.iter().map(|m| m.key().clone()).collect(),
            None => Vec::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        // Signal the janitor task to stop when the store is dropped
        let _ = self.shutdown_tx.send(true);
    }
}
