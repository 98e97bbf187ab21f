use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::store::KeyValueStore;

/// Prefix applied to every counter identifier. All store keys created by this
/// crate live under it, so counters never collide with unrelated store
/// contents. The format is wire-compatible with existing deployments and must
/// not change.
const KEY_PREFIX: &str = "temporal::";

/// Separator between a counter's namespaced identifier and an adjustment key.
const KEY_SEPARATOR: &str = "::";

/// Process-wide store handle shared by all counters.
///
/// All counters in a process are expected to talk to the same store, so the
/// handle is deliberately process-wide: configure it once via [`set_store`]
/// (or [`Counter::with_store`]) and every counter uses it.
static SHARED_STORE: RwLock<Option<Arc<dyn KeyValueStore>>> = RwLock::new(None);

/// Configures the process-wide store handle used by all counters.
///
/// Replacing an already-configured handle is allowed; counters constructed
/// with [`Counter::new`] pick up the replacement on their next operation.
pub fn set_store(store: Arc<dyn KeyValueStore>) {
    let mut shared = SHARED_STORE
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *shared = Some(store);
}

fn shared_store() -> Result<Arc<dyn KeyValueStore>> {
    SHARED_STORE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(Error::StoreNotConfigured)
}

/// A named integer counter whose current value is a fixed initial number plus
/// the sum of all live adjustments.
///
/// Adjustments are non-zero integers registered under caller-supplied keys,
/// each with an optional time-to-live after which the store expires them on
/// its own. The counter holds no cached state between calls: every read
/// recomputes the aggregate from the store, pruning index entries whose
/// values have expired along the way. A `Counter` is therefore a lightweight
/// handle - any process that reconstructs one with the same identifier and
/// initial number reads the same aggregate.
///
/// No compound operation is atomic as a whole. Concurrent callers may observe
/// intermediate states between the index mutation and the value mutation;
/// the design favors lazy self-healing on the next read over cross-call
/// locking.
///
/// # Example
///
/// ```rust
/// use temporal_counter::{Counter, MemoryStore};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let store = Arc::new(MemoryStore::new());
/// let counter = Counter::with_store("capacity", 10, store);
///
/// assert_eq!(counter.register("burst", 2, Duration::ZERO)?, 12);
/// assert_eq!(counter.delete("burst")?, 10);
/// # Ok::<(), temporal_counter::Error>(())
/// ```
#[derive(Clone)]
pub struct Counter {
    /// Namespaced identifier; doubles as the membership-set key
    identifier: String,
    initial_number: i64,
    /// Store bound at construction, if any; falls back to the shared handle
    store: Option<Arc<dyn KeyValueStore>>,
}

impl std::fmt::Debug for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Counter")
            .field("identifier", &self.identifier)
            .field("initial_number", &self.initial_number)
            .finish_non_exhaustive()
    }
}

impl Counter {
    /// Creates a counter bound to `identifier` with the given baseline.
    ///
    /// The identifier is namespaced internally; the store is not touched.
    /// Operations use the process-wide handle configured via [`set_store`].
    pub fn new(identifier: impl AsRef<str>, initial_number: i64) -> Self {
        Self {
            identifier: format!("{}{}", KEY_PREFIX, identifier.as_ref()),
            initial_number,
            store: None,
        }
    }

    /// Creates a counter and installs `store` as the process-wide handle.
    ///
    /// The counter also keeps its own reference, so it stays bound to this
    /// store even if the process-wide handle is later replaced.
    pub fn with_store(
        identifier: impl AsRef<str>,
        initial_number: i64,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        set_store(Arc::clone(&store));
        Self {
            store: Some(store),
            ..Self::new(identifier, initial_number)
        }
    }

    /// Returns the immutable baseline supplied at construction.
    ///
    /// The baseline is never persisted: every client must reconstruct its
    /// counters with the same initial number to read consistent aggregates.
    pub fn initial_number(&self) -> i64 {
        self.initial_number
    }

    fn store(&self) -> Result<Arc<dyn KeyValueStore>> {
        match &self.store {
            Some(store) => Ok(Arc::clone(store)),
            None => shared_store(),
        }
    }

    fn adjustment_key(&self, key: &str) -> String {
        format!("{}{}{}", self.identifier, KEY_SEPARATOR, key)
    }

    /// Recomputes the current aggregate from the store.
    ///
    /// Walks the membership set, summing every adjustment value still present
    /// onto the initial number. Members whose value has expired (or otherwise
    /// vanished) are pruned from the set as a byproduct of the read, so the
    /// index is self-healing: an aggregate is never read without repairing it.
    ///
    /// The sum saturates at the `i64` bounds rather than overflowing.
    ///
    /// # Errors
    ///
    /// Fails only when no store handle is configured.
    pub fn current_number(&self) -> Result<i64> {
        let store = self.store()?;

        let mut total = self.initial_number;

        for member in store.set_members(&self.identifier) {
            match store.get(&member) {
                Some(value) => total = total.saturating_add(value),
                None => {
                    tracing::debug!("PRUNE {} (expired member of {})", member, self.identifier);
                    store.set_remove(&self.identifier, &member);
                }
            }
        }

        Ok(total)
    }

    /// Registers an adjustment of `number` under `key` and returns the new
    /// aggregate.
    ///
    /// A non-zero `ttl` makes the store expire the adjustment on its own
    /// after that duration; `Duration::ZERO` keeps it until explicitly
    /// deleted. Registering the same key twice overwrites the previous value
    /// and ttl - the last write wins, it does not accumulate.
    ///
    /// # Errors
    ///
    /// Rejects an empty `key` or a zero `number` before touching the store;
    /// fails with [`Error::StoreNotConfigured`] when no handle is set.
    pub fn register(&self, key: &str, number: i64, ttl: Duration) -> Result<i64> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        if number == 0 {
            return Err(Error::ZeroAdjustment);
        }

        let store = self.store()?;
        let adjustment_key = self.adjustment_key(key);

        tracing::trace!("REGISTER {} = {} (ttl: {:?})", adjustment_key, number, ttl);

        store.set_add(&self.identifier, &adjustment_key);
        store.set(&adjustment_key, number, ttl);

        self.current_number()
    }

    /// Removes the adjustment registered under `key` and returns the new
    /// aggregate.
    ///
    /// Both the index entry and the value are removed; deleting a key that
    /// was never registered (or already expired) is a no-op, not an error.
    ///
    /// # Errors
    ///
    /// Rejects an empty `key`; fails with [`Error::StoreNotConfigured`] when
    /// no handle is set.
    pub fn delete(&self, key: &str) -> Result<i64> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }

        let store = self.store()?;
        let adjustment_key = self.adjustment_key(key);

        tracing::trace!("DELETE {}", adjustment_key);

        store.set_remove(&self.identifier, &adjustment_key);
        store.delete(&adjustment_key);

        self.current_number()
    }

    /// Removes the whole membership set and returns the initial number.
    ///
    /// Deleting the set is sufficient to reset the counter: the set is the
    /// sole index of adjustment keys, so untracked values simply age out via
    /// their ttl. The return value is the baseline directly, not a
    /// recomputation through the store.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::ResetContention`] when the set is non-empty right
    /// after its deletion, which means a concurrent writer raced the reset;
    /// fails with [`Error::StoreNotConfigured`] when no handle is set.
    pub fn reset(&self) -> Result<i64> {
        let store = self.store()?;

        tracing::debug!("RESET {}", self.identifier);

        store.delete(&self.identifier);

        // Postcondition: the index must be empty once its key is gone
        if !store.set_members(&self.identifier).is_empty() {
            return Err(Error::ResetContention {
                identifier: self.identifier.clone(),
            });
        }

        Ok(self.initial_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::OnceLock;

    /// Store shared by the tests in this module; each test uses a distinct
    /// counter identifier so they never see each other's keys.
    fn test_store() -> Arc<MemoryStore> {
        static STORE: OnceLock<Arc<MemoryStore>> = OnceLock::new();
        Arc::clone(STORE.get_or_init(|| Arc::new(MemoryStore::new())))
    }

    fn counter(identifier: &str, initial_number: i64) -> Counter {
        Counter::with_store(identifier, initial_number, test_store())
    }

    #[test]
    fn test_initial_number_accessor() {
        let c = Counter::new("unit_initial", 42);
        assert_eq!(c.initial_number(), 42);
    }

    #[test]
    fn test_empty_key_rejected_before_store_access() {
        // No store needed: precondition checks come first
        let c = Counter::new("unit_empty_key", 0);
        assert_eq!(c.register("", 1, Duration::ZERO), Err(Error::EmptyKey));
        assert_eq!(c.delete(""), Err(Error::EmptyKey));
    }

    #[test]
    fn test_zero_adjustment_rejected() {
        let c = Counter::new("unit_zero_value", 0);
        assert_eq!(c.register("k", 0, Duration::ZERO), Err(Error::ZeroAdjustment));
    }

    #[test]
    fn test_key_namespacing_format() {
        let store = test_store();
        let c = counter("unit_format", 0);

        c.register("slot", 7, Duration::ZERO).unwrap();

        // Exact key layout is part of the store contract
        assert_eq!(store.get("temporal::unit_format::slot"), Some(7));
        assert_eq!(
            store.set_members("temporal::unit_format"),
            vec!["temporal::unit_format::slot"]
        );
    }

    #[test]
    fn test_reregister_overwrites() {
        let c = counter("unit_overwrite", 0);

        assert_eq!(c.register("k", 2, Duration::ZERO).unwrap(), 2);
        // Last write wins; contributions do not accumulate per key
        assert_eq!(c.register("k", -3, Duration::ZERO).unwrap(), -3);
    }

    #[test]
    fn test_stale_members_pruned_on_read() {
        let store = test_store();
        let c = counter("unit_prune", 0);

        c.register("gone", 5, Duration::from_millis(20)).unwrap();
        c.register("kept", 1, Duration::ZERO).unwrap();
        assert_eq!(store.set_members("temporal::unit_prune").len(), 2);

        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(c.current_number().unwrap(), 1);
        assert_eq!(
            store.set_members("temporal::unit_prune"),
            vec!["temporal::unit_prune::kept"]
        );
    }

    #[test]
    fn test_aggregate_saturates_at_i64_bounds() {
        let high = counter("unit_saturation_high", 10);
        assert_eq!(high.register("huge", i64::MAX, Duration::ZERO).unwrap(), i64::MAX);

        let low = counter("unit_saturation_low", -10);
        assert_eq!(low.register("deep", i64::MIN, Duration::ZERO).unwrap(), i64::MIN);
    }

    #[test]
    fn test_counters_share_one_store() {
        let _ = counter("unit_shared_a", 0);
        // Constructed without an explicit store: picks up the shared handle
        let b = Counter::new("unit_shared_b", 3);

        assert_eq!(b.current_number().unwrap(), 3);
    }

    /// Store whose `delete` never takes effect, standing in for a writer
    /// that repopulates the membership set while a reset is in flight.
    struct SetRetainingStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for SetRetainingStore {
        fn get(&self, key: &str) -> Option<i64> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: i64, ttl: Duration) {
            self.inner.set(key, value, ttl)
        }

        fn delete(&self, _key: &str) {}

        fn set_add(&self, set: &str, member: &str) {
            self.inner.set_add(set, member)
        }

        fn set_remove(&self, set: &str, member: &str) {
            self.inner.set_remove(set, member)
        }

        fn set_members(&self, set: &str) -> Vec<String> {
            self.inner.set_members(set)
        }
    }

    #[test]
    fn test_reset_surfaces_racing_writer() {
        let store = Arc::new(SetRetainingStore {
            inner: MemoryStore::new(),
        });
        let c = Counter::with_store("unit_reset_race", 10, store);

        c.register("k", -2, Duration::ZERO).unwrap();

        // The set key survives its deletion, so the postcondition must trip
        assert_eq!(
            c.reset(),
            Err(Error::ResetContention {
                identifier: "temporal::unit_reset_race".to_string(),
            })
        );
    }

    #[test]
    fn test_reset_leaves_values_to_age_out() {
        let store = test_store();
        let c = counter("unit_reset_gc", 10);

        c.register("k", -2, Duration::from_secs(60)).unwrap();
        assert_eq!(c.reset().unwrap(), 10);

        // The index is gone; the orphaned value ages out via its ttl
        assert!(store.set_members("temporal::unit_reset_gc").is_empty());
        assert_eq!(store.get("temporal::unit_reset_gc::k"), Some(-2));

        // A fresh read sees only the baseline
        assert_eq!(c.current_number().unwrap(), 10);
    }
}
