//! # Temporal Counter
//!
//! Named integer counters whose current value is a fixed baseline plus a
//! collection of time-limited adjustments, each expiring automatically after
//! a configured lifetime. Useful when a baseline quantity (available
//! capacity, remaining quota) needs temporary, self-expiring modifications
//! without a sweeper process.
//!
//! ## Features
//!
//! - Aggregate reconstructed from the store on every read - counters are
//!   stateless handles any process can recreate
//! - Adjustments expire on their own via the store's TTL support
//! - Self-healing index: stale entries are pruned as a byproduct of reads
//! - Pluggable [`KeyValueStore`] backend; a thread-safe [`MemoryStore`]
//!   (lock-free via `DashMap`, optional background janitor) is included
//!
//! ## Example
//!
//! ```rust
//! use temporal_counter::{Counter, MemoryStore};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), temporal_counter::Error> {
//! let store = Arc::new(MemoryStore::new());
//!
//! // 10 slots of capacity, with temporary adjustments
//! let capacity = Counter::with_store("capacity", 10, store);
//!
//! assert_eq!(capacity.register("burst", 2, Duration::ZERO)?, 12);
//! assert_eq!(capacity.register("maintenance", -3, Duration::from_secs(600))?, 9);
//!
//! // After ten minutes the maintenance adjustment expires on its own
//! // and the aggregate returns to 12; no sweeper involved.
//!
//! assert_eq!(capacity.delete("burst")?, 7);
//! assert_eq!(capacity.reset()?, 10);
//! # Ok(())
//! # }
//! ```

mod config;
mod counter;
mod entry;
mod error;
mod store;

pub use config::StoreConfig;
pub use counter::{set_store, Counter};
pub use entry::Entry;
pub use error::{Error, Result};
pub use store::{KeyValueStore, MemoryStore};
