//! Error types for counter operations.

use thiserror::Error;

/// Errors surfaced by [`Counter`](crate::Counter) operations.
///
/// Precondition violations (`EmptyKey`, `ZeroAdjustment`) are raised before
/// any store access. `StoreNotConfigured` means no store handle was bound to
/// the process or the counter. None of these are retried internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No key-value store handle has been configured
    #[error("key-value store hasn't been set; call set_store or Counter::with_store first")]
    StoreNotConfigured,

    /// Adjustment keys must be non-empty strings
    #[error("adjustment key must be a non-empty string")]
    EmptyKey,

    /// Adjustment values must be integers different from zero
    #[error("adjustment value must be a non-zero integer")]
    ZeroAdjustment,

    /// The membership set was still non-empty right after a reset deleted it,
    /// which means a concurrent writer raced the reset
    #[error("membership set for `{identifier}` not empty after reset (concurrent writer)")]
    ResetContention {
        /// Namespaced identifier of the counter being reset
        identifier: String,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
