use std::time::Instant;

/// Represents a stored integer with its expiration time
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    value: i64,
    expires_at: Instant,
}

impl Entry {
    /// Creates a new entry with the given value and expiration time
    pub fn new(value: i64, expires_at: Instant) -> Self {
        Self { value, expires_at }
    }

    /// Returns the stored value
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Checks if this entry has expired
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}
