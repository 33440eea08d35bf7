//! Error types for the counter store.
//!
//! All errors are propagated via [`StoreError`] which wraps the underlying
//! [`fred`] errors with additional context about which operation failed.

/// Errors that can occur while reading or updating counters.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A stored value is not an integer counter.
    #[error("key {key} does not hold an integer: {value}")]
    NotAnInteger {
        /// The key that was read.
        key: String,
        /// The raw stored value.
        value: String,
    },

    /// A configuration error (bad URL, etc.).
    #[error("Configuration error: {0}")]
    Config(String),
}
