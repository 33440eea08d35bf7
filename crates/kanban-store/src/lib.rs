//! Shared counter store for the kanban production network.
//!
//! Every stock level in the network (warehouse parts, line parts, finished
//! products) is an integer counter in a Redis-compatible store. Agents only
//! ever touch counters through the atomic primitives of [`CounterStore`], so
//! a listener and a scheduler inside one agent can update the same keys
//! concurrently without a lock of their own.
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) adapter over `fred`
//! - [`memory`] -- In-process adapter with one atomic cell per key
//! - [`error`] -- Shared error types

pub mod dragonfly;
pub mod error;
pub mod memory;

use async_trait::async_trait;

// Re-export primary types for convenience.
pub use dragonfly::DragonflyCounters;
pub use error::StoreError;
pub use memory::MemoryCounters;

/// Keyed integer counters with atomic increment and decrement.
///
/// Missing keys read as `0`. Increments and decrements are atomic per key;
/// nothing in this interface spans several keys atomically.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Read one counter (`GET`), `0` when absent.
    async fn get(&self, key: &str) -> Result<i64, StoreError>;

    /// Atomically add `n` (`INCRBY`) and return the new value.
    async fn incr_by(&self, key: &str, n: i64) -> Result<i64, StoreError>;

    /// Atomically subtract `n` (`DECRBY`) and return the new value.
    async fn decr_by(&self, key: &str, n: i64) -> Result<i64, StoreError>;

    /// Read several counters at once (`MGET`), in the order of `keys`.
    async fn mget(&self, keys: &[String]) -> Result<Vec<i64>, StoreError>;

    /// Subtract `n` from every key in `keys`.
    ///
    /// Each decrement is atomic on its own; the batch is not a transaction.
    /// Adapters may override this to send the batch in one round trip.
    async fn decr_many(&self, keys: &[String], n: i64) -> Result<(), StoreError> {
        for key in keys {
            self.decr_by(key, n).await?;
        }
        Ok(())
    }
}
