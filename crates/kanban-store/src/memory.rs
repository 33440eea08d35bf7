//! In-process counter store.
//!
//! One [`AtomicI64`] per key behind a read-mostly map: lookups of existing
//! keys take only the shared read lock, and the write lock is held just long
//! enough to insert a new cell. Updates to different keys never contend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::CounterStore;
use crate::error::StoreError;

/// Counter store living entirely in the current process.
#[derive(Debug, Default)]
pub struct MemoryCounters {
    cells: RwLock<HashMap<String, Arc<AtomicI64>>>,
}

impl MemoryCounters {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a counter. Used to seed stock in tests and demos.
    pub fn set(&self, key: &str, value: i64) {
        self.cell(key).store(value, Ordering::SeqCst);
    }

    /// Read a counter without going through the async interface.
    pub fn value(&self, key: &str) -> i64 {
        self.cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map_or(0, |cell| cell.load(Ordering::SeqCst))
    }

    fn cell(&self, key: &str) -> Arc<AtomicI64> {
        if let Some(cell) = self
            .cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Arc::clone(cell);
        }
        let mut cells = self.cells.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cells.entry(key.to_owned()).or_default())
    }
}

#[async_trait]
impl CounterStore for MemoryCounters {
    async fn get(&self, key: &str) -> Result<i64, StoreError> {
        Ok(self.value(key))
    }

    async fn incr_by(&self, key: &str, n: i64) -> Result<i64, StoreError> {
        let previous = self.cell(key).fetch_add(n, Ordering::SeqCst);
        Ok(previous.wrapping_add(n))
    }

    async fn decr_by(&self, key: &str, n: i64) -> Result<i64, StoreError> {
        let previous = self.cell(key).fetch_sub(n, Ordering::SeqCst);
        Ok(previous.wrapping_sub(n))
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<i64>, StoreError> {
        Ok(keys.iter().map(|key| self.value(key)).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_keys_read_as_zero() {
        let store = MemoryCounters::new();
        assert_eq!(store.get("warehouse:part:0").await.unwrap(), 0);
        assert_eq!(
            store
                .mget(&["a".to_owned(), "b".to_owned()])
                .await
                .unwrap(),
            vec![0, 0]
        );
    }

    #[tokio::test]
    async fn incr_and_decr_return_new_value() {
        let store = MemoryCounters::new();
        assert_eq!(store.incr_by("k", 10).await.unwrap(), 10);
        assert_eq!(store.decr_by("k", 3).await.unwrap(), 7);
        assert_eq!(store.value("k"), 7);
    }

    #[tokio::test]
    async fn decr_many_touches_every_key() {
        let store = MemoryCounters::new();
        store.set("a", 5);
        store.set("b", 9);
        store
            .decr_many(&["a".to_owned(), "b".to_owned()], 2)
            .await
            .unwrap();
        assert_eq!(store.mget(&["a".to_owned(), "b".to_owned()]).await.unwrap(), vec![3, 7]);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryCounters::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for _ in 0..1000 {
                    store.incr_by("hot", 1).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.value("hot"), 8000);
    }
}
