//! `Dragonfly` (Redis-compatible) counter operations.
//!
//! Counters are plain string keys holding integers, updated with
//! `INCRBY`/`DECRBY` so every single-key update is atomic on the server.
//! Key shapes live in `kanban_types::keys`.

use async_trait::async_trait;
use fred::prelude::*;

use crate::CounterStore;
use crate::error::StoreError;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
///
/// Wraps a [`fred::prelude::Client`]. Cloning is cheap and shares the
/// underlying connection.
#[derive(Clone)]
pub struct DragonflyCounters {
    client: Client,
}

impl DragonflyCounters {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    /// Returns [`StoreError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!(url, "Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Flush all keys from the `Dragonfly` instance.
    ///
    /// **WARNING:** This deletes all data. Only use for testing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the flush fails.
    pub async fn flush_all(&self) -> Result<(), StoreError> {
        let _: () = self.client.flushall(false).await?;
        Ok(())
    }
}

impl core::fmt::Debug for DragonflyCounters {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DragonflyCounters")
            .field("connected", &self.client.is_connected())
            .finish()
    }
}

fn parse_counter(key: &str, raw: Option<String>) -> Result<i64, StoreError> {
    raw.map_or(Ok(0), |value| {
        value
            .trim()
            .parse::<i64>()
            .map_err(|e| StoreError::NotAnInteger {
                key: key.to_owned(),
                value: format!("{value} ({e})"),
            })
    })
}

#[async_trait]
impl CounterStore for DragonflyCounters {
    async fn get(&self, key: &str) -> Result<i64, StoreError> {
        let raw: Option<String> = self.client.get(key).await?;
        parse_counter(key, raw)
    }

    async fn incr_by(&self, key: &str, n: i64) -> Result<i64, StoreError> {
        let value: i64 = self.client.incr_by(key, n).await?;
        Ok(value)
    }

    async fn decr_by(&self, key: &str, n: i64) -> Result<i64, StoreError> {
        let value: i64 = self.client.decr_by(key, n).await?;
        Ok(value)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<i64>, StoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<Option<String>> = self.client.mget(keys.to_vec()).await?;
        keys.iter()
            .zip(raw)
            .map(|(key, value)| parse_counter(key, value))
            .collect()
    }

    async fn decr_many(&self, keys: &[String], n: i64) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let pipeline = self.client.pipeline();
        for key in keys {
            let _: () = pipeline.decr_by(key.as_str(), n).await?;
        }
        let _: Vec<i64> = pipeline.all().await?;
        Ok(())
    }
}
