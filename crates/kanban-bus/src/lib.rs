//! Topic-based publish/subscribe for the kanban production network.
//!
//! Delivery is at-least-once to whoever is subscribed when a message is
//! published; nothing is persisted for late subscribers and there is no
//! ordering between distinct topics. Payloads are decoded into
//! [`Command`] exactly once, as they leave the bus, so agents never
//! string-match commands themselves.
//!
//! # Modules
//!
//! - [`nats`] -- NATS adapter over `async-nats`
//! - [`memory`] -- In-process adapter over `tokio::sync::broadcast`
//! - [`error`] -- Shared error types

pub mod error;
pub mod memory;
pub mod nats;

use async_trait::async_trait;
use futures::StreamExt as _;
use futures::stream::{self, BoxStream};
use kanban_types::{Command, WireError};
use tracing::debug;

pub use error::BusError;
pub use memory::MemoryBus;
pub use nats::NatsBus;

/// A raw message as it arrives from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Topic the message was published on.
    pub topic: String,
    /// Slash-delimited payload.
    pub payload: String,
}

/// A message after decoding at the bus boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Topic the message was published on.
    pub topic: String,
    /// The raw payload, kept for diagnostics.
    pub payload: String,
    /// The decoded command, or why it could not be decoded.
    pub command: Result<Command, WireError>,
}

impl From<BusMessage> for Delivery {
    fn from(message: BusMessage) -> Self {
        let command = Command::decode(&message.payload);
        Self {
            topic: message.topic,
            payload: message.payload,
            command,
        }
    }
}

/// An inbound message stream for one or more topics.
pub struct Subscription {
    inner: BoxStream<'static, BusMessage>,
}

impl Subscription {
    /// Wrap a transport stream.
    pub fn new(inner: BoxStream<'static, BusMessage>) -> Self {
        Self { inner }
    }

    /// Merge several subscriptions into one stream.
    ///
    /// Messages from different topics interleave in arrival order.
    pub fn merge(subscriptions: Vec<Self>) -> Self {
        Self::new(stream::select_all(subscriptions.into_iter().map(|s| s.inner)).boxed())
    }

    /// Wait for the next message and decode it.
    ///
    /// Returns `None` once the underlying transport closes.
    pub async fn next(&mut self) -> Option<Delivery> {
        let message = self.inner.next().await?;
        debug!(topic = %message.topic, payload = %message.payload, "message received");
        Some(Delivery::from(message))
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Topic-based publish/subscribe transport.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish a raw payload on `topic`.
    async fn publish_payload(&self, topic: &str, payload: String) -> Result<(), BusError>;

    /// Subscribe to `topic`. Only messages published after this returns
    /// are guaranteed to be delivered.
    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError>;

    /// Encode and publish a command on `topic`.
    async fn publish(&self, topic: &str, command: &Command) -> Result<(), BusError> {
        let payload = command.encode();
        debug!(topic, payload = %payload, "publishing");
        self.publish_payload(topic, payload).await
    }
}
