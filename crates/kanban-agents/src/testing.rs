//! Test doubles shared by the agent unit tests.

use async_trait::async_trait;
use kanban_bus::{BusError, MemoryBus, MessageBus, Subscription};

/// An in-process bus whose publishes to one topic always fail.
pub struct FailingBus {
    inner: MemoryBus,
    topic: &'static str,
}

impl FailingBus {
    /// Fail every publish on `topic`; everything else goes through.
    pub fn on(topic: &'static str) -> Self {
        Self {
            inner: MemoryBus::new(),
            topic,
        }
    }
}

#[async_trait]
impl MessageBus for FailingBus {
    async fn publish_payload(&self, topic: &str, payload: String) -> Result<(), BusError> {
        if topic == self.topic {
            return Err(BusError::Closed);
        }
        self.inner.publish_payload(topic, payload).await
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError> {
        self.inner.subscribe(topic).await
    }
}
