//! In-process message bus.
//!
//! Each topic is a `tokio::sync::broadcast` channel created on first use.
//! Like the networked bus, a message published while nobody subscribes to
//! its topic is dropped.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use futures::StreamExt as _;
use futures::stream;
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::BusError;
use crate::{BusMessage, MessageBus, Subscription};

/// Per-topic buffer before slow subscribers start lagging.
const TOPIC_CAPACITY: usize = 1024;

/// Message bus living entirely in the current process.
#[derive(Debug, Default)]
pub struct MemoryBus {
    topics: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl MemoryBus {
    /// Create a bus with no topics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<String> {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic.to_owned())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish_payload(&self, topic: &str, payload: String) -> Result<(), BusError> {
        // An error here only means nobody is listening; the message is dropped.
        let _ = self.sender(topic).send(payload);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError> {
        let receiver = self.sender(topic).subscribe();
        let topic = topic.to_owned();
        let stream = stream::unfold(receiver, move |mut receiver| {
            let topic = topic.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(payload) => return Some((BusMessage { topic, payload }, receiver)),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(topic = %topic, skipped, "subscriber lagged, messages dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });
        Ok(Subscription::new(stream.boxed()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kanban_types::{Command, WireError};

    use super::*;

    #[tokio::test]
    async fn delivers_decoded_commands_to_subscribers() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscribe("control:warehouse_ready").await.unwrap();
        bus.publish("control:warehouse_ready", &Command::Ready)
            .await
            .unwrap();

        let delivery = sub.next().await.unwrap();
        assert_eq!(delivery.topic, "control:warehouse_ready");
        assert_eq!(delivery.command, Ok(Command::Ready));
    }

    #[tokio::test]
    async fn every_subscriber_gets_a_copy() {
        let bus = MemoryBus::new();
        let mut a = bus.subscribe("channel:factory").await.unwrap();
        let mut b = bus.subscribe("channel:factory").await.unwrap();
        assert_eq!(bus.subscriber_count("channel:factory"), 2);

        let snapshot = Command::UpdateFactory {
            stock: vec![1, 2, 3],
        };
        bus.publish("channel:factory", &snapshot).await.unwrap();

        assert_eq!(a.next().await.unwrap().command, Ok(snapshot.clone()));
        assert_eq!(b.next().await.unwrap().command, Ok(snapshot));
    }

    #[tokio::test]
    async fn messages_before_subscription_are_lost() {
        let bus = MemoryBus::new();
        bus.publish("channel:warehouse", &Command::Ready)
            .await
            .unwrap();
        let mut sub = bus.subscribe("channel:warehouse").await.unwrap();
        bus.publish_payload("channel:warehouse", "receive_parts/1,2".to_owned())
            .await
            .unwrap();

        let delivery = sub.next().await.unwrap();
        assert_eq!(
            delivery.command,
            Ok(Command::ReceiveParts {
                amounts: vec![1, 2]
            })
        );
    }

    #[tokio::test]
    async fn malformed_payloads_surface_as_wire_errors() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscribe("channel:supplier").await.unwrap();
        bus.publish_payload("channel:supplier", "sing/loud".to_owned())
            .await
            .unwrap();

        let delivery = sub.next().await.unwrap();
        assert_eq!(delivery.payload, "sing/loud");
        assert_eq!(
            delivery.command,
            Err(WireError::UnknownCommand("sing".to_owned()))
        );
    }

    #[tokio::test]
    async fn merged_subscription_sees_both_topics() {
        let bus = MemoryBus::new();
        let first = bus.subscribe("a").await.unwrap();
        let second = bus.subscribe("b").await.unwrap();
        let mut merged = Subscription::merge(vec![first, second]);

        bus.publish("b", &Command::Ready).await.unwrap();
        bus.publish("a", &Command::Ready).await.unwrap();

        let mut topics = vec![
            merged.next().await.unwrap().topic,
            merged.next().await.unwrap().topic,
        ];
        topics.sort();
        assert_eq!(topics, vec!["a".to_owned(), "b".to_owned()]);
    }
}
