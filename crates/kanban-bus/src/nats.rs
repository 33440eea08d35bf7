//! NATS pub/sub adapter.
//!
//! Topics map one-to-one onto NATS subjects. Subject tokens are split on
//! `.`, and none of the network's topic names contain one, so names such as
//! `factory:1:line:2` are used verbatim.

use async_trait::async_trait;
use futures::StreamExt as _;
use tracing::{debug, info};

use crate::error::BusError;
use crate::{BusMessage, MessageBus, Subscription};

/// NATS client wrapper.
///
/// Manages a single NATS connection shared by an agent's listener and
/// scheduler. Cloning shares the connection.
#[derive(Clone)]
pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Nats`] if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// Flush all pending messages to the NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Nats`] if the flush operation fails.
    pub async fn flush(&self) -> Result<(), BusError> {
        self.client
            .flush()
            .await
            .map_err(|e| BusError::Nats(format!("flush failed: {e}")))
    }
}

#[async_trait]
impl MessageBus for NatsBus {
    async fn publish_payload(&self, topic: &str, payload: String) -> Result<(), BusError> {
        self.client
            .publish(topic.to_owned(), payload.into())
            .await
            .map_err(|e| BusError::Nats(format!("failed to publish to {topic}: {e}")))
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError> {
        debug!(topic, "subscribing");
        let subscriber = self
            .client
            .subscribe(topic.to_owned())
            .await
            .map_err(|e| BusError::Nats(format!("failed to subscribe to {topic}: {e}")))?;
        // Make sure the SUB reached the server before callers announce
        // anything that depends on it.
        self.flush().await?;
        info!(topic, "subscribed");

        let stream = subscriber.map(|message| BusMessage {
            topic: message.subject.to_string(),
            payload: String::from_utf8_lossy(&message.payload).into_owned(),
        });
        Ok(Subscription::new(stream.boxed()))
    }
}

impl core::fmt::Debug for NatsBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NatsBus")
            .field("state", &self.client.connection_state())
            .finish()
    }
}
