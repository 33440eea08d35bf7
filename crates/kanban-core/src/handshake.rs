//! Warehouse readiness handshake.
//!
//! The warehouse announces [`Command::Ready`] on [`READY_TOPIC`] as soon as
//! its inbound subscription is live. Lines subscribe to the control topic
//! before anything else and block on the first announcement, so their
//! restock requests never go out while nobody is listening.

use kanban_bus::{BusError, MessageBus, Subscription};
use kanban_types::Command;
use kanban_types::keys::READY_TOPIC;
use tracing::{debug, info, warn};

use crate::agent::AgentError;

/// Publish the readiness signal.
///
/// # Errors
///
/// Returns [`BusError`] if the publish fails.
pub async fn announce_ready(bus: &dyn MessageBus) -> Result<(), BusError> {
    bus.publish(READY_TOPIC, &Command::Ready).await?;
    debug!("announced warehouse readiness");
    Ok(())
}

/// Subscribe to the readiness control topic.
///
/// # Errors
///
/// Returns [`BusError`] if the subscription cannot be created.
pub async fn subscribe_readiness(bus: &dyn MessageBus) -> Result<Subscription, BusError> {
    bus.subscribe(READY_TOPIC).await
}

/// Block until a readiness signal arrives on `subscription`.
///
/// Anything other than [`Command::Ready`] on the control topic is skipped.
///
/// # Errors
///
/// Returns [`AgentError::HandshakeClosed`] if the stream ends first.
pub async fn await_ready(subscription: &mut Subscription) -> Result<(), AgentError> {
    info!("waiting for warehouse readiness");
    while let Some(delivery) = subscription.next().await {
        match delivery.command {
            Ok(Command::Ready) => {
                info!("warehouse is ready");
                return Ok(());
            }
            Ok(other) => debug!(command = other.keyword(), "ignoring non-ready control message"),
            Err(e) => warn!(payload = %delivery.payload, error = %e, "malformed control message"),
        }
    }
    Err(AgentError::HandshakeClosed)
}
