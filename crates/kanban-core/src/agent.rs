//! The agent abstraction shared by every role in the network.
//!
//! An agent has two activities: a listener that reacts to decoded commands
//! on its subscribed topics, and a scheduler that does one unit of work per
//! simulated day. Both run against the same `&self`, so any state they
//! share must be atomic or behind a lock the agent owns.

use async_trait::async_trait;
use kanban_bus::BusError;
use kanban_store::StoreError;
use kanban_types::Command;

/// Errors raised by agent handlers and the runtime that drives them.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A counter-store operation failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// A bus operation failed.
    #[error("bus error: {source}")]
    Bus {
        /// The underlying bus error.
        #[from]
        source: BusError,
    },

    /// A production order named a product the parts table does not know.
    #[error("unknown product {product} (table has {known} products)")]
    UnknownProduct {
        /// Requested 0-based product index.
        product: usize,
        /// Number of products in the table.
        known: usize,
    },

    /// The readiness subscription closed before the warehouse announced.
    #[error("readiness subscription closed before the warehouse was ready")]
    HandshakeClosed,

    /// The inbound subscription ended while the scheduler was still running.
    #[error("listener stream closed")]
    ListenerClosed,

    /// The listener task panicked or was cancelled.
    #[error("listener task failed: {0}")]
    ListenerPanicked(String),
}

impl AgentError {
    /// Whether the process should stop rather than log and carry on.
    ///
    /// Store and bus hiccups are logged and retried on the next day; a
    /// misconfigured product table or a dead listener is not recoverable.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnknownProduct { .. }
                | Self::HandshakeClosed
                | Self::ListenerClosed
                | Self::ListenerPanicked(_)
        )
    }
}

/// A long-lived participant in the network.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Short label used in the agent's tracing span, such as `line:1:2`.
    fn entity(&self) -> &str;

    /// Topics the listener subscribes to.
    fn subscriptions(&self) -> Vec<String>;

    /// Called once every topic in [`subscriptions`](Self::subscriptions) is
    /// subscribed, before the listener starts and before the first day.
    async fn on_subscribed(&self) -> Result<(), AgentError> {
        Ok(())
    }

    /// React to one decoded inbound command.
    async fn handle(&self, command: Command) -> Result<(), AgentError>;

    /// Do one simulated day of scheduled work. `day` starts at 1.
    async fn on_day(&self, day: u32) -> Result<(), AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_not_fatal() {
        assert!(!AgentError::from(BusError::Closed).is_fatal());
        assert!(
            !AgentError::from(StoreError::Config("bad".to_owned())).is_fatal()
        );
    }

    #[test]
    fn configuration_and_listener_errors_are_fatal() {
        assert!(
            AgentError::UnknownProduct {
                product: 9,
                known: 5
            }
            .is_fatal()
        );
        assert!(AgentError::HandshakeClosed.is_fatal());
        assert!(AgentError::ListenerClosed.is_fatal());
    }
}
