//! Error types for the message bus.

/// Errors that can occur while publishing or subscribing.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Failed to connect to or communicate with the NATS server.
    #[error("NATS error: {0}")]
    Nats(String),

    /// The bus was shut down while an operation was in flight.
    #[error("bus closed")]
    Closed,
}
