//! Error types for the `kanban` binary.
//!
//! [`EngineError`] wraps every failure that can stop a process during
//! startup or while its agent runs.

/// Top-level error for the `kanban` binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: kanban_core::ConfigError,
    },

    /// The product-to-parts table could not be loaded.
    #[error("parts table error: {source}")]
    PartsTable {
        /// The underlying table error.
        #[from]
        source: kanban_core::PartsTableError,
    },

    /// The counter store could not be reached.
    #[error("counter store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: kanban_store::StoreError,
    },

    /// The message bus could not be reached.
    #[error("message bus error: {source}")]
    Bus {
        /// The underlying bus error.
        #[from]
        source: kanban_bus::BusError,
    },

    /// The agent stopped on a fatal error.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: kanban_core::AgentError,
    },
}
