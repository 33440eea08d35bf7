//! Shared type definitions for the kanban production network.
//!
//! Every agent (warehouse, lines, factories, supplier, sales) agrees on the
//! definitions in this crate: identifiers, kanban bands, counter key shapes,
//! topic names, and the message vocabulary exchanged over the bus.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe factory and line identifiers
//! - [`enums`] -- Kanban bands and factory ordering policies
//! - [`keys`] -- Counter-store keys and bus topics
//! - [`wire`] -- [`Command`] and its slash-delimited encoding

pub mod enums;
pub mod ids;
pub mod keys;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use enums::{FactoryKind, StockStatus, UnknownFactoryKind};
pub use ids::{FactoryId, LineId};
pub use wire::{Command, WireError};
