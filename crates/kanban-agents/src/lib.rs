//! The roles of the kanban production network.
//!
//! Each agent implements [`kanban_core::Agent`] and is driven by
//! [`kanban_core::run`]. Agents talk only through the message bus and the
//! shared counter store, never through direct calls.
//!
//! # Modules
//!
//! - [`warehouse`] -- Central part stock, restock queue, supplier cycle
//! - [`line`] -- Local part stock, production orders, restock requests
//! - [`factory`] -- Finished-goods snapshot and daily line orders
//! - [`market`] -- Supplier and sales counterparts

pub mod factory;
pub mod line;
pub mod market;
pub mod warehouse;

#[cfg(test)]
mod testing;

pub use factory::{FactoryAgent, FactorySettings};
pub use line::{LineAgent, LineSettings, ProductionOutcome};
pub use market::{SalesAgent, SalesSettings, SupplierAgent};
pub use warehouse::{RestockRequest, ShipmentOutcome, WarehouseAgent, WarehouseSettings};
