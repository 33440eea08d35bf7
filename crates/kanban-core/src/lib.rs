//! Configuration, agent runtime, and readiness handshake for the kanban
//! production network.
//!
//! This crate sits between the shared infrastructure (`kanban-store`,
//! `kanban-bus`) and the concrete roles in `kanban-agents`. It knows how to
//! run *an* agent, not what any particular agent does.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with defaults and env overrides
//! - [`parts_table`] -- Product-to-parts table loaded by every line
//! - [`agent`] -- The [`Agent`] trait and [`AgentError`]
//! - [`handshake`] -- Warehouse readiness announcement and wait
//! - [`runtime`] -- Listener task plus bounded day scheduler

pub mod agent;
pub mod config;
pub mod handshake;
pub mod parts_table;
pub mod runtime;

pub use agent::{Agent, AgentError};
pub use config::{ConfigError, KanbanConfig};
pub use parts_table::{PartsTableError, ProductPartsTable};
pub use runtime::{RunOptions, RunSummary, run};
