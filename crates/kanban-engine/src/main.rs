//! `kanban`: runs one agent of the kanban production network.
//!
//! Every role is its own process, talking to the others only through
//! NATS and the shared `Dragonfly` counters.
//!
//! # Startup Sequence
//!
//! 1. Parse the command line (role and its identifiers)
//! 2. Load configuration from `kanban-config.yaml`
//! 3. Initialize structured logging (tracing)
//! 4. Connect to NATS, and to `Dragonfly` for roles that own stock
//! 5. Build the agent (lines also load the product-to-parts table)
//! 6. Run the listener and day scheduler until `days_max` days pass

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use kanban_agents::{
    FactoryAgent, FactorySettings, LineAgent, LineSettings, SalesAgent, SalesSettings,
    SupplierAgent, WarehouseAgent, WarehouseSettings,
};
use kanban_bus::{MessageBus, NatsBus};
use kanban_core::config::{LogFormat, LoggingConfig};
use kanban_core::{Agent, KanbanConfig, ProductPartsTable, RunOptions};
use kanban_store::{CounterStore, DragonflyCounters};
use kanban_types::{FactoryId, FactoryKind, LineId};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

#[derive(Parser)]
#[command(
    name = "kanban",
    version,
    about = "Run one agent of the kanban production network"
)]
struct Cli {
    /// Config file path.
    #[arg(long, global = true, default_value = "kanban-config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand)]
enum Role {
    /// Central part stock and restock queue.
    Warehouse,

    /// One production line.
    Line {
        /// Line id within its factory (1-based).
        line_id: LineId,
        /// Factory the line belongs to.
        factory_id: FactoryId,
    },

    /// A factory ordering production from its lines.
    Factory {
        /// Ordering policy: `empurrada` (push) or `puxada` (pull).
        kind: FactoryKind,
        /// This factory's id.
        factory_id: FactoryId,
        /// Number of lines, addressed as `1..=lines_number`.
        lines_number: u32,
    },

    /// External parts supplier.
    Supplier,

    /// Sales channel and finished-goods snapshot.
    Sales,
}

impl Role {
    const fn name(&self) -> &'static str {
        match self {
            Self::Warehouse => "warehouse",
            Self::Line { .. } => "line",
            Self::Factory { .. } => "factory",
            Self::Supplier => "supplier",
            Self::Sales => "sales",
        }
    }

    const fn owns_stock(&self) -> bool {
        matches!(self, Self::Warehouse | Self::Line { .. } | Self::Sales)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, found) = load_config(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    init_tracing(&config.logging);
    if !found {
        info!(path = %cli.config.display(), "config file not found, using defaults");
    }

    info!(
        role = cli.role.name(),
        days_max = config.simulation.days_max,
        day_interval_ms = config.simulation.day_interval_ms,
        "kanban starting"
    );

    let bus: Arc<dyn MessageBus> = Arc::new(
        NatsBus::connect(&config.infrastructure.nats_url)
            .await
            .map_err(EngineError::from)?,
    );
    let store: Option<Arc<dyn CounterStore>> = if cli.role.owns_stock() {
        let counters = DragonflyCounters::connect(&config.infrastructure.dragonfly_url)
            .await
            .map_err(EngineError::from)?;
        Some(Arc::new(counters))
    } else {
        None
    };

    let wait_for_warehouse = matches!(cli.role, Role::Line { .. });
    let agent = build_agent(cli.role, &config, store, Arc::clone(&bus))?;
    let options = RunOptions::from_simulation(&config.simulation, wait_for_warehouse);

    kanban_core::run(agent, bus.as_ref(), options)
        .await
        .map_err(EngineError::from)?;
    Ok(())
}

/// Load the config file, or defaults when it does not exist. The flag
/// says whether the file was found, so it can be logged once tracing is up.
fn load_config(path: &Path) -> Result<(KanbanConfig, bool), EngineError> {
    let found = path.exists();
    let config = KanbanConfig::load_or_default(path)?;
    Ok((config, found))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn build_agent(
    role: Role,
    config: &KanbanConfig,
    store: Option<Arc<dyn CounterStore>>,
    bus: Arc<dyn MessageBus>,
) -> Result<Arc<dyn Agent>, EngineError> {
    let inv = &config.inventory;
    let market = &config.market;
    let agent: Arc<dyn Agent> = match (role, store) {
        (Role::Warehouse, Some(store)) => Arc::new(WarehouseAgent::new(
            WarehouseSettings {
                num_parts: inv.num_parts,
                shipment_amount: inv.warehouse_shipment_amount,
                red_alert: inv.warehouse_red_alert,
                yellow_alert: inv.warehouse_yellow_alert,
            },
            store,
            bus,
        )),
        (
            Role::Line {
                line_id,
                factory_id,
            },
            Some(store),
        ) => {
            let table = ProductPartsTable::load(Path::new(&inv.products_table_path), inv.num_parts)?;
            table.ensure_covers(inv.num_products)?;
            Arc::new(LineAgent::new(
                LineSettings {
                    line_id,
                    factory_id,
                    num_parts: inv.num_parts,
                    base_kit_size: inv.base_kit_size,
                    red_alert: inv.line_red_alert,
                    yellow_alert: inv.line_yellow_alert,
                },
                table,
                store,
                bus,
            ))
        }
        (Role::Sales, Some(store)) => Arc::new(SalesAgent::new(
            SalesSettings {
                num_products: inv.num_products,
                demand_min: market.sales_daily_demand_min,
                demand_max: market.sales_daily_demand_max,
                seed: market.sales_seed,
            },
            store,
            bus,
        )),
        (
            Role::Factory {
                kind,
                factory_id,
                lines_number,
            },
            _,
        ) => Arc::new(FactoryAgent::new(
            FactorySettings {
                kind,
                factory_id,
                lines: lines_number,
                num_products: inv.num_products,
                batch_size: inv.batch_size,
                product_red_alert: inv.product_red_alert,
            },
            bus,
        )),
        (Role::Supplier, _) => Arc::new(SupplierAgent::new(market.supplier_delivery_amount, bus)),
        (Role::Warehouse | Role::Line { .. } | Role::Sales, None) => {
            return Err(EngineError::Store {
                source: kanban_store::StoreError::Config(
                    "counter store required for this role".to_owned(),
                ),
            });
        }
    };
    Ok(agent)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_line_role() {
        let cli = Cli::try_parse_from(["kanban", "line", "2", "1"]).unwrap();
        assert!(matches!(
            cli.role,
            Role::Line { line_id, factory_id }
                if line_id == LineId::new(2) && factory_id == FactoryId::new(1)
        ));
        assert_eq!(cli.config, PathBuf::from("kanban-config.yaml"));
    }

    #[test]
    fn parses_factory_role_with_config() {
        let cli = Cli::try_parse_from([
            "kanban", "--config", "demo.yaml", "factory", "puxada", "3", "4",
        ])
        .unwrap();
        assert!(matches!(
            cli.role,
            Role::Factory { kind: FactoryKind::Pull, factory_id, lines_number: 4 }
                if factory_id == FactoryId::new(3)
        ));
        assert_eq!(cli.config, PathBuf::from("demo.yaml"));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        assert!(Cli::try_parse_from(["kanban", "line", "2"]).is_err());
        assert!(Cli::try_parse_from(["kanban", "factory", "sideways", "1", "2"]).is_err());
    }

    #[test]
    fn missing_config_file_is_reported_after_loading() {
        let (config, found) = load_config(Path::new("/nonexistent/kanban-config.yaml")).unwrap();
        assert!(!found);
        assert_eq!(config.simulation, KanbanConfig::default().simulation);

        let bundled = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../kanban-config.yaml");
        let (_, found) = load_config(&bundled).unwrap();
        assert!(found);
    }

    #[test]
    fn only_stock_owners_need_the_counter_store() {
        assert!(Role::Warehouse.owns_stock());
        assert!(Role::Sales.owns_stock());
        assert!(!Role::Supplier.owns_stock());
        assert!(
            !Role::Factory {
                kind: FactoryKind::Push,
                factory_id: FactoryId::new(1),
                lines_number: 1
            }
            .owns_stock()
        );
    }

    #[test]
    fn stock_roles_without_store_fail() {
        let bus: Arc<dyn MessageBus> = Arc::new(kanban_bus::MemoryBus::new());
        let result = build_agent(Role::Warehouse, &KanbanConfig::default(), None, bus);
        assert!(matches!(result, Err(EngineError::Store { .. })));
    }

    #[test]
    fn supplier_builds_without_store() {
        let bus: Arc<dyn MessageBus> = Arc::new(kanban_bus::MemoryBus::new());
        let agent = build_agent(Role::Supplier, &KanbanConfig::default(), None, bus).unwrap();
        assert_eq!(agent.entity(), "supplier");
    }
}
