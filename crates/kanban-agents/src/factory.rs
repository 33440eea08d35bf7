//! Factory agent: turns the finished-goods snapshot into daily line orders.
//!
//! A factory owns no stock. It caches the most recent snapshot broadcast on
//! the factory topic, classifies it into a kanban band, and each day sends
//! one production order to every line it runs.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use kanban_bus::MessageBus;
use kanban_core::{Agent, AgentError};
use kanban_types::keys::{FACTORY_TOPIC, line_topic};
use kanban_types::{Command, FactoryId, FactoryKind, LineId, StockStatus};
use tracing::{debug, info, warn};

/// Static parameters of one factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorySettings {
    /// Push or pull ordering policy.
    pub kind: FactoryKind,
    /// This factory's id.
    pub factory_id: FactoryId,
    /// Number of lines, addressed as line ids `1..=lines`.
    pub lines: u32,
    /// Number of products in the snapshot.
    pub num_products: usize,
    /// Base lot size.
    pub batch_size: i64,
    /// Finished-goods red alert per line.
    pub product_red_alert: i64,
}

#[derive(Debug, Clone)]
struct Snapshot {
    stock: Vec<i64>,
    status: StockStatus,
}

/// Per-line product assignment for one day.
///
/// Push factories pin line `i` to product `i mod num_products`. Pull
/// factories rank products by ascending stock (ties keep product order) and
/// hand line `i` the product at rank `i mod num_products`.
pub fn assignments(kind: FactoryKind, snapshot: &[i64], lines: u32, num_products: usize) -> Vec<usize> {
    let lines = usize::try_from(lines).unwrap_or(usize::MAX);
    let mut order: Vec<usize> = (0..num_products).collect();
    if kind == FactoryKind::Pull {
        order.sort_by_key(|&product| snapshot.get(product).copied().unwrap_or_default());
    }
    order.into_iter().cycle().take(lines).collect()
}

/// The factory agent.
pub struct FactoryAgent {
    settings: FactorySettings,
    entity: String,
    bus: Arc<dyn MessageBus>,
    snapshot: Mutex<Snapshot>,
}

impl FactoryAgent {
    /// Create a factory with an all-zero snapshot in the green band.
    pub fn new(settings: FactorySettings, bus: Arc<dyn MessageBus>) -> Self {
        let entity = format!("factory-{}-{}", settings.factory_id, settings.kind);
        let snapshot = Snapshot {
            stock: vec![0; settings.num_products],
            status: StockStatus::Green,
        };
        Self {
            settings,
            entity,
            bus,
            snapshot: Mutex::new(snapshot),
        }
    }

    /// Replace the cached snapshot and recompute the band.
    ///
    /// A snapshot of the wrong length is logged and ignored, leaving the
    /// cache untouched; `None` is returned in that case.
    pub fn update_finished_goods_snapshot(&self, stock: Vec<i64>) -> Option<StockStatus> {
        if stock.len() != self.settings.num_products {
            warn!(
                expected = self.settings.num_products,
                found = stock.len(),
                "ignoring finished-goods snapshot of the wrong length"
            );
            return None;
        }
        let total = stock.iter().fold(0_i64, |acc, &v| acc.saturating_add(v));
        let status = StockStatus::for_finished_goods(
            total,
            self.settings.product_red_alert,
            self.settings.lines,
        );
        debug!(?stock, "finished-goods snapshot received");
        info!(total, %status, "finished-goods band updated");

        let mut snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        snapshot.stock = stock;
        snapshot.status = status;
        Some(status)
    }

    /// Current band.
    pub fn status(&self) -> StockStatus {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    /// Copy of the cached snapshot.
    pub fn snapshot(&self) -> Vec<i64> {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stock
            .clone()
    }

    /// Today's lot size.
    ///
    /// Pull factories halve the base batch when green and double it when
    /// red; push factories always use the base batch.
    pub fn lot_size(&self) -> i64 {
        let batch = self.settings.batch_size;
        match (self.settings.kind, self.status()) {
            (FactoryKind::Pull, StockStatus::Green) => batch.saturating_div(2),
            (FactoryKind::Pull, StockStatus::Red) => batch.saturating_mul(2),
            _ => batch,
        }
    }

    /// Send one production order to every line.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Bus`] if a publish fails; orders already sent
    /// stay sent.
    pub async fn place_daily_orders(&self) -> Result<(), AgentError> {
        let lot_size = self.lot_size();
        let snapshot = self.snapshot();
        let plan = assignments(
            self.settings.kind,
            &snapshot,
            self.settings.lines,
            self.settings.num_products,
        );
        info!(lot_size, lines = self.settings.lines, "placing daily orders");

        for (index, product) in (0_u32..).zip(plan) {
            let line_id = LineId::from_index(index);
            let topic = line_topic(self.settings.factory_id, line_id);
            let order = Command::ReceiveOrder {
                product,
                quantity: lot_size,
            };
            self.bus.publish(&topic, &order).await?;
            debug!(%line_id, product, lot_size, "order sent");
        }
        Ok(())
    }
}

impl core::fmt::Debug for FactoryAgent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FactoryAgent")
            .field("entity", &self.entity)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for FactoryAgent {
    fn entity(&self) -> &str {
        &self.entity
    }

    fn subscriptions(&self) -> Vec<String> {
        vec![FACTORY_TOPIC.to_owned()]
    }

    async fn handle(&self, command: Command) -> Result<(), AgentError> {
        match command {
            Command::UpdateFactory { stock } => {
                self.update_finished_goods_snapshot(stock);
            }
            other => debug!(command = other.keyword(), "ignored by factory"),
        }
        Ok(())
    }

    async fn on_day(&self, _day: u32) -> Result<(), AgentError> {
        self.place_daily_orders().await
    }
}
