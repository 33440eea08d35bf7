//! Line agent: local part stock, production orders, and restock requests.
//!
//! Stock lives in the counter store under `line:{fid}:{lid}:part:{i}`. The
//! listener consumes production orders and restock deliveries while the
//! scheduler checks stock once a day; the only state they share besides the
//! counters is the waiting flag.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use kanban_bus::MessageBus;
use kanban_core::{Agent, AgentError, ProductPartsTable};
use kanban_store::CounterStore;
use kanban_types::keys::{SALES_TOPIC, WAREHOUSE_TOPIC, line_part_key, line_topic};
use kanban_types::{Command, FactoryId, LineId, StockStatus};
use tracing::{debug, error, info, warn};

/// Static parameters of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSettings {
    /// This line's id within its factory.
    pub line_id: LineId,
    /// The factory this line belongs to.
    pub factory_id: FactoryId,
    /// Number of distinct parts.
    pub num_parts: usize,
    /// Every product consumes parts `0..base_kit_size`.
    pub base_kit_size: usize,
    /// Part stock below this is logged as red.
    pub red_alert: i64,
    /// Part stock below this triggers a restock request.
    pub yellow_alert: i64,
}

/// What happened to a production order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductionOutcome {
    /// Parts were consumed and the products reported to sales.
    Produced,
    /// A required part was short; nothing changed.
    StockOut {
        /// First short part (0-based).
        part: usize,
        /// Its stock at check time.
        available: i64,
    },
    /// Zero-quantity order; nothing to do.
    Skipped,
}

/// The line agent.
pub struct LineAgent {
    settings: LineSettings,
    entity: String,
    table: ProductPartsTable,
    store: Arc<dyn CounterStore>,
    bus: Arc<dyn MessageBus>,
    waiting: AtomicBool,
}

impl LineAgent {
    /// Create a line that is not waiting for parts.
    pub fn new(
        settings: LineSettings,
        table: ProductPartsTable,
        store: Arc<dyn CounterStore>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        let entity = format!("line-{}-{}", settings.factory_id, settings.line_id);
        Self {
            settings,
            entity,
            table,
            store,
            bus,
            waiting: AtomicBool::new(false),
        }
    }

    /// Whether a restock request is outstanding.
    pub fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::SeqCst)
    }

    fn part_key(&self, part: usize) -> String {
        line_part_key(self.settings.factory_id, self.settings.line_id, part)
    }

    /// Daily stock check.
    ///
    /// Does nothing while a request is outstanding. Otherwise, when the
    /// scarcest part is below the yellow alert, asks the warehouse to
    /// restock every part. Returns whether a request was sent.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Store`] or [`AgentError::Bus`]. A failed
    /// publish leaves the line free to ask again tomorrow.
    pub async fn check_and_request_parts(&self) -> Result<bool, AgentError> {
        if self.is_waiting() {
            info!("waiting for parts from the warehouse");
            return Ok(false);
        }

        let keys: Vec<String> = (0..self.settings.num_parts)
            .map(|part| self.part_key(part))
            .collect();
        let stocks = self.store.mget(&keys).await?;
        let Some(&min_stock) = stocks.iter().min() else {
            return Ok(false);
        };
        let status =
            StockStatus::classify(min_stock, self.settings.red_alert, self.settings.yellow_alert);

        if min_stock >= self.settings.yellow_alert {
            info!(min_stock, %status, "part buffer healthy");
            return Ok(false);
        }

        warn!(min_stock, %status, "low part stock, requesting restock");
        self.waiting.store(true, Ordering::SeqCst);
        let request = Command::RestockRequest {
            line_id: self.settings.line_id,
            factory_id: self.settings.factory_id,
            flags: vec![true; self.settings.num_parts],
        };
        if let Err(e) = self.bus.publish(WAREHOUSE_TOPIC, &request).await {
            self.waiting.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
        Ok(true)
    }

    /// Add a warehouse delivery to local stock and clear the waiting flag.
    ///
    /// Amounts beyond the configured part count are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Store`] if an increment fails. The flag is
    /// cleared either way.
    pub async fn receive_restock(&self, amounts: &[i64]) -> Result<(), AgentError> {
        let result = self.add_parts(amounts).await;
        self.waiting.store(false, Ordering::SeqCst);
        if result.is_ok() {
            info!("line stock replenished");
        }
        result
    }

    async fn return_parts(&self, keys: &[String], quantity: i64) {
        for key in keys {
            if let Err(e) = self.store.incr_by(key, quantity).await {
                error!(key = %key, quantity, error = %e, "could not return part");
            }
        }
    }

    async fn add_parts(&self, amounts: &[i64]) -> Result<(), AgentError> {
        if amounts.len() > self.settings.num_parts {
            warn!(
                num_parts = self.settings.num_parts,
                found = amounts.len(),
                "delivery lists more parts than configured"
            );
        }
        for (part, &amount) in amounts.iter().enumerate().take(self.settings.num_parts) {
            if amount > 0 {
                self.store.incr_by(&self.part_key(part), amount).await?;
            }
        }
        Ok(())
    }

    /// Build `quantity` units of `product`.
    ///
    /// Reads every part the product needs (the base kit plus its own parts)
    /// and only decrements once all of them cover `quantity`. A stock-out
    /// changes nothing and sends nothing. The check and the decrement are
    /// separate round trips, so two orders racing on the same line can
    /// still overdraw a counter.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnknownProduct`] for a product outside the
    /// parts table, or a store/bus error. If the finished goods cannot be
    /// reported to sales the consumed parts are put back.
    pub async fn execute_production_order(
        &self,
        product: usize,
        quantity: i64,
    ) -> Result<ProductionOutcome, AgentError> {
        let product_parts = self.table.parts(product).ok_or(AgentError::UnknownProduct {
            product,
            known: self.table.len(),
        })?;
        if quantity == 0 {
            debug!(product, "zero-quantity order");
            return Ok(ProductionOutcome::Skipped);
        }
        info!(product, quantity, "production order received");

        let required: BTreeSet<usize> = (0..self.settings.base_kit_size)
            .chain(product_parts.iter().copied())
            .collect();
        let parts: Vec<usize> = required.into_iter().collect();
        let keys: Vec<String> = parts.iter().map(|&part| self.part_key(part)).collect();

        let stocks = self.store.mget(&keys).await?;
        if let Some((&part, &available)) = parts
            .iter()
            .zip(stocks.iter())
            .find(|&(_, &stock)| stock < quantity)
        {
            warn!(product, quantity, part, available, "stock-out, order dropped");
            return Ok(ProductionOutcome::StockOut { part, available });
        }

        self.store.decr_many(&keys, quantity).await?;
        let produced = Command::ReceiveProducts {
            product,
            line_id: self.settings.line_id,
            factory_id: self.settings.factory_id,
            quantity,
        };
        if let Err(e) = self.bus.publish(SALES_TOPIC, &produced).await {
            warn!(product, quantity, error = %e, "production not reported, returning parts");
            self.return_parts(&keys, quantity).await;
            return Err(e.into());
        }
        info!(product, quantity, "production complete");
        Ok(ProductionOutcome::Produced)
    }
}

impl core::fmt::Debug for LineAgent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LineAgent")
            .field("entity", &self.entity)
            .field("waiting", &self.is_waiting())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for LineAgent {
    fn entity(&self) -> &str {
        &self.entity
    }

    fn subscriptions(&self) -> Vec<String> {
        vec![line_topic(self.settings.factory_id, self.settings.line_id)]
    }

    async fn handle(&self, command: Command) -> Result<(), AgentError> {
        match command {
            Command::ReceiveParts { amounts } => self.receive_restock(&amounts).await,
            Command::ReceiveOrder { product, quantity } => {
                self.execute_production_order(product, quantity).await?;
                Ok(())
            }
            other => {
                debug!(command = other.keyword(), "ignored by line");
                Ok(())
            }
        }
    }

    async fn on_day(&self, _day: u32) -> Result<(), AgentError> {
        self.check_and_request_parts().await?;
        Ok(())
    }
}
