//! The network's outside world: the parts supplier and the sales channel.
//!
//! Neither keeps decision logic of its own. The supplier answers every
//! warehouse order in full, and sales books finished products, draws a
//! daily demand, and broadcasts the resulting finished-goods snapshot to
//! the factories.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use kanban_bus::MessageBus;
use kanban_core::{Agent, AgentError};
use kanban_store::CounterStore;
use kanban_types::Command;
use kanban_types::keys::{FACTORY_TOPIC, SALES_TOPIC, SUPPLIER_TOPIC, WAREHOUSE_TOPIC, product_key};
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};
use tracing::{debug, info, warn};

/// Answers warehouse orders with a fixed delivery per flagged part.
pub struct SupplierAgent {
    delivery_amount: i64,
    bus: Arc<dyn MessageBus>,
}

impl SupplierAgent {
    /// Create a supplier delivering `delivery_amount` of each ordered part.
    pub fn new(delivery_amount: i64, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            delivery_amount,
            bus,
        }
    }

    /// Ship the flagged parts to the warehouse. Returns the amounts sent.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Bus`] if the delivery cannot be published.
    pub async fn fulfil(&self, flags: &[bool]) -> Result<Vec<i64>, AgentError> {
        let amounts: Vec<i64> = flags
            .iter()
            .map(|&flagged| if flagged { self.delivery_amount } else { 0 })
            .collect();
        let ordered = flags.iter().filter(|&&flagged| flagged).count();
        self.bus
            .publish(
                WAREHOUSE_TOPIC,
                &Command::ReceiveParts {
                    amounts: amounts.clone(),
                },
            )
            .await?;
        info!(parts = ordered, amount = self.delivery_amount, "supplier delivery sent");
        Ok(amounts)
    }
}

impl core::fmt::Debug for SupplierAgent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SupplierAgent")
            .field("delivery_amount", &self.delivery_amount)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for SupplierAgent {
    fn entity(&self) -> &str {
        "supplier"
    }

    fn subscriptions(&self) -> Vec<String> {
        vec![SUPPLIER_TOPIC.to_owned()]
    }

    async fn handle(&self, command: Command) -> Result<(), AgentError> {
        match command {
            Command::SupplierOrder { flags } => {
                self.fulfil(&flags).await?;
            }
            other => debug!(command = other.keyword(), "ignored by supplier"),
        }
        Ok(())
    }

    async fn on_day(&self, _day: u32) -> Result<(), AgentError> {
        Ok(())
    }
}

/// Static parameters of the sales channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalesSettings {
    /// Number of products.
    pub num_products: usize,
    /// Lower bound of daily demand per product.
    pub demand_min: i64,
    /// Upper bound of daily demand per product.
    pub demand_max: i64,
    /// Seed for the demand generator.
    pub seed: u64,
}

/// Books finished products and publishes the finished-goods snapshot.
pub struct SalesAgent {
    settings: SalesSettings,
    store: Arc<dyn CounterStore>,
    bus: Arc<dyn MessageBus>,
    rng: Mutex<StdRng>,
}

impl SalesAgent {
    /// Create a sales channel with a seeded demand generator.
    pub fn new(
        settings: SalesSettings,
        store: Arc<dyn CounterStore>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        Self {
            settings,
            store,
            bus,
            rng: Mutex::new(StdRng::seed_from_u64(settings.seed)),
        }
    }

    /// Add produced units to the finished-goods counter.
    ///
    /// Products outside the configured range are logged and dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Store`] if the increment fails.
    pub async fn record_production(&self, product: usize, quantity: i64) -> Result<(), AgentError> {
        if product >= self.settings.num_products {
            warn!(product, "production reported for unknown product");
            return Ok(());
        }
        let stock = self.store.incr_by(&product_key(product), quantity).await?;
        debug!(product, quantity, stock, "finished goods booked");
        Ok(())
    }

    fn draw_demand(&self) -> Vec<i64> {
        let low = self.settings.demand_min.min(self.settings.demand_max);
        let high = self.settings.demand_min.max(self.settings.demand_max);
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        (0..self.settings.num_products)
            .map(|_| rng.random_range(low..=high))
            .collect()
    }

    /// Sell today's demand, capped at what is in stock. Returns units sold
    /// per product.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Store`] on counter failures.
    pub async fn sell_daily_demand(&self) -> Result<Vec<i64>, AgentError> {
        let demand = self.draw_demand();
        let mut sold = Vec::with_capacity(demand.len());
        for (product, wanted) in demand.into_iter().enumerate() {
            let key = product_key(product);
            let available = self.store.get(&key).await?.max(0);
            let units = wanted.min(available);
            if units > 0 {
                self.store.decr_by(&key, units).await?;
            }
            sold.push(units);
        }
        info!(?sold, "daily demand served");
        Ok(sold)
    }

    /// Read every finished-goods counter and broadcast it to the factories.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Store`] or [`AgentError::Bus`].
    pub async fn broadcast_snapshot(&self) -> Result<Vec<i64>, AgentError> {
        let keys: Vec<String> = (0..self.settings.num_products).map(product_key).collect();
        let stock = self.store.mget(&keys).await?;
        self.bus
            .publish(
                FACTORY_TOPIC,
                &Command::UpdateFactory {
                    stock: stock.clone(),
                },
            )
            .await?;
        debug!(?stock, "finished-goods snapshot broadcast");
        Ok(stock)
    }
}

impl core::fmt::Debug for SalesAgent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SalesAgent")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for SalesAgent {
    fn entity(&self) -> &str {
        "sales"
    }

    fn subscriptions(&self) -> Vec<String> {
        vec![SALES_TOPIC.to_owned()]
    }

    async fn handle(&self, command: Command) -> Result<(), AgentError> {
        match command {
            Command::ReceiveProducts {
                product,
                line_id,
                factory_id,
                quantity,
            } => {
                debug!(%line_id, %factory_id, "products received");
                self.record_production(product, quantity).await
            }
            other => {
                debug!(command = other.keyword(), "ignored by sales");
                Ok(())
            }
        }
    }

    async fn on_day(&self, _day: u32) -> Result<(), AgentError> {
        self.sell_daily_demand().await?;
        self.broadcast_snapshot().await?;
        Ok(())
    }
}
