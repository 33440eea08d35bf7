//! Warehouse agent: central part stock, queued line restocks, and the
//! supplier replenishment cycle.
//!
//! Restock requests from lines land in an in-process FIFO queue. The
//! scheduler drains at most one request per day and either ships every
//! flagged part or abandons the request outright. The queue lock covers
//! enqueue and dequeue only, never the store and bus round trips that
//! follow a dequeue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use kanban_bus::MessageBus;
use kanban_core::handshake;
use kanban_core::{Agent, AgentError};
use kanban_store::CounterStore;
use kanban_types::keys::{SUPPLIER_TOPIC, WAREHOUSE_TOPIC, line_topic, warehouse_part_key};
use kanban_types::{Command, FactoryId, LineId, StockStatus};
use tracing::{debug, error, info, warn};

/// Static parameters of the warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseSettings {
    /// Number of distinct parts.
    pub num_parts: usize,
    /// Units of each flagged part shipped per request.
    pub shipment_amount: i64,
    /// Part stock below this is logged as red.
    pub red_alert: i64,
    /// Part stock below this is ordered from the supplier.
    pub yellow_alert: i64,
}

/// A line's queued restock request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestockRequest {
    /// Requesting line.
    pub line_id: LineId,
    /// Factory of the requesting line.
    pub factory_id: FactoryId,
    /// One flag per part; `true` means ship it.
    pub flags: Vec<bool>,
}

/// What happened to a dequeued restock request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShipmentOutcome {
    /// Parts left the warehouse; per-part amounts as sent to the line.
    Shipped(Vec<i64>),
    /// A flagged part was short, so nothing was shipped.
    Abandoned {
        /// First short part (0-based).
        part: usize,
        /// Its stock at check time.
        available: i64,
    },
}

/// The warehouse agent.
pub struct WarehouseAgent {
    settings: WarehouseSettings,
    store: Arc<dyn CounterStore>,
    bus: Arc<dyn MessageBus>,
    queue: Mutex<VecDeque<RestockRequest>>,
    awaiting_supplier: AtomicBool,
}

impl WarehouseAgent {
    /// Create a warehouse with an empty queue and no supplier order out.
    pub fn new(
        settings: WarehouseSettings,
        store: Arc<dyn CounterStore>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        Self {
            settings,
            store,
            bus,
            queue: Mutex::new(VecDeque::new()),
            awaiting_supplier: AtomicBool::new(false),
        }
    }

    /// Append a request to the back of the queue.
    pub fn enqueue(&self, request: RestockRequest) {
        let line_id = request.line_id;
        let factory_id = request.factory_id;
        let queued = {
            let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
            queue.push_back(request);
            queue.len()
        };
        info!(%line_id, %factory_id, queued, "restock request queued");
    }

    /// Number of requests waiting.
    pub fn queue_len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether a supplier order is outstanding.
    pub fn is_awaiting_supplier(&self) -> bool {
        self.awaiting_supplier.load(Ordering::SeqCst)
    }

    /// Pop the oldest request, if any, and try to ship it.
    ///
    /// # Errors
    ///
    /// Returns a store/bus error from [`send_parts`](Self::send_parts). The
    /// request is not re-queued, so its line stays waiting.
    pub async fn process_queue_once(&self) -> Result<Option<ShipmentOutcome>, AgentError> {
        let next = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(request) = next else {
            debug!("restock queue empty");
            return Ok(None);
        };
        self.send_parts(&request).await.map(Some)
    }

    /// Ship `shipment_amount` of every flagged part to the requesting line.
    ///
    /// If any flagged part is below the shipment amount the whole request
    /// is abandoned: no counter changes and no message is sent. The
    /// requesting line is not told either, so it keeps waiting and never
    /// asks again.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Store`] or [`AgentError::Bus`]. If the
    /// delivery cannot be published the decremented parts are put back.
    pub async fn send_parts(&self, request: &RestockRequest) -> Result<ShipmentOutcome, AgentError> {
        let amount = self.settings.shipment_amount;
        let parts: Vec<usize> = request
            .flags
            .iter()
            .take(self.settings.num_parts)
            .enumerate()
            .filter_map(|(part, &flagged)| flagged.then_some(part))
            .collect();
        let keys: Vec<String> = parts.iter().map(|&part| warehouse_part_key(part)).collect();

        let stocks = self.store.mget(&keys).await?;
        if let Some((&part, &available)) = parts
            .iter()
            .zip(stocks.iter())
            .find(|&(_, &stock)| stock < amount)
        {
            warn!(
                line_id = %request.line_id,
                factory_id = %request.factory_id,
                part,
                available,
                amount,
                "insufficient stock, restock request abandoned"
            );
            return Ok(ShipmentOutcome::Abandoned { part, available });
        }

        self.store.decr_many(&keys, amount).await?;
        let mut amounts = vec![0_i64; self.settings.num_parts];
        for &part in &parts {
            if let Some(slot) = amounts.get_mut(part) {
                *slot = amount;
            }
        }
        let topic = line_topic(request.factory_id, request.line_id);
        let delivery = Command::ReceiveParts {
            amounts: amounts.clone(),
        };
        if let Err(e) = self.bus.publish(&topic, &delivery).await {
            warn!(
                line_id = %request.line_id,
                factory_id = %request.factory_id,
                error = %e,
                "delivery not sent, returning parts to stock"
            );
            self.return_to_stock(&keys, amount).await;
            return Err(e.into());
        }
        info!(
            line_id = %request.line_id,
            factory_id = %request.factory_id,
            parts = parts.len(),
            amount,
            "parts shipped"
        );
        Ok(ShipmentOutcome::Shipped(amounts))
    }

    /// Daily supplier check.
    ///
    /// Does nothing while an order is outstanding. Otherwise flags every
    /// part below the yellow alert and, if any, orders them. Returns the
    /// flags that were sent.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Store`] or [`AgentError::Bus`]. A failed
    /// publish leaves the warehouse free to order again tomorrow.
    pub async fn check_and_order_from_supplier(&self) -> Result<Option<Vec<bool>>, AgentError> {
        if self.is_awaiting_supplier() {
            info!("waiting for supplier delivery");
            return Ok(None);
        }

        let keys: Vec<String> = (0..self.settings.num_parts).map(warehouse_part_key).collect();
        let stocks = self.store.mget(&keys).await?;
        let flags: Vec<bool> = stocks
            .iter()
            .map(|&stock| stock < self.settings.yellow_alert)
            .collect();
        let red = stocks
            .iter()
            .filter(|&&stock| {
                StockStatus::classify(stock, self.settings.red_alert, self.settings.yellow_alert)
                    == StockStatus::Red
            })
            .count();
        let low = flags.iter().filter(|&&flag| flag).count();

        if low == 0 {
            info!("warehouse stock healthy");
            return Ok(None);
        }

        info!(low, red, "ordering parts from supplier");
        self.awaiting_supplier.store(true, Ordering::SeqCst);
        let order = Command::SupplierOrder {
            flags: flags.clone(),
        };
        if let Err(e) = self.bus.publish(SUPPLIER_TOPIC, &order).await {
            self.awaiting_supplier.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
        Ok(Some(flags))
    }

    /// Add a supplier delivery to central stock and clear the order flag.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Store`] if an increment fails. The flag is
    /// cleared either way.
    pub async fn receive_supplier_delivery(&self, amounts: &[i64]) -> Result<(), AgentError> {
        let result = self.add_parts(amounts).await;
        self.awaiting_supplier.store(false, Ordering::SeqCst);
        if result.is_ok() {
            info!("supplier delivery received");
        }
        result
    }

    async fn return_to_stock(&self, keys: &[String], amount: i64) {
        for key in keys {
            if let Err(e) = self.store.incr_by(key, amount).await {
                error!(key = %key, amount, error = %e, "could not return part to stock");
            }
        }
    }

    async fn add_parts(&self, amounts: &[i64]) -> Result<(), AgentError> {
        for (part, &amount) in amounts.iter().enumerate().take(self.settings.num_parts) {
            if amount > 0 {
                self.store.incr_by(&warehouse_part_key(part), amount).await?;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for WarehouseAgent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WarehouseAgent")
            .field("settings", &self.settings)
            .field("queued", &self.queue_len())
            .field("awaiting_supplier", &self.is_awaiting_supplier())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for WarehouseAgent {
    fn entity(&self) -> &str {
        "warehouse"
    }

    fn subscriptions(&self) -> Vec<String> {
        vec![WAREHOUSE_TOPIC.to_owned()]
    }

    async fn on_subscribed(&self) -> Result<(), AgentError> {
        handshake::announce_ready(self.bus.as_ref()).await?;
        info!("warehouse ready");
        Ok(())
    }

    async fn handle(&self, command: Command) -> Result<(), AgentError> {
        match command {
            Command::RestockRequest {
                line_id,
                factory_id,
                flags,
            } => {
                self.enqueue(RestockRequest {
                    line_id,
                    factory_id,
                    flags,
                });
                Ok(())
            }
            Command::ReceiveParts { amounts } => self.receive_supplier_delivery(&amounts).await,
            other => {
                debug!(command = other.keyword(), "ignored by warehouse");
                Ok(())
            }
        }
    }

    async fn on_day(&self, day: u32) -> Result<(), AgentError> {
        // Lines that started after us still need a readiness signal.
        let ready = handshake::announce_ready(self.bus.as_ref())
            .await
            .map_err(AgentError::from);
        let restock = self.process_queue_once().await.map(drop);
        let supplier = self.check_and_order_from_supplier().await.map(drop);

        let mut fatal = None;
        for (step, result) in [("readiness", ready), ("restock", restock), ("supplier", supplier)] {
            match result {
                Err(e) if e.is_fatal() => {
                    fatal.get_or_insert(e);
                }
                Err(e) => error!(day, step, error = %e, "warehouse step failed"),
                Ok(()) => {}
            }
        }
        fatal.map_or(Ok(()), Err)
    }
}
