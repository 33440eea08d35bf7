//! Multi-agent scenarios over the in-process bus and counter store.
//!
//! The relay tests hand each message from one agent to the next by hand,
//! so they are deterministic. The last test runs every role concurrently
//! through the real runtime.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use kanban_agents::{
    FactoryAgent, FactorySettings, LineAgent, LineSettings, SalesAgent, SalesSettings,
    ShipmentOutcome, SupplierAgent, WarehouseAgent, WarehouseSettings,
};
use kanban_bus::{MemoryBus, MessageBus, Subscription};
use kanban_core::{Agent, ProductPartsTable, RunOptions};
use kanban_store::{CounterStore, MemoryCounters};
use kanban_types::keys::{FACTORY_TOPIC, SALES_TOPIC, SUPPLIER_TOPIC, WAREHOUSE_TOPIC};
use kanban_types::{Command, FactoryId, FactoryKind, LineId, StockStatus};

const NUM_PARTS: usize = 6;
const NUM_PRODUCTS: usize = 2;

struct Network {
    store: Arc<MemoryCounters>,
    bus: Arc<MemoryBus>,
}

impl Network {
    fn new() -> Self {
        Self {
            store: Arc::new(MemoryCounters::new()),
            bus: Arc::new(MemoryBus::new()),
        }
    }

    fn store(&self) -> Arc<dyn CounterStore> {
        Arc::clone(&self.store) as Arc<dyn CounterStore>
    }

    fn bus(&self) -> Arc<dyn MessageBus> {
        Arc::clone(&self.bus) as Arc<dyn MessageBus>
    }

    fn warehouse(&self, shipment_amount: i64) -> WarehouseAgent {
        WarehouseAgent::new(
            WarehouseSettings {
                num_parts: NUM_PARTS,
                shipment_amount,
                red_alert: 50,
                yellow_alert: 100,
            },
            self.store(),
            self.bus(),
        )
    }

    fn line(&self, line_id: u32) -> LineAgent {
        let table = ProductPartsTable::from_rows(vec![BTreeSet::from([3]), BTreeSet::from([4, 5])]);
        LineAgent::new(
            LineSettings {
                line_id: LineId::new(line_id),
                factory_id: FactoryId::new(1),
                num_parts: NUM_PARTS,
                base_kit_size: 2,
                red_alert: 10,
                yellow_alert: 20,
            },
            table,
            self.store(),
            self.bus(),
        )
    }

    fn factory(&self, kind: FactoryKind, lines: u32, num_products: usize) -> FactoryAgent {
        FactoryAgent::new(
            FactorySettings {
                kind,
                factory_id: FactoryId::new(1),
                lines,
                num_products,
                batch_size: 10,
                product_red_alert: 5,
            },
            self.bus(),
        )
    }

    fn sales(&self) -> SalesAgent {
        SalesAgent::new(
            SalesSettings {
                num_products: NUM_PRODUCTS,
                demand_min: 0,
                demand_max: 0,
                seed: 1,
            },
            self.store(),
            self.bus(),
        )
    }

    fn stock_warehouse(&self, amount: i64) {
        for part in 0..NUM_PARTS {
            self.store.set(&format!("warehouse:part:{part}"), amount);
        }
    }
}

async fn next_command(sub: &mut Subscription) -> Command {
    tokio::time::timeout(Duration::from_secs(1), sub.next())
        .await
        .unwrap()
        .unwrap()
        .command
        .unwrap()
}

async fn drain(sub: &mut Subscription) -> Vec<Command> {
    let mut seen = Vec::new();
    while let Ok(Some(delivery)) = tokio::time::timeout(Duration::from_millis(30), sub.next()).await
    {
        seen.push(delivery.command.unwrap());
    }
    seen
}

#[tokio::test]
async fn short_warehouse_part_drops_the_request() {
    let net = Network::new();
    let warehouse = net.warehouse(10);
    net.store.set("warehouse:part:3", 5);
    let mut line_topic = net.bus.subscribe("factory:1:line:1").await.unwrap();

    warehouse
        .handle(Command::RestockRequest {
            line_id: LineId::new(1),
            factory_id: FactoryId::new(1),
            flags: vec![false, false, false, true, false, false],
        })
        .await
        .unwrap();
    let outcome = warehouse.process_queue_once().await.unwrap();

    assert_eq!(
        outcome,
        Some(ShipmentOutcome::Abandoned {
            part: 3,
            available: 5
        })
    );
    assert_eq!(net.store.value("warehouse:part:3"), 5);
    assert_eq!(warehouse.queue_len(), 0);
    assert!(drain(&mut line_topic).await.is_empty());
}

#[tokio::test]
async fn restock_production_and_snapshot_relay() {
    let net = Network::new();
    net.stock_warehouse(1000);
    let warehouse = net.warehouse(50);
    let line = net.line(1);
    let sales = net.sales();
    let factory = net.factory(FactoryKind::Pull, 1, NUM_PRODUCTS);

    let mut warehouse_topic = net.bus.subscribe(WAREHOUSE_TOPIC).await.unwrap();
    let mut line_topic = net.bus.subscribe("factory:1:line:1").await.unwrap();
    let mut sales_topic = net.bus.subscribe(SALES_TOPIC).await.unwrap();
    let mut factory_topic = net.bus.subscribe(FACTORY_TOPIC).await.unwrap();

    // line runs dry and asks for everything
    assert!(line.check_and_request_parts().await.unwrap());
    let request = next_command(&mut warehouse_topic).await;
    warehouse.handle(request).await.unwrap();
    assert_eq!(warehouse.queue_len(), 1);

    // warehouse ships on its next day
    let shipped = warehouse.process_queue_once().await.unwrap();
    assert_eq!(shipped, Some(ShipmentOutcome::Shipped(vec![50; NUM_PARTS])));
    assert_eq!(net.store.value("warehouse:part:0"), 950);

    let delivery = next_command(&mut line_topic).await;
    line.handle(delivery).await.unwrap();
    assert!(!line.is_waiting());
    assert_eq!(net.store.value("line:1:1:part:4"), 50);

    // an order for product 1 consumes parts 0, 1, 4 and 5
    line.handle(Command::ReceiveOrder {
        product: 1,
        quantity: 20,
    })
    .await
    .unwrap();
    assert_eq!(net.store.value("line:1:1:part:0"), 30);
    assert_eq!(net.store.value("line:1:1:part:3"), 50);
    assert_eq!(net.store.value("line:1:1:part:5"), 30);

    let produced = next_command(&mut sales_topic).await;
    sales.handle(produced).await.unwrap();
    assert_eq!(net.store.value("product:1"), 20);

    // sales broadcasts the snapshot, the factory re-bands
    sales.on_day(1).await.unwrap();
    let snapshot = next_command(&mut factory_topic).await;
    assert_eq!(snapshot, Command::UpdateFactory { stock: vec![0, 20] });
    factory.handle(snapshot).await.unwrap();
    assert_eq!(factory.snapshot(), vec![0, 20]);
    assert_eq!(factory.status(), StockStatus::Green);
}

#[tokio::test]
async fn warehouse_supplier_round_trip() {
    let net = Network::new();
    net.stock_warehouse(1000);
    net.store.set("warehouse:part:2", 60);
    let warehouse = net.warehouse(50);
    let supplier = SupplierAgent::new(1500, net.bus());
    let mut supplier_topic = net.bus.subscribe(SUPPLIER_TOPIC).await.unwrap();
    let mut warehouse_topic = net.bus.subscribe(WAREHOUSE_TOPIC).await.unwrap();

    let flags = warehouse.check_and_order_from_supplier().await.unwrap();
    assert_eq!(flags, Some(vec![false, false, true, false, false, false]));

    let order = next_command(&mut supplier_topic).await;
    supplier.handle(order).await.unwrap();
    let delivery = next_command(&mut warehouse_topic).await;
    assert_eq!(
        delivery,
        Command::ReceiveParts {
            amounts: vec![0, 0, 1500, 0, 0, 0]
        }
    );

    assert!(warehouse.is_awaiting_supplier());
    warehouse.handle(delivery).await.unwrap();
    assert!(!warehouse.is_awaiting_supplier());
    assert_eq!(net.store.value("warehouse:part:2"), 1560);
    assert_eq!(net.store.value("warehouse:part:0"), 1000);
}

#[tokio::test]
async fn pull_factory_orders_lines_by_need() {
    let net = Network::new();
    let factory = net.factory(FactoryKind::Pull, 6, 5);
    let mut lines = Vec::new();
    for line in 1..=6 {
        lines.push(net.bus.subscribe(&format!("factory:1:line:{line}")).await.unwrap());
    }

    factory
        .handle(Command::UpdateFactory {
            stock: vec![767, 546, 685, 743, 890],
        })
        .await
        .unwrap();
    factory.on_day(1).await.unwrap();

    let mut products = Vec::new();
    for sub in &mut lines {
        match next_command(sub).await {
            Command::ReceiveOrder { product, quantity } => {
                assert_eq!(quantity, 5);
                products.push(product);
            }
            other => panic!("unexpected command {other}"),
        }
    }
    assert_eq!(products, vec![1, 2, 3, 0, 4, 1]);
}

#[tokio::test]
async fn waiting_line_asks_only_once_across_days() {
    let net = Network::new();
    let line: Arc<dyn Agent> = Arc::new(net.line(3));
    let mut warehouse_topic = net.bus.subscribe(WAREHOUSE_TOPIC).await.unwrap();

    let options = RunOptions {
        days_max: 5,
        day_interval: Duration::from_millis(5),
        wait_for_warehouse: false,
    };
    let summary = kanban_core::run(line, net.bus.as_ref(), options).await.unwrap();
    assert_eq!(summary.days_completed, 5);

    let requests = drain(&mut warehouse_topic).await;
    assert_eq!(requests.len(), 1);
    assert!(matches!(
        requests.first(),
        Some(Command::RestockRequest { line_id, .. }) if *line_id == LineId::new(3)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn whole_network_produces_goods() {
    let net = Network::new();
    net.stock_warehouse(5000);

    let agents: Vec<(Arc<dyn Agent>, bool)> = vec![
        (Arc::new(net.warehouse(100)) as Arc<dyn Agent>, false),
        (Arc::new(SupplierAgent::new(1500, net.bus())) as Arc<dyn Agent>, false),
        (Arc::new(net.sales()) as Arc<dyn Agent>, false),
        (Arc::new(net.factory(FactoryKind::Push, 2, NUM_PRODUCTS)) as Arc<dyn Agent>, false),
        (Arc::new(net.line(1)) as Arc<dyn Agent>, true),
        (Arc::new(net.line(2)) as Arc<dyn Agent>, true),
    ];

    let mut tasks = Vec::new();
    for (agent, wait_for_warehouse) in agents {
        let bus = Arc::clone(&net.bus);
        let options = RunOptions {
            days_max: 12,
            day_interval: Duration::from_millis(25),
            wait_for_warehouse,
        };
        tasks.push(tokio::spawn(async move {
            kanban_core::run(agent, bus.as_ref(), options).await
        }));
    }
    for task in tasks {
        let summary = tokio::time::timeout(Duration::from_secs(10), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(summary.days_completed, 12);
    }

    let produced = net.store.value("product:0") + net.store.value("product:1");
    assert!(produced > 0, "no finished goods were booked");
    assert!(net.store.value("warehouse:part:0") < 5000);
    for line in 1..=2 {
        for part in 0..NUM_PARTS {
            assert!(net.store.value(&format!("line:1:{line}:part:{part}")) >= 0);
        }
    }
}
