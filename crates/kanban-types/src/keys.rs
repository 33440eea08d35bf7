//! Counter-store key shapes and bus topic names.
//!
//! The dashboard polls the counter store directly, so these shapes are a
//! contract with an external reader and must not drift.
//!
//! # Key Patterns
//!
//! | Pattern | Description |
//! |---------|-------------|
//! | `warehouse:part:{part}` | Central part stock |
//! | `line:{factory}:{line}:part:{part}` | Part stock held by one line |
//! | `product:{product}` | Finished-goods stock |
//!
//! # Topics
//!
//! | Topic | Subscriber |
//! |-------|------------|
//! | `channel:factory` | every factory (finished-goods snapshots) |
//! | `factory:{factory}:line:{line}` | one line (orders, restock deliveries) |
//! | `channel:warehouse` | warehouse (restock requests, supplier deliveries) |
//! | `channel:supplier` | supplier (warehouse orders) |
//! | `channel:product_stock` | sales (finished goods produced) |
//! | `control:warehouse_ready` | lines waiting for the readiness signal |

use crate::ids::{FactoryId, LineId};

/// Factory-wide broadcast topic carrying finished-goods snapshots.
pub const FACTORY_TOPIC: &str = "channel:factory";

/// Warehouse inbound topic.
pub const WAREHOUSE_TOPIC: &str = "channel:warehouse";

/// Supplier inbound topic.
pub const SUPPLIER_TOPIC: &str = "channel:supplier";

/// Sales / product-tracking topic.
pub const SALES_TOPIC: &str = "channel:product_stock";

/// Control topic on which the warehouse announces readiness.
pub const READY_TOPIC: &str = "control:warehouse_ready";

/// Private topic of one production line.
pub fn line_topic(factory_id: FactoryId, line_id: LineId) -> String {
    format!("factory:{factory_id}:line:{line_id}")
}

/// Counter key for a part held by the warehouse.
pub fn warehouse_part_key(part: usize) -> String {
    format!("warehouse:part:{part}")
}

/// Counter key for a part held by a line.
pub fn line_part_key(factory_id: FactoryId, line_id: LineId, part: usize) -> String {
    format!("line:{factory_id}:{line_id}:part:{part}")
}

/// Counter key for a finished product.
pub fn product_key(product: usize) -> String {
    format!("product:{product}")
}
