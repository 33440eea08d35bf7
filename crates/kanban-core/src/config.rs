//! Configuration loading and typed config structures for the kanban network.
//!
//! The canonical configuration lives in `kanban-config.yaml` next to the
//! binary's working directory. Every section and every field has a default,
//! so a partial file (or no file at all) still yields a runnable network.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The values parsed but are inconsistent with each other.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `kanban-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KanbanConfig {
    /// Simulation length and pacing.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Part/product counts, batch sizes, and kanban thresholds.
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Supplier and sales counterparts.
    #[serde(default)]
    pub market: MarketConfig,

    /// Infrastructure connection strings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl KanbanConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for infrastructure URLs:
    /// - `NATS_URL` overrides `infrastructure.nats_url`
    /// - `DRAGONFLY_URL` overrides `infrastructure.dragonfly_url`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    ///
    /// # Errors
    ///
    /// Same as [`from_file`](Self::from_file) when the file exists.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.infrastructure.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.infrastructure.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let inv = &self.inventory;
        if inv.num_parts == 0 {
            return Err(ConfigError::Invalid("inventory.num_parts must be > 0".to_owned()));
        }
        if inv.num_products == 0 {
            return Err(ConfigError::Invalid(
                "inventory.num_products must be > 0".to_owned(),
            ));
        }
        if inv.base_kit_size > inv.num_parts {
            return Err(ConfigError::Invalid(format!(
                "inventory.base_kit_size ({}) exceeds num_parts ({})",
                inv.base_kit_size, inv.num_parts
            )));
        }
        if inv.line_red_alert > inv.line_yellow_alert {
            return Err(ConfigError::Invalid(
                "inventory.line_red_alert must not exceed line_yellow_alert".to_owned(),
            ));
        }
        if inv.warehouse_red_alert > inv.warehouse_yellow_alert {
            return Err(ConfigError::Invalid(
                "inventory.warehouse_red_alert must not exceed warehouse_yellow_alert".to_owned(),
            ));
        }
        if inv.batch_size < 0 || inv.warehouse_shipment_amount < 0 {
            return Err(ConfigError::Invalid(
                "inventory.batch_size and warehouse_shipment_amount must be >= 0".to_owned(),
            ));
        }
        let market = &self.market;
        if market.sales_daily_demand_min < 0
            || market.sales_daily_demand_min > market.sales_daily_demand_max
        {
            return Err(ConfigError::Invalid(
                "market.sales_daily_demand_min must be in 0..=sales_daily_demand_max".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Simulation length and pacing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Number of simulated days each agent runs before exiting.
    #[serde(default = "default_days_max")]
    pub days_max: u32,

    /// Real-time milliseconds per simulated day.
    #[serde(default = "default_day_interval_ms")]
    pub day_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            days_max: default_days_max(),
            day_interval_ms: default_day_interval_ms(),
        }
    }
}

/// Part/product counts, batch sizes, and kanban thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InventoryConfig {
    /// Number of distinct parts (`0..num_parts`).
    #[serde(default = "default_num_parts")]
    pub num_parts: usize,

    /// Number of distinct products (`0..num_products`).
    #[serde(default = "default_num_products")]
    pub num_products: usize,

    /// Every product consumes the first `base_kit_size` parts.
    #[serde(default = "default_base_kit_size")]
    pub base_kit_size: usize,

    /// Base lot size ordered per line per day.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,

    /// Line part stock below this is red.
    #[serde(default = "default_line_red_alert")]
    pub line_red_alert: i64,

    /// Line part stock below this triggers a restock request.
    #[serde(default = "default_line_yellow_alert")]
    pub line_yellow_alert: i64,

    /// Warehouse part stock below this is red.
    #[serde(default = "default_warehouse_red_alert")]
    pub warehouse_red_alert: i64,

    /// Warehouse part stock below this triggers a supplier order.
    #[serde(default = "default_warehouse_yellow_alert")]
    pub warehouse_yellow_alert: i64,

    /// Finished-goods red alert per line, used by the factory bands.
    #[serde(default = "default_product_red_alert")]
    pub product_red_alert: i64,

    /// Units of each flagged part the warehouse ships per request.
    #[serde(default = "default_warehouse_shipment_amount")]
    pub warehouse_shipment_amount: i64,

    /// Path to the product-to-parts table read by every line.
    #[serde(default = "default_products_table_path")]
    pub products_table_path: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            num_parts: default_num_parts(),
            num_products: default_num_products(),
            base_kit_size: default_base_kit_size(),
            batch_size: default_batch_size(),
            line_red_alert: default_line_red_alert(),
            line_yellow_alert: default_line_yellow_alert(),
            warehouse_red_alert: default_warehouse_red_alert(),
            warehouse_yellow_alert: default_warehouse_yellow_alert(),
            product_red_alert: default_product_red_alert(),
            warehouse_shipment_amount: default_warehouse_shipment_amount(),
            products_table_path: default_products_table_path(),
        }
    }
}

/// Supplier and sales counterparts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarketConfig {
    /// Units of each flagged part the supplier delivers per order.
    #[serde(default = "default_supplier_delivery_amount")]
    pub supplier_delivery_amount: i64,

    /// Lower bound of the daily demand per product.
    #[serde(default)]
    pub sales_daily_demand_min: i64,

    /// Upper bound of the daily demand per product.
    #[serde(default = "default_sales_daily_demand_max")]
    pub sales_daily_demand_max: i64,

    /// Seed for the demand generator.
    #[serde(default = "default_sales_seed")]
    pub sales_seed: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            supplier_delivery_amount: default_supplier_delivery_amount(),
            sales_daily_demand_min: 0,
            sales_daily_demand_max: default_sales_daily_demand_max(),
            sales_seed: default_sales_seed(),
        }
    }
}

/// Infrastructure connection strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// `Dragonfly`/Redis URL for the shared counters.
    #[serde(default = "default_dragonfly_url")]
    pub dragonfly_url: String,

    /// NATS messaging URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,
}

impl InfrastructureConfig {
    /// Override infrastructure URLs with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("NATS_URL") {
            self.nats_url = val;
        }
        if let Ok(val) = std::env::var("DRAGONFLY_URL") {
            self.dragonfly_url = val;
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            dragonfly_url: default_dragonfly_url(),
            nats_url: default_nats_url(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

const fn default_days_max() -> u32 {
    30
}

const fn default_day_interval_ms() -> u64 {
    2000
}

const fn default_num_parts() -> usize {
    100
}

const fn default_num_products() -> usize {
    5
}

const fn default_base_kit_size() -> usize {
    43
}

const fn default_batch_size() -> i64 {
    50
}

const fn default_line_red_alert() -> i64 {
    100
}

const fn default_line_yellow_alert() -> i64 {
    200
}

const fn default_warehouse_red_alert() -> i64 {
    500
}

const fn default_warehouse_yellow_alert() -> i64 {
    1000
}

const fn default_product_red_alert() -> i64 {
    100
}

const fn default_warehouse_shipment_amount() -> i64 {
    250
}

fn default_products_table_path() -> String {
    "products_and_parts.txt".to_owned()
}

const fn default_supplier_delivery_amount() -> i64 {
    1500
}

const fn default_sales_daily_demand_max() -> i64 {
    40
}

const fn default_sales_seed() -> u64 {
    42
}

fn default_dragonfly_url() -> String {
    "redis://localhost:6379".to_owned()
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = KanbanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.days_max, 30);
        assert_eq!(config.inventory.base_kit_size, 43);
        assert_eq!(config.inventory.num_products, 5);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn parse_partial_yaml_keeps_defaults() {
        let yaml = r"
simulation:
  days_max: 5
inventory:
  num_parts: 10
  base_kit_size: 4
  warehouse_shipment_amount: 10
logging:
  format: json
";
        let config = KanbanConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.unwrap_or_default();
        assert_eq!(config.simulation.days_max, 5);
        assert_eq!(config.simulation.day_interval_ms, 2000);
        assert_eq!(config.inventory.num_parts, 10);
        assert_eq!(config.inventory.base_kit_size, 4);
        assert_eq!(config.inventory.batch_size, 50);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn empty_yaml_is_all_defaults() {
        let config = KanbanConfig::parse("{}");
        assert!(config.is_ok());
        assert_eq!(
            config.map(|c| c.inventory).unwrap_or_default(),
            InventoryConfig::default()
        );
    }

    #[test]
    fn base_kit_larger_than_parts_is_rejected() {
        let yaml = r"
inventory:
  num_parts: 10
  base_kit_size: 11
";
        assert!(matches!(
            KanbanConfig::parse(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let yaml = r"
inventory:
  line_red_alert: 300
  line_yellow_alert: 200
";
        assert!(matches!(
            KanbanConfig::parse(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn inverted_demand_range_is_rejected() {
        let yaml = r"
market:
  sales_daily_demand_min: 10
  sales_daily_demand_max: 5
";
        assert!(matches!(
            KanbanConfig::parse(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn invalid_yaml_is_a_yaml_error() {
        assert!(matches!(
            KanbanConfig::parse("simulation: [unterminated"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn bundled_config_matches_defaults() {
        let config = KanbanConfig::parse(include_str!("../../../kanban-config.yaml"));
        assert_eq!(
            config.map(|c| (c.simulation, c.inventory, c.market, c.logging)).ok(),
            Some((
                SimulationConfig::default(),
                InventoryConfig::default(),
                MarketConfig::default(),
                LoggingConfig::default(),
            ))
        );
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = KanbanConfig::load_or_default(Path::new("/nonexistent/kanban-config.yaml"));
        assert!(config.is_ok());
    }
}
