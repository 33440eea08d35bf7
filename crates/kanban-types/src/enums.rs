//! Enumeration types: kanban bands and factory ordering policies.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kanban band: a coarse inventory-health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    /// Critically low stock.
    Red,
    /// Low stock, replenishment advised.
    Yellow,
    /// Healthy stock.
    Green,
}

impl StockStatus {
    /// Classify a single counter against its red and yellow limits.
    ///
    /// Values strictly below `red` are red, strictly below `yellow` are
    /// yellow, everything else is green. This is the rule the dashboard
    /// applies to every part and product cell.
    pub const fn classify(value: i64, red: i64, yellow: i64) -> Self {
        if value < red {
            Self::Red
        } else if value < yellow {
            Self::Yellow
        } else {
            Self::Green
        }
    }

    /// Classify a factory's finished-goods total.
    ///
    /// The factory scales the product red alert by its line count: a total
    /// at or below `red_alert * lines` is red, at or below twice that is
    /// yellow, anything above is green. Note the inclusive bounds, unlike
    /// [`classify`](Self::classify).
    pub fn for_finished_goods(total: i64, red_alert: i64, lines: u32) -> Self {
        let red_limit = red_alert.saturating_mul(i64::from(lines));
        let yellow_limit = red_limit.saturating_mul(2);
        if total <= red_limit {
            Self::Red
        } else if total <= yellow_limit {
            Self::Yellow
        } else {
            Self::Green
        }
    }

    /// Lowercase name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
        }
    }
}

impl core::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a factory maps its lines to products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactoryKind {
    /// Fixed rotation (`empurrada`): line `i` always builds product `i mod N`.
    Push,
    /// Demand driven (`puxada`): lines follow the products with the least
    /// stock, and the lot size follows the kanban band.
    Pull,
}

impl FactoryKind {
    /// Name used on the command line and in entity names.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "empurrada",
            Self::Pull => "puxada",
        }
    }
}

impl core::fmt::Display for FactoryKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a factory kind name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown factory kind `{0}` (expected `empurrada` or `puxada`)")]
pub struct UnknownFactoryKind(pub String);

impl FromStr for FactoryKind {
    type Err = UnknownFactoryKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "empurrada" | "push" => Ok(Self::Push),
            "puxada" | "pull" => Ok(Self::Pull),
            other => Err(UnknownFactoryKind(other.to_owned())),
        }
    }
}
