use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::Moment;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub daily: u32,
    pub weekly: u32,
    pub monthly: u32,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StockStatus {
    Critical,
    Low,
    Medium,
    Good,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supply {
    pub id: String,
    pub name: String,
    pub category: String,
    pub current_stock: u32,
    pub min_threshold: u32,
    pub max_capacity: u32,
    pub unit: String,
    pub cost_per_unit: Decimal,
    pub last_restocked: Moment,
    pub usage: Usage,
}

impl Supply {
    /// Threshold first, then fill percentage: critical at or below the
    /// minimum, low up to 30 %, medium up to 60 %, good above.
    pub fn status(&self) -> StockStatus {
        if self.current_stock <= self.min_threshold {
            return StockStatus::Critical;
        }
        if self.max_capacity == 0 {
            return StockStatus::Good;
        }
        let scaled = u64::from(self.current_stock) * 100;
        let capacity = u64::from(self.max_capacity);
        if scaled <= 30 * capacity {
            StockStatus::Low
        } else if scaled <= 60 * capacity {
            StockStatus::Medium
        } else {
            StockStatus::Good
        }
    }

    pub fn stock_percentage(&self) -> f64 {
        if self.max_capacity == 0 {
            return 0.0;
        }
        f64::from(self.current_stock) / f64::from(self.max_capacity) * 100.0
    }

    /// Applies `delta`, saturating into `[0, max_capacity]`. Returns the
    /// change actually applied.
    pub fn apply_delta(&mut self, delta: i64) -> i64 {
        let before = i64::from(self.current_stock);
        let target = before
            .saturating_add(delta)
            .clamp(0, i64::from(self.max_capacity));
        // target is within u32 range after the clamp
        self.current_stock = u32::try_from(target).unwrap_or(self.max_capacity);
        target - before
    }

    /// Quantity that would fill the supply back to capacity.
    pub fn refill_quantity(&self) -> u32 {
        self.max_capacity.saturating_sub(self.current_stock)
    }

    pub fn daily_cost(&self) -> Decimal {
        Decimal::from(self.usage.daily) * self.cost_per_unit
    }

    pub fn weekly_cost(&self) -> Decimal {
        Decimal::from(self.usage.weekly) * self.cost_per_unit
    }

    pub fn monthly_cost(&self) -> Decimal {
        Decimal::from(self.usage.monthly) * self.cost_per_unit
    }
}
