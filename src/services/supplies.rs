use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    errors::{EntityKind, ServiceError},
    events::{Event, EventSender},
    metrics::{names, Metrics},
    models::{Moment, StockStatus, Supply},
    store::{keys, Store},
};

/// Quantity needed to bring a critical supply back to capacity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderLine {
    pub supply_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit: String,
    pub cost: Decimal,
}

#[derive(Clone)]
pub struct SupplyInventory {
    store: Store,
    event_sender: Arc<EventSender>,
    metrics: Arc<Metrics>,
}

impl SupplyInventory {
    pub fn new(store: Store, event_sender: Arc<EventSender>, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            event_sender,
            metrics,
        }
    }

    #[instrument(skip(self), err)]
    pub async fn list(&self) -> Result<Vec<Supply>, ServiceError> {
        Ok(self.store.load(keys::SUPPLIES).await?.records)
    }

    #[instrument(skip(self), err)]
    pub async fn get(&self, id: &str) -> Result<Supply, ServiceError> {
        self.list()
            .await?
            .into_iter()
            .find(|supply| supply.id == id)
            .ok_or_else(|| ServiceError::not_found(EntityKind::Supply, id))
    }

    /// Adds `delta` (negative to consume), saturating into
    /// `[0, max_capacity]`. Any positive applied change counts as a restock.
    #[instrument(skip(self), err)]
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> Result<Supply, ServiceError> {
        let guard = self.store.exclusive().await;
        let mut snapshot = self.store.load::<Supply>(keys::SUPPLIES).await?;
        let supply = snapshot
            .records
            .iter_mut()
            .find(|supply| supply.id == id)
            .ok_or_else(|| ServiceError::not_found(EntityKind::Supply, id))?;

        let old_stock = supply.current_stock;
        let was_critical = supply.status() == StockStatus::Critical;
        let applied = supply.apply_delta(delta);
        if applied > 0 {
            supply.last_restocked = Moment::At(Utc::now());
        }
        let updated = supply.clone();

        if applied != delta {
            info!(supply_id = %id, requested = delta, applied, "stock adjustment saturated");
        }
        if applied == 0 {
            return Ok(updated);
        }

        self.store
            .save(&guard, keys::SUPPLIES, snapshot.version, &snapshot.records)
            .await?;
        self.metrics.increment(names::STOCK_ADJUSTMENTS);

        self.event_sender.send(Event::StockAdjusted {
            supply_id: id.to_string(),
            old_stock,
            new_stock: updated.current_stock,
        });
        if !was_critical && updated.status() == StockStatus::Critical {
            warn!(
                supply_id = %id,
                current_stock = updated.current_stock,
                min_threshold = updated.min_threshold,
                "supply dropped to critical"
            );
            self.metrics.increment(names::STOCK_CRITICAL);
            self.event_sender.send(Event::StockCritical {
                supply_id: id.to_string(),
                current_stock: updated.current_stock,
                min_threshold: updated.min_threshold,
            });
        }
        Ok(updated)
    }

    async fn with_status(&self, wanted: StockStatus) -> Result<Vec<Supply>, ServiceError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|supply| supply.status() == wanted)
            .collect())
    }

    pub async fn critical_items(&self) -> Result<Vec<Supply>, ServiceError> {
        self.with_status(StockStatus::Critical).await
    }

    pub async fn low_items(&self) -> Result<Vec<Supply>, ServiceError> {
        self.with_status(StockStatus::Low).await
    }

    /// Critical and low supplies, in stored order.
    pub async fn needs_attention(&self) -> Result<Vec<Supply>, ServiceError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|supply| matches!(supply.status(), StockStatus::Critical | StockStatus::Low))
            .collect())
    }

    pub async fn well_stocked_count(&self) -> Result<usize, ServiceError> {
        Ok(self.with_status(StockStatus::Good).await?.len())
    }

    pub async fn daily_cost(&self) -> Result<Decimal, ServiceError> {
        Ok(self.list().await?.iter().map(Supply::daily_cost).sum())
    }

    pub async fn weekly_cost(&self) -> Result<Decimal, ServiceError> {
        Ok(self.list().await?.iter().map(Supply::weekly_cost).sum())
    }

    pub async fn monthly_cost(&self) -> Result<Decimal, ServiceError> {
        Ok(self.list().await?.iter().map(Supply::monthly_cost).sum())
    }

    /// The `n` supplies with the highest daily usage; ties go to the lower id.
    pub async fn top_consumers(&self, n: usize) -> Result<Vec<Supply>, ServiceError> {
        let mut supplies = self.list().await?;
        supplies.sort_by(|a, b| {
            b.usage
                .daily
                .cmp(&a.usage.daily)
                .then_with(|| a.id.cmp(&b.id))
        });
        supplies.truncate(n);
        Ok(supplies)
    }

    pub async fn reorder_list(&self) -> Result<Vec<ReorderLine>, ServiceError> {
        Ok(self
            .critical_items()
            .await?
            .into_iter()
            .map(|supply| {
                let quantity = supply.refill_quantity();
                ReorderLine {
                    cost: Decimal::from(quantity) * supply.cost_per_unit,
                    supply_id: supply.id,
                    name: supply.name,
                    quantity,
                    unit: supply.unit,
                }
            })
            .collect())
    }
}
