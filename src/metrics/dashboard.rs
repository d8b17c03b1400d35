use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::{names, Metrics};
use crate::errors::ServiceError;
use crate::models::{
    Assignment, CompletionRecord, Room, RoomStatus, Staff, StaffStatus, StockStatus, Supply,
};
use crate::store::{keys, Store};

/// Display aggregates for the dashboard header.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_rooms: usize,
    pub clean_rooms: usize,
    pub completed_today: usize,
    pub pending_tasks: usize,
    pub overdue_rooms: usize,
    pub active_staff: usize,
    pub critical_supplies: usize,
    /// Clean rooms as a percentage of all rooms.
    pub completion_rate: f64,
    pub sampled_at: DateTime<Utc>,
}

/// Periodic, read-only refresh of [`DashboardStats`].
#[derive(Clone)]
pub struct DashboardSampler {
    store: Store,
    metrics: Arc<Metrics>,
    latest: Arc<RwLock<Option<DashboardStats>>>,
}

impl DashboardSampler {
    pub fn new(store: Store, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            metrics,
            latest: Arc::new(RwLock::new(None)),
        }
    }

    /// Recomputes the aggregates from the current collections and caches
    /// them. Never takes the write gate.
    #[instrument(skip(self), err)]
    pub async fn sample(&self) -> Result<DashboardStats, ServiceError> {
        let now = Utc::now();
        let rooms = self.store.load::<Room>(keys::ROOMS).await?.records;
        let staff = self.store.load::<Staff>(keys::STAFF).await?.records;
        let assignments = self
            .store
            .load::<Assignment>(keys::ASSIGNMENTS)
            .await?
            .records;
        let supplies = self.store.load::<Supply>(keys::SUPPLIES).await?.records;
        let completions = self
            .store
            .load::<CompletionRecord>(keys::COMPLETIONS)
            .await?
            .records;

        let stats = compute(&rooms, &staff, &assignments, &supplies, &completions, now);
        *self.latest.write().await = Some(stats.clone());
        self.metrics.increment(names::DASHBOARD_SAMPLES);
        debug!(?stats, "dashboard sampled");
        Ok(stats)
    }

    /// Most recent sample, if one has run.
    pub async fn latest(&self) -> Option<DashboardStats> {
        self.latest.read().await.clone()
    }

    /// Runs [`sample`](Self::sample) on a fixed interval until the task is
    /// aborted. Failed samples are logged and the previous value is kept.
    pub fn spawn(&self, every: Duration) -> JoinHandle<()> {
        let sampler = self.clone();
        tokio::spawn(async move {
            info!(interval_secs = every.as_secs(), "Starting dashboard sampler");
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(err) = sampler.sample().await {
                    warn!(error = %err, "dashboard sample failed");
                }
            }
        })
    }
}

fn compute(
    rooms: &[Room],
    staff: &[Staff],
    assignments: &[Assignment],
    supplies: &[Supply],
    completions: &[CompletionRecord],
    now: DateTime<Utc>,
) -> DashboardStats {
    let today = now.date_naive();
    let clean_rooms = rooms
        .iter()
        .filter(|room| room.status == RoomStatus::Clean)
        .count();

    // a room counts once whether it is flagged overdue or its open work ran late
    let overdue: BTreeSet<&str> = rooms
        .iter()
        .filter(|room| room.status == RoomStatus::Overdue)
        .map(|room| room.number.as_str())
        .chain(
            assignments
                .iter()
                .filter(|a| a.is_overdue(now))
                .map(|a| a.room_number.as_str()),
        )
        .collect();

    let completion_rate = if rooms.is_empty() {
        0.0
    } else {
        clean_rooms as f64 / rooms.len() as f64 * 100.0
    };

    DashboardStats {
        total_rooms: rooms.len(),
        clean_rooms,
        completed_today: completions
            .iter()
            .filter(|record| record.completed_at.date_naive() == today)
            .count(),
        pending_tasks: assignments.iter().filter(|a| a.is_open()).count(),
        overdue_rooms: overdue.len(),
        active_staff: staff
            .iter()
            .filter(|s| matches!(s.status, StaffStatus::Available | StaffStatus::Busy))
            .count(),
        critical_supplies: supplies
            .iter()
            .filter(|s| s.status() == StockStatus::Critical)
            .count(),
        completion_rate,
        sampled_at: now,
    }
}
