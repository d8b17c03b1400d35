//! Housekeeping core
//!
//! Room, staff, assignment, checklist and supply state for hotel
//! housekeeping, kept consistent across concurrent callers through a
//! versioned store and a single write gate.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod errors;
pub mod events;
pub mod metrics;
pub mod models;
pub mod seed;
pub mod services;
pub mod snapshot;
pub mod store;

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::events::{process_events, EventSender};
use crate::metrics::{DashboardSampler, Metrics};
use crate::services::{
    AssignmentScheduler, ChecklistEngine, RoomRegistry, StaffRoster, SupplyInventory,
};
use crate::store::{FileStore, Store};

/// Every service wired over one store.
#[derive(Clone)]
pub struct Housekeeping {
    pub config: AppConfig,
    pub store: Store,
    pub event_sender: Arc<EventSender>,
    pub metrics: Arc<Metrics>,
    pub rooms: RoomRegistry,
    pub staff: StaffRoster,
    pub supplies: SupplyInventory,
    pub assignments: AssignmentScheduler,
    pub checklists: ChecklistEngine,
    pub dashboard: DashboardSampler,
}

impl Housekeeping {
    /// Opens the configured backend, seeds it when asked to and starts the
    /// event consumer. Must be called inside a tokio runtime.
    pub async fn bootstrap(config: AppConfig) -> Result<Self, ServiceError> {
        let store = if config.store.is_file_backed() {
            Store::new(Arc::new(FileStore::open(&config.store.data_dir).await?))
        } else {
            Store::in_memory()
        };
        info!(
            environment = %config.environment,
            backend = %config.store.backend,
            "bootstrapping housekeeping core"
        );
        Self::with_store(store, config).await
    }

    /// Wires the services over an existing store.
    pub async fn with_store(store: Store, config: AppConfig) -> Result<Self, ServiceError> {
        if config.seed_on_empty {
            let guard = store.exclusive().await;
            seed::populate(&store, &guard).await?;
        }

        let (sender, rx) = EventSender::channel(config.event_channel_capacity);
        tokio::spawn(process_events(rx));

        Ok(Self::assemble(store, config, Arc::new(sender)))
    }

    fn assemble(store: Store, config: AppConfig, event_sender: Arc<EventSender>) -> Self {
        let metrics = Arc::new(Metrics::new());
        let assignments = AssignmentScheduler::new(
            store.clone(),
            event_sender.clone(),
            metrics.clone(),
            config.scheduling.clone(),
        );
        Self {
            rooms: RoomRegistry::new(store.clone(), event_sender.clone()),
            staff: StaffRoster::new(store.clone(), event_sender.clone(), metrics.clone()),
            supplies: SupplyInventory::new(store.clone(), event_sender.clone(), metrics.clone()),
            checklists: ChecklistEngine::new(
                store.clone(),
                assignments.clone(),
                event_sender.clone(),
                metrics.clone(),
            ),
            assignments,
            dashboard: DashboardSampler::new(store.clone(), metrics.clone()),
            config,
            store,
            event_sender,
            metrics,
        }
    }

    /// Starts the periodic dashboard refresh at the configured interval.
    pub fn start_dashboard(&self) -> JoinHandle<()> {
        self.dashboard.spawn(self.config.dashboard_refresh_interval())
    }

    pub async fn export(&self) -> Result<snapshot::ExportDocument, ServiceError> {
        snapshot::export(&self.store).await
    }
}

pub mod prelude {
    pub use crate::config::{init_tracing, load_config, AppConfig};
    pub use crate::errors::{EntityKind, ErrorKind, ServiceError};
    pub use crate::models::{
        AssignRoomCommand, Assignment, AssignmentFilter, AssignmentStatus, Checklist,
        CompletionRecord, NewStaff, Priority, Room, RoomFilter, RoomStatus, Staff, StaffFilter,
        StaffPatch, StaffStatus, StockStatus, Supply,
    };
    pub use crate::Housekeeping;
}
