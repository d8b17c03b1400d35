//! In-process counters plus the periodic dashboard sampler.
//!
//! Counters are monotonic and live in a [`Metrics`] registry shared by the
//! services. The [`DashboardSampler`] recomputes display aggregates from the
//! store on a timer; it only reads collections and keeps its result in its
//! own cache.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

mod dashboard;

pub use dashboard::{DashboardSampler, DashboardStats};

/// Counter names recorded by the services.
pub mod names {
    pub const ASSIGNMENTS_CREATED: &str = "assignments_created_total";
    pub const ASSIGNMENTS_COMPLETED: &str = "assignments_completed_total";
    pub const ASSIGNMENTS_REASSIGNED: &str = "assignments_reassigned_total";
    pub const CHECKLISTS_FINALIZED: &str = "checklists_finalized_total";
    pub const PHOTOS_UPLOADED: &str = "photos_uploaded_total";
    pub const STOCK_ADJUSTMENTS: &str = "stock_adjustments_total";
    pub const STOCK_CRITICAL: &str = "stock_critical_total";
    pub const LOGINS: &str = "logins_total";
    pub const FAILED_LOGINS: &str = "failed_logins_total";
    pub const DASHBOARD_SAMPLES: &str = "dashboard_samples_total";
}

#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct Metrics {
    counters: DashMap<&'static str, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &'static str) -> Counter {
        self.counters.entry(name).or_insert_with(Counter::new).clone()
    }

    pub fn increment(&self, name: &'static str) {
        self.counter(name).inc();
    }

    /// Current value, 0 for a counter never touched.
    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).map(|c| c.get()).unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counters
            .iter()
            .map(|entry| (entry.key().to_string(), entry.value().get()))
            .collect()
    }
}
