//! Entity services. Each owns one collection's mutation surface; all of
//! them share the store handle, and with it the write gate.

pub mod assignments;
pub mod checklists;
pub mod rooms;
pub mod staff;
pub mod supplies;

pub use assignments::AssignmentScheduler;
pub use checklists::ChecklistEngine;
pub use rooms::RoomRegistry;
pub use staff::{RoleEfficiency, StaffRoster, StaffStats};
pub use supplies::{ReorderLine, SupplyInventory};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use tokio::sync::mpsc;

    use crate::events::{Event, EventSender};
    use crate::metrics::Metrics;
    use crate::seed;
    use crate::store::Store;

    pub struct Fixture {
        pub store: Store,
        pub events: Arc<EventSender>,
        pub rx: mpsc::Receiver<Event>,
        pub metrics: Arc<Metrics>,
    }

    impl Fixture {
        /// Drains everything published so far.
        pub fn published(&mut self) -> Vec<Event> {
            let mut events = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                events.push(event);
            }
            events
        }
    }

    pub async fn seeded() -> Fixture {
        let store = Store::in_memory();
        {
            let guard = store.exclusive().await;
            seed::populate(&store, &guard).await.unwrap();
        }
        let (sender, rx) = EventSender::channel(64);
        Fixture {
            store,
            events: Arc::new(sender),
            rx,
            metrics: Arc::new(Metrics::new()),
        }
    }
}
