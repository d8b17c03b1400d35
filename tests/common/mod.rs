use housekeeping_core::{
    config::AppConfig,
    models::{Assignment, Room, Staff},
    store::{keys, Store},
    Housekeeping,
};

/// Helper harness wiring every service over a freshly seeded in-memory
/// store.
pub struct TestApp {
    pub app: Housekeeping,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = AppConfig {
            seed_on_empty: true,
            ..AppConfig::in_memory()
        };
        Self::with_store(Store::in_memory(), config).await
    }

    pub async fn with_store(store: Store, config: AppConfig) -> Self {
        let app = Housekeeping::with_store(store, config)
            .await
            .expect("failed to wire housekeeping services");
        Self { app }
    }

    pub fn store(&self) -> &Store {
        &self.app.store
    }

    /// Raw stored room, bypassing the services.
    pub async fn stored_room(&self, number: &str) -> Room {
        self.store()
            .load::<Room>(keys::ROOMS)
            .await
            .unwrap()
            .records
            .into_iter()
            .find(|room| room.number == number)
            .unwrap_or_else(|| panic!("room {} not stored", number))
    }

    pub async fn stored_staff(&self, id: &str) -> Staff {
        self.store()
            .load::<Staff>(keys::STAFF)
            .await
            .unwrap()
            .records
            .into_iter()
            .find(|member| member.id == id)
            .unwrap_or_else(|| panic!("staff {} not stored", id))
    }

    #[allow(dead_code)]
    pub async fn stored_assignment(&self, id: &str) -> Assignment {
        self.store()
            .load::<Assignment>(keys::ASSIGNMENTS)
            .await
            .unwrap()
            .records
            .into_iter()
            .find(|a| a.id == id)
            .unwrap_or_else(|| panic!("assignment {} not stored", id))
    }

    /// Marks every checklist task of the room complete.
    pub async fn complete_every_task(&self, room: &str) {
        let checklist = self.app.checklists.get(room).await.unwrap();
        for area in &checklist.areas {
            for task in area.tasks.iter().filter(|task| !task.completed) {
                self.app
                    .checklists
                    .toggle_task(room, &area.id, &task.id)
                    .await
                    .unwrap();
            }
        }
    }
}
