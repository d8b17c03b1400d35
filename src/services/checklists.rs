use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    errors::{EntityKind, ServiceError},
    events::{Event, EventSender},
    metrics::{names, Metrics},
    models::{Area, Checklist, CompletionRecord, PhotoSummary, Room},
    services::{rooms, AssignmentScheduler},
    store::{keys, Snapshot, Store, WriteGuard},
};

/// Per-room cleaning checklists, photo verification and completion.
///
/// Each room's checklist is stored under its own key. A room without a
/// stored checklist reads as the fresh template, so nothing needs to be
/// written before the first toggle.
#[derive(Clone)]
pub struct ChecklistEngine {
    store: Store,
    scheduler: AssignmentScheduler,
    event_sender: Arc<EventSender>,
    metrics: Arc<Metrics>,
}

impl ChecklistEngine {
    pub fn new(
        store: Store,
        scheduler: AssignmentScheduler,
        event_sender: Arc<EventSender>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            scheduler,
            event_sender,
            metrics,
        }
    }

    async fn ensure_room(&self, room_number: &str) -> Result<(), ServiceError> {
        let rooms = self.store.load::<Room>(keys::ROOMS).await?.records;
        rooms::position(&rooms, room_number).map(|_| ())
    }

    async fn load(&self, room_number: &str) -> Result<(Checklist, u64), ServiceError> {
        self.ensure_room(room_number).await?;
        let snapshot: Snapshot<Area> = self.store.load(&keys::checklist(room_number)).await?;
        let checklist = if snapshot.is_absent() {
            Checklist::template(room_number)
        } else {
            Checklist::from_areas(room_number, snapshot.records)
        };
        Ok((checklist, snapshot.version))
    }

    async fn save(
        &self,
        guard: &WriteGuard,
        checklist: &Checklist,
        version: u64,
    ) -> Result<(), ServiceError> {
        self.store
            .save(
                guard,
                &keys::checklist(&checklist.room_number),
                version,
                &checklist.areas,
            )
            .await?;
        Ok(())
    }

    /// Current checklist for the room's cleaning session.
    #[instrument(skip(self), err)]
    pub async fn get(&self, room_number: &str) -> Result<Checklist, ServiceError> {
        Ok(self.load(room_number).await?.0)
    }

    /// Discards any progress and stores the fresh template.
    #[instrument(skip(self), err)]
    pub async fn initialize(&self, room_number: &str) -> Result<Checklist, ServiceError> {
        let guard = self.store.exclusive().await;
        let (_, version) = self.load(room_number).await?;
        let checklist = Checklist::template(room_number);
        self.save(&guard, &checklist, version).await?;
        Ok(checklist)
    }

    /// Flips a task's completion. Photo state is not consulted.
    #[instrument(skip(self), err)]
    pub async fn toggle_task(
        &self,
        room_number: &str,
        area_id: &str,
        task_id: &str,
    ) -> Result<Checklist, ServiceError> {
        let guard = self.store.exclusive().await;
        let (mut checklist, version) = self.load(room_number).await?;
        checklist.toggle(area_id, task_id)?;
        self.save(&guard, &checklist, version).await?;
        Ok(checklist)
    }

    #[instrument(skip(self), err)]
    pub async fn upload_photo(
        &self,
        room_number: &str,
        area_id: &str,
        task_id: &str,
    ) -> Result<Checklist, ServiceError> {
        let guard = self.store.exclusive().await;
        let (mut checklist, version) = self.load(room_number).await?;
        checklist.upload_photo(area_id, task_id)?;
        self.save(&guard, &checklist, version).await?;
        self.metrics.increment(names::PHOTOS_UPLOADED);
        Ok(checklist)
    }

    pub async fn progress(&self, room_number: &str) -> Result<f64, ServiceError> {
        Ok(self.get(room_number).await?.progress())
    }

    pub async fn can_finalize(&self, room_number: &str) -> Result<bool, ServiceError> {
        Ok(self.get(room_number).await?.can_finalize())
    }

    pub async fn photo_summary(&self, room_number: &str) -> Result<PhotoSummary, ServiceError> {
        Ok(self.get(room_number).await?.photo_summary())
    }

    /// Records the finished session and completes the room's open
    /// assignment. Requires every task completed; missing photos are
    /// reported on the record but do not block. The session's checklist is
    /// cleared, so the room reads as a fresh template afterwards.
    #[instrument(skip(self, notes), err)]
    pub async fn finalize(
        &self,
        room_number: &str,
        notes: &str,
    ) -> Result<CompletionRecord, ServiceError> {
        let now = Utc::now();
        let guard = self.store.exclusive().await;
        let (checklist, _) = self.load(room_number).await?;
        if !checklist.can_finalize() {
            return Err(ServiceError::invalid_state(
                EntityKind::Checklist,
                room_number,
                format!(
                    "{} of {} tasks completed",
                    checklist.completed_tasks(),
                    checklist.total_tasks()
                ),
            ));
        }

        let mut record = CompletionRecord::from_checklist(&checklist, notes, now);
        let closeout = self.scheduler.prepare_closeout(room_number, now).await?;
        if let Some(assignment) = &closeout.assignment {
            record.assignment_id = Some(assignment.id.clone());
            record.completed_by = Some(assignment.staff_name.clone());
        }

        // every check has passed; the writes below run back to back
        let mut completions = self
            .store
            .load::<CompletionRecord>(keys::COMPLETIONS)
            .await?;
        completions.records.push(record.clone());
        self.store
            .save(&guard, keys::COMPLETIONS, completions.version, &completions.records)
            .await?;
        self.scheduler.commit_closeout(&guard, closeout).await?;

        self.metrics.increment(names::CHECKLISTS_FINALIZED);
        if record.photos_pending > 0 {
            warn!(
                room_number = %room_number,
                photos_pending = record.photos_pending,
                "checklist finalized without all verification photos"
            );
        }
        info!(room_number = %room_number, completion_id = %record.id, "room cleaning finalized");
        self.event_sender.send(Event::ChecklistFinalized {
            room_number: room_number.to_string(),
            completion_id: record.id.clone(),
            photos_pending: record.photos_pending,
        });
        Ok(record)
    }

    /// Stored completion records, optionally for one room only.
    #[instrument(skip(self), err)]
    pub async fn completions(
        &self,
        room_number: Option<&str>,
    ) -> Result<Vec<CompletionRecord>, ServiceError> {
        let records = self
            .store
            .load::<CompletionRecord>(keys::COMPLETIONS)
            .await?
            .records;
        Ok(match room_number {
            Some(number) => records
                .into_iter()
                .filter(|record| record.room_number == number)
                .collect(),
            None => records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulingConfig;
    use crate::models::{AssignRoomCommand, AssignmentStatus, RoomStatus};
    use crate::services::test_support::{seeded, Fixture};
    use crate::services::RoomRegistry;
    use assert_matches::assert_matches;

    fn engine(fx: &Fixture) -> ChecklistEngine {
        let scheduler = AssignmentScheduler::new(
            fx.store.clone(),
            fx.events.clone(),
            fx.metrics.clone(),
            SchedulingConfig::default(),
        );
        ChecklistEngine::new(fx.store.clone(), scheduler, fx.events.clone(), fx.metrics.clone())
    }

    async fn complete_all(engine: &ChecklistEngine, room: &str) {
        let ids: Vec<(String, String)> = engine
            .get(room)
            .await
            .unwrap()
            .areas
            .iter()
            .flat_map(|a| a.tasks.iter().map(move |t| (a.id.clone(), t.id.clone())))
            .collect();
        for (area, task) in ids {
            engine.toggle_task(room, &area, &task).await.unwrap();
        }
    }

    #[tokio::test]
    async fn missing_checklist_reads_as_template() {
        let fx = seeded().await;
        let engine = engine(&fx);
        let checklist = engine.get("101").await.unwrap();
        assert_eq!(checklist, Checklist::template("101"));
        assert!(fx.store.keys().await.unwrap().iter().all(|k| !k.starts_with("cleaning-tasks-")));
        assert_matches!(
            engine.get("999").await,
            Err(ServiceError::NotFound { entity: EntityKind::Room, .. })
        );
    }

    #[tokio::test]
    async fn toggles_persist_per_room() {
        let fx = seeded().await;
        let engine = engine(&fx);
        engine.toggle_task("101", "bathroom", "sink").await.unwrap();
        engine.toggle_task("101", "general", "ac").await.unwrap();

        let checklist = engine.get("101").await.unwrap();
        assert_eq!(checklist.completed_tasks(), 2);
        assert!((engine.progress("101").await.unwrap() - 200.0 / 15.0).abs() < 1e-9);
        assert_eq!(engine.get("102").await.unwrap().completed_tasks(), 0);

        assert_matches!(
            engine.toggle_task("101", "bathroom", "jacuzzi").await,
            Err(ServiceError::NotFound { entity: EntityKind::Task, .. })
        );
    }

    #[tokio::test]
    async fn initialize_discards_progress() {
        let fx = seeded().await;
        let engine = engine(&fx);
        engine.toggle_task("201", "bedroom", "bed").await.unwrap();
        let fresh = engine.initialize("201").await.unwrap();
        assert_eq!(fresh.completed_tasks(), 0);
        assert_eq!(engine.get("201").await.unwrap(), fresh);
    }

    #[tokio::test]
    async fn photos_only_on_photo_tasks() {
        let fx = seeded().await;
        let engine = engine(&fx);
        engine.upload_photo("201", "bedroom", "bed").await.unwrap();
        assert_matches!(
            engine.upload_photo("201", "bedroom", "dust").await,
            Err(ServiceError::InvalidState { .. })
        );
        let summary = engine.photo_summary("201").await.unwrap();
        assert_eq!((summary.required, summary.uploaded), (4, 1));
        assert_eq!(fx.metrics.get(names::PHOTOS_UPLOADED), 1);
    }

    #[tokio::test]
    async fn finalize_requires_every_task() {
        let fx = seeded().await;
        let engine = engine(&fx);
        engine.toggle_task("302", "bathroom", "toilet").await.unwrap();
        let err = engine.finalize("302", "").await.unwrap_err();
        assert_matches!(err, ServiceError::InvalidState { entity: EntityKind::Checklist, .. });
        assert!(engine.completions(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn finalize_completes_a_pending_assignment() {
        let mut fx = seeded().await;
        let engine = engine(&fx);
        let assignment = engine
            .scheduler
            .assign(AssignRoomCommand::new("6", "302"))
            .await
            .unwrap();

        complete_all(&engine, "302").await;
        assert!(engine.can_finalize("302").await.unwrap());
        let record = engine.finalize("302", "Extra towels left").await.unwrap();

        assert_eq!(record.completed_tasks, 15);
        assert_eq!(record.completion_rate, 100.0);
        assert_eq!(record.photos_pending, 4);
        assert_eq!(record.assignment_id.as_deref(), Some(assignment.id.as_str()));
        assert_eq!(record.completed_by.as_deref(), Some("Tom Brown"));

        let done = engine.scheduler.get(&assignment.id).await.unwrap();
        assert_eq!(done.status, AssignmentStatus::Completed);

        let advances = fx
            .published()
            .into_iter()
            .filter(|e| matches!(e, Event::AssignmentAdvanced { .. }))
            .count();
        assert_eq!(advances, 2);
        assert_eq!(engine.completions(Some("302")).await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn finalize_without_assignment_cleans_the_room() {
        let fx = seeded().await;
        let engine = engine(&fx);
        complete_all(&engine, "401").await;
        let record = engine.finalize("401", "").await.unwrap();
        assert!(record.assignment_id.is_none());

        let rooms = fx.store.load::<Room>(keys::ROOMS).await.unwrap().records;
        let room = rooms.iter().find(|r| r.number == "401").unwrap();
        assert_eq!(room.status, RoomStatus::Clean);
        assert_eq!(room.last_cleaned.timestamp(), Some(record.completed_at));
    }

    #[tokio::test]
    async fn finalized_session_cannot_be_finalized_again() {
        let fx = seeded().await;
        let engine = engine(&fx);
        complete_all(&engine, "201").await;
        engine.finalize("201", "").await.unwrap();

        assert!(fx
            .store
            .load::<Area>(&keys::checklist("201"))
            .await
            .unwrap()
            .is_absent());
        assert_eq!(engine.get("201").await.unwrap(), Checklist::template("201"));

        RoomRegistry::new(fx.store.clone(), fx.events.clone())
            .set_status("201", RoomStatus::Dirty)
            .await
            .unwrap();
        let err = engine.finalize("201", "").await.unwrap_err();
        assert_matches!(
            err,
            ServiceError::InvalidState { entity: EntityKind::Checklist, ref reason, .. }
                if reason == "0 of 15 tasks completed"
        );
        assert_eq!(engine.completions(Some("201")).await.unwrap().len(), 1);
    }
}
