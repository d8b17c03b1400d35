use std::collections::HashMap;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::{info, instrument};

use crate::{
    errors::{EntityKind, ServiceError},
    events::{Event, EventSender},
    models::{Room, RoomFilter, RoomStatus},
    store::{keys, Snapshot, Store},
};

/// Owns rooms and their cleanliness state. Rooms come from seed data and
/// are never created or deleted here.
#[derive(Clone)]
pub struct RoomRegistry {
    store: Store,
    event_sender: Arc<EventSender>,
}

pub(crate) fn position(rooms: &[Room], number: &str) -> Result<usize, ServiceError> {
    rooms
        .iter()
        .position(|room| room.number == number)
        .ok_or_else(|| ServiceError::not_found(EntityKind::Room, number))
}

impl RoomRegistry {
    pub fn new(store: Store, event_sender: Arc<EventSender>) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    async fn load(&self) -> Result<Snapshot<Room>, ServiceError> {
        Ok(self.store.load(keys::ROOMS).await?)
    }

    /// Rooms matching every predicate in `filter`, in stored order.
    #[instrument(skip(self), err)]
    pub async fn list(&self, filter: RoomFilter) -> Result<Vec<Room>, ServiceError> {
        Ok(self
            .load()
            .await?
            .records
            .into_iter()
            .filter(|room| filter.matches(room))
            .collect())
    }

    #[instrument(skip(self), err)]
    pub async fn get(&self, number: &str) -> Result<Room, ServiceError> {
        let mut rooms = self.load().await?.records;
        let index = position(&rooms, number)?;
        Ok(rooms.swap_remove(index))
    }

    /// Moves a room to `status`. Setting the current status again writes
    /// nothing.
    #[instrument(skip(self), err)]
    pub async fn set_status(&self, number: &str, status: RoomStatus) -> Result<Room, ServiceError> {
        let guard = self.store.exclusive().await;
        let mut snapshot = self.load().await?;
        let index = position(&snapshot.records, number)?;

        let room = &mut snapshot.records[index];
        let old_status = room.status;
        if !room.transition_to(status)? {
            return Ok(room.clone());
        }
        let updated = room.clone();

        self.store
            .save(&guard, keys::ROOMS, snapshot.version, &snapshot.records)
            .await?;

        info!(room_number = %number, from = %old_status, to = %status, "room status changed");
        self.event_sender.send(Event::RoomStatusChanged {
            room_number: number.to_string(),
            old_status,
            new_status: status,
        });
        Ok(updated)
    }

    #[instrument(skip(self), err)]
    pub async fn record_issue(&self, number: &str, text: &str) -> Result<Room, ServiceError> {
        let issue = text.trim();
        if issue.is_empty() {
            return Err(ServiceError::ValidationError(
                "issue text cannot be blank".to_string(),
            ));
        }

        let guard = self.store.exclusive().await;
        let mut snapshot = self.load().await?;
        let index = position(&snapshot.records, number)?;
        snapshot.records[index].issues.push(issue.to_string());
        let updated = snapshot.records[index].clone();

        self.store
            .save(&guard, keys::ROOMS, snapshot.version, &snapshot.records)
            .await?;

        self.event_sender.send(Event::RoomIssueRecorded {
            room_number: number.to_string(),
            issue: issue.to_string(),
        });
        Ok(updated)
    }

    /// Removes the issue at `index` from the room's list.
    #[instrument(skip(self), err)]
    pub async fn resolve_issue(&self, number: &str, index: usize) -> Result<Room, ServiceError> {
        let guard = self.store.exclusive().await;
        let mut snapshot = self.load().await?;
        let room_index = position(&snapshot.records, number)?;

        let room = &mut snapshot.records[room_index];
        if index >= room.issues.len() {
            return Err(ServiceError::not_found(
                EntityKind::Room,
                format!("{}/issues/{}", number, index),
            ));
        }
        let resolved = room.issues.remove(index);
        let updated = room.clone();

        self.store
            .save(&guard, keys::ROOMS, snapshot.version, &snapshot.records)
            .await?;

        info!(room_number = %number, issue = %resolved, "room issue resolved");
        Ok(updated)
    }

    /// Number of rooms in each status, zero-filled.
    #[instrument(skip(self), err)]
    pub async fn status_counts(&self) -> Result<HashMap<RoomStatus, usize>, ServiceError> {
        let mut counts: HashMap<RoomStatus, usize> =
            RoomStatus::iter().map(|status| (status, 0)).collect();
        for room in self.load().await?.records {
            *counts.entry(room.status).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
