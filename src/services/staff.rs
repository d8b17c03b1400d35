use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::{EntityKind, ServiceError},
    events::{Event, EventSender},
    metrics::{names, Metrics},
    models::{
        Assignment, LoginRecord, NewStaff, Room, Staff, StaffFilter, StaffPatch, StaffRole,
        StaffStatus,
    },
    store::{keys, Snapshot, Store},
};

const DEFAULT_EFFICIENCY: u8 = 80;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffStats {
    pub total: usize,
    pub available: usize,
    pub busy: usize,
    pub average_efficiency: u8,
    /// One entry per role, in role order; 0 for a role with no members.
    pub efficiency_by_role: Vec<RoleEfficiency>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleEfficiency {
    pub role: StaffRole,
    pub members: usize,
    pub average_efficiency: u8,
}

/// Mean efficiency rounded half up; 0 when there is nobody to average.
fn rounded_average<'a>(staff: impl Iterator<Item = &'a Staff>) -> u8 {
    let (sum, count) = staff.fold((0u32, 0u32), |(sum, count), member| {
        (sum + u32::from(member.efficiency), count + 1)
    });
    if count == 0 {
        return 0;
    }
    u8::try_from((sum * 2 + count) / (count * 2)).unwrap_or(100)
}

/// Owns the staff roster, credentials and login history.
#[derive(Clone)]
pub struct StaffRoster {
    store: Store,
    event_sender: Arc<EventSender>,
    metrics: Arc<Metrics>,
}

pub(crate) fn position(staff: &[Staff], id: &str) -> Result<usize, ServiceError> {
    staff
        .iter()
        .position(|member| member.id == id)
        .ok_or_else(|| ServiceError::not_found(EntityKind::Staff, id))
}

fn generate_pin() -> String {
    rand::thread_rng().gen_range(1000..=9999).to_string()
}

impl StaffRoster {
    pub fn new(store: Store, event_sender: Arc<EventSender>, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            event_sender,
            metrics,
        }
    }

    async fn load(&self) -> Result<Snapshot<Staff>, ServiceError> {
        Ok(self.store.load(keys::STAFF).await?)
    }

    async fn has_open_assignments(&self, staff_id: &str) -> Result<bool, ServiceError> {
        let assignments = self.store.load::<Assignment>(keys::ASSIGNMENTS).await?;
        Ok(assignments
            .records
            .iter()
            .any(|a| a.staff_id == staff_id && a.is_open()))
    }

    #[instrument(skip(self), err)]
    pub async fn list(&self, filter: StaffFilter) -> Result<Vec<Staff>, ServiceError> {
        Ok(self
            .load()
            .await?
            .records
            .into_iter()
            .filter(|member| filter.matches(member))
            .collect())
    }

    #[instrument(skip(self), err)]
    pub async fn get(&self, id: &str) -> Result<Staff, ServiceError> {
        let mut staff = self.load().await?.records;
        let index = position(&staff, id)?;
        Ok(staff.swap_remove(index))
    }

    /// Adds a staff member with a generated id. A missing PIN is generated;
    /// new members start available at the default efficiency.
    #[instrument(skip(self, profile), fields(name = %profile.name), err)]
    pub async fn add(&self, profile: NewStaff) -> Result<Staff, ServiceError> {
        profile.validate()?;

        let member = Staff {
            id: Uuid::new_v4().to_string(),
            name: profile.name.trim().to_string(),
            email: profile.email,
            phone: profile.phone,
            role: profile.role,
            status: StaffStatus::Available,
            shift: profile.shift,
            pin: profile.pin.unwrap_or_else(generate_pin),
            hire_date: Utc::now().date_naive(),
            efficiency: profile.efficiency.unwrap_or(DEFAULT_EFFICIENCY),
            rooms_assigned: Default::default(),
            specializations: profile.specializations.into_iter().collect(),
            notes: profile.notes,
        };

        let guard = self.store.exclusive().await;
        let mut snapshot = self.load().await?;
        snapshot.records.push(member.clone());
        self.store
            .save(&guard, keys::STAFF, snapshot.version, &snapshot.records)
            .await?;

        info!(staff_id = %member.id, role = %member.role, "staff member added");
        self.event_sender.send(Event::StaffAdded(member.id.clone()));
        Ok(member)
    }

    /// Applies a profile patch. `busy` is derived from open assignments, so
    /// the patch may neither set it nor change the status of a member who
    /// has open work.
    #[instrument(skip(self, patch), err)]
    pub async fn update(&self, id: &str, patch: StaffPatch) -> Result<Staff, ServiceError> {
        patch.validate()?;

        let guard = self.store.exclusive().await;
        let mut snapshot = self.load().await?;
        let index = position(&snapshot.records, id)?;

        if let Some(status) = patch.status {
            if status == StaffStatus::Busy {
                return Err(ServiceError::conflict(
                    EntityKind::Staff,
                    id,
                    "busy is derived from open assignments",
                ));
            }
            if self.has_open_assignments(id).await? {
                return Err(ServiceError::conflict(
                    EntityKind::Staff,
                    id,
                    "staff member has open assignments",
                ));
            }
        }

        let member = &mut snapshot.records[index];
        let previous_name = member.name.clone();
        patch.apply_to(member);
        member.recompute_status();
        let updated = member.clone();

        // rooms show the current assignee; assignments keep their snapshot
        let mut rooms = self.store.load::<Room>(keys::ROOMS).await?;
        let mut renamed_rooms = 0;
        if updated.name != previous_name {
            for assignee in rooms
                .records
                .iter_mut()
                .filter_map(|room| room.assigned_to.as_mut())
                .filter(|assignee| assignee.id == id)
            {
                assignee.name = updated.name.clone();
                renamed_rooms += 1;
            }
        }

        self.store
            .save(&guard, keys::STAFF, snapshot.version, &snapshot.records)
            .await?;
        if renamed_rooms > 0 {
            self.store
                .save(&guard, keys::ROOMS, rooms.version, &rooms.records)
                .await?;
            info!(staff_id = %id, rooms = renamed_rooms, "assignee name refreshed on rooms");
        }

        self.event_sender.send(Event::StaffUpdated(id.to_string()));
        Ok(updated)
    }

    /// Removes a staff member. Open assignments must be reassigned first;
    /// a member with any is rejected and nothing is written.
    #[instrument(skip(self), err)]
    pub async fn remove(&self, id: &str) -> Result<Staff, ServiceError> {
        let guard = self.store.exclusive().await;
        let mut snapshot = self.load().await?;
        let index = position(&snapshot.records, id)?;

        if self.has_open_assignments(id).await? {
            warn!(staff_id = %id, "refusing to remove staff member with open assignments");
            return Err(ServiceError::conflict(
                EntityKind::Staff,
                id,
                "reassign open assignments before removing",
            ));
        }

        let removed = snapshot.records.remove(index);
        self.store
            .save(&guard, keys::STAFF, snapshot.version, &snapshot.records)
            .await?;

        info!(staff_id = %id, "staff member removed");
        self.event_sender.send(Event::StaffRemoved(id.to_string()));
        Ok(removed)
    }

    /// Exact PIN match. Unknown ids and wrong PINs are indistinguishable.
    #[instrument(skip(self, pin), err)]
    pub async fn authenticate(&self, id: &str, pin: &str) -> Result<Staff, ServiceError> {
        let staff = self.load().await?.records;
        match staff.into_iter().find(|member| member.id == id) {
            Some(member) if member.verify_pin(pin) => Ok(member),
            _ => {
                self.metrics.increment(names::FAILED_LOGINS);
                warn!(staff_id = %id, "authentication failed");
                Err(ServiceError::Unauthorized { id: id.to_string() })
            }
        }
    }

    /// Authenticates and appends the session to the login history.
    #[instrument(skip(self, pin), err)]
    pub async fn login(&self, id: &str, pin: &str) -> Result<LoginRecord, ServiceError> {
        let member = self.authenticate(id, pin).await?;
        let record = LoginRecord {
            staff_id: member.id.clone(),
            name: member.name.clone(),
            role: member.role,
            shift: member.shift,
            login_time: Utc::now(),
        };

        let guard = self.store.exclusive().await;
        let mut history = self.store.load::<LoginRecord>(keys::LOGIN_HISTORY).await?;
        history.records.push(record.clone());
        self.store
            .save(&guard, keys::LOGIN_HISTORY, history.version, &history.records)
            .await?;

        self.metrics.increment(names::LOGINS);
        info!(staff_id = %member.id, name = %member.name, "staff member logged in");
        self.event_sender.send(Event::StaffLoggedIn(member.id));
        Ok(record)
    }

    #[instrument(skip(self), err)]
    pub async fn login_history(&self) -> Result<Vec<LoginRecord>, ServiceError> {
        Ok(self.store.load(keys::LOGIN_HISTORY).await?.records)
    }

    #[instrument(skip(self), err)]
    pub async fn stats(&self) -> Result<StaffStats, ServiceError> {
        let staff = self.load().await?.records;
        let total = staff.len();
        let count = |status: StaffStatus| staff.iter().filter(|m| m.status == status).count();
        let efficiency_by_role = StaffRole::iter()
            .map(|role| RoleEfficiency {
                role,
                members: staff.iter().filter(|m| m.role == role).count(),
                average_efficiency: rounded_average(staff.iter().filter(|m| m.role == role)),
            })
            .collect();
        Ok(StaffStats {
            total,
            available: count(StaffStatus::Available),
            busy: count(StaffStatus::Busy),
            average_efficiency: rounded_average(staff.iter()),
            efficiency_by_role,
        })
    }
}
