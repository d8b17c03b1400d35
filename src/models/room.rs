use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::{Moment, Priority, StaffRef};
use crate::errors::{EntityKind, ServiceError};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RoomStatus {
    Clean,
    Dirty,
    InProgress,
    Maintenance,
    Overdue,
}

impl RoomStatus {
    /// Whether a room may move from `self` to `next`. Re-asserting the
    /// current status is always allowed.
    pub fn can_transition_to(self, next: RoomStatus) -> bool {
        use RoomStatus::*;

        if self == next {
            return true;
        }
        match self {
            Clean => matches!(next, Dirty | InProgress | Maintenance | Overdue),
            Dirty => matches!(next, Clean | InProgress | Maintenance | Overdue),
            InProgress => matches!(next, Clean | Dirty | Maintenance),
            Maintenance => matches!(next, Clean | Dirty),
            Overdue => matches!(next, Clean | Dirty | InProgress | Maintenance),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub number: String,
    pub floor: u32,
    #[serde(rename = "type")]
    pub room_type: String,
    pub status: RoomStatus,
    pub last_cleaned: Moment,
    #[serde(default)]
    pub assigned_to: Option<StaffRef>,
    pub priority: Priority,
    #[serde(default)]
    pub issues: Vec<String>,
}

impl Room {
    pub fn new(number: impl Into<String>, floor: u32, room_type: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            floor,
            room_type: room_type.into(),
            status: RoomStatus::Dirty,
            last_cleaned: Moment::Label("never".to_string()),
            assigned_to: None,
            priority: Priority::Medium,
            issues: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: RoomStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_last_cleaned(mut self, last_cleaned: Moment) -> Self {
        self.last_cleaned = last_cleaned;
        self
    }

    pub fn with_issue(mut self, issue: impl Into<String>) -> Self {
        self.issues.push(issue.into());
        self
    }

    pub fn with_assignee(mut self, staff: StaffRef) -> Self {
        self.assigned_to = Some(staff);
        self
    }

    /// Moves to `next` when the transition table allows it. Returns whether
    /// the status actually changed.
    pub fn transition_to(&mut self, next: RoomStatus) -> Result<bool, ServiceError> {
        if self.status == next {
            return Ok(false);
        }
        if !self.status.can_transition_to(next) {
            return Err(ServiceError::invalid_state(
                EntityKind::Room,
                &self.number,
                format!("cannot move from {} to {}", self.status, next),
            ));
        }
        self.status = next;
        Ok(true)
    }
}

/// Conjunction of optional predicates. Search text matches the room number
/// or the assigned staff member's name, case-insensitively.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomFilter {
    pub status: Option<RoomStatus>,
    pub floor: Option<u32>,
    pub search: Option<String>,
}

impl RoomFilter {
    pub fn matches(&self, room: &Room) -> bool {
        if self.status.is_some_and(|status| room.status != status) {
            return false;
        }
        if self.floor.is_some_and(|floor| room.floor != floor) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                room.number.to_lowercase().contains(&term)
                    || room
                        .assigned_to
                        .as_ref()
                        .is_some_and(|staff| staff.name.to_lowercase().contains(&term))
            }
        }
    }
}
