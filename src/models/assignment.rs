use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;
use validator::Validate;

use super::{Priority, StaffRef};

/// `pending -> in-progress -> completed`, with `superseded` reachable from
/// either open state through reassignment only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AssignmentStatus {
    Pending,
    InProgress,
    Completed,
    Superseded,
}

impl AssignmentStatus {
    pub fn is_open(self) -> bool {
        matches!(self, AssignmentStatus::Pending | AssignmentStatus::InProgress)
    }

    /// The forward step, if any.
    pub fn next(self) -> Option<AssignmentStatus> {
        match self {
            AssignmentStatus::Pending => Some(AssignmentStatus::InProgress),
            AssignmentStatus::InProgress => Some(AssignmentStatus::Completed),
            AssignmentStatus::Completed | AssignmentStatus::Superseded => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub room_number: String,
    pub staff_id: String,
    /// Name at creation time; not refreshed when the staff record changes.
    pub staff_name: String,
    pub priority: Priority,
    #[serde(rename = "estimatedTime")]
    pub estimated_minutes: u32,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    pub due_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<String>,
}

impl Assignment {
    pub fn new(
        room_number: impl Into<String>,
        staff: &StaffRef,
        priority: Priority,
        estimated_minutes: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            room_number: room_number.into(),
            staff_id: staff.id.clone(),
            staff_name: staff.name.clone(),
            priority,
            estimated_minutes,
            status: AssignmentStatus::Pending,
            assigned_at: now,
            due_time: now + Duration::minutes(i64::from(estimated_minutes)),
            started_at: None,
            completed_at: None,
            superseded_by: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && now > self.due_time
    }

    /// Moves one step forward, stamping the matching timestamp. Returns the
    /// current status unchanged as the error when already terminal.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<AssignmentStatus, AssignmentStatus> {
        let next = self.status.next().ok_or(self.status)?;
        match next {
            AssignmentStatus::InProgress => self.started_at = Some(now),
            AssignmentStatus::Completed => self.completed_at = Some(now),
            AssignmentStatus::Pending | AssignmentStatus::Superseded => {}
        }
        self.status = next;
        Ok(next)
    }

    pub fn supersede(&mut self, successor_id: &str) {
        self.status = AssignmentStatus::Superseded;
        self.superseded_by = Some(successor_id.to_string());
    }
}

/// Request to bind a staff member to a room.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoomCommand {
    #[validate(length(min = 1, message = "staff id is required"))]
    pub staff_id: String,
    #[validate(length(min = 1, message = "room number is required"))]
    pub room_number: String,
    /// Defaults to the room's priority.
    pub priority: Option<Priority>,
    /// Defaults to the weighted estimate.
    #[validate(range(min = 1, max = 1440))]
    pub estimated_minutes: Option<u32>,
}

impl AssignRoomCommand {
    pub fn new(staff_id: impl Into<String>, room_number: impl Into<String>) -> Self {
        Self {
            staff_id: staff_id.into(),
            room_number: room_number.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentFilter {
    pub status: Option<AssignmentStatus>,
    pub staff_id: Option<String>,
    pub room_number: Option<String>,
}

impl AssignmentFilter {
    pub fn matches(&self, assignment: &Assignment) -> bool {
        self.status.map_or(true, |s| assignment.status == s)
            && self
                .staff_id
                .as_deref()
                .map_or(true, |id| assignment.staff_id == id)
            && self
                .room_number
                .as_deref()
                .map_or(true, |room| assignment.room_number == room)
    }
}
