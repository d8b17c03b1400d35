//! Domain records persisted in the store.
//!
//! Status fields are closed enums with explicit transition tables; the free
//! text accepted by collaborators is parsed into them at the edge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

pub mod assignment;
pub mod checklist;
pub mod completion;
pub mod room;
pub mod staff;
pub mod supply;

pub use assignment::{AssignRoomCommand, Assignment, AssignmentFilter, AssignmentStatus};
pub use checklist::{Area, Checklist, CleaningTask, PendingPhoto, PhotoSummary};
pub use completion::CompletionRecord;
pub use room::{Room, RoomFilter, RoomStatus};
pub use staff::{
    LoginRecord, NewStaff, Shift, Staff, StaffFilter, StaffPatch, StaffRef, StaffRole,
    StaffStatus,
};
pub use supply::{StockStatus, Supply, Usage};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// A point in time, or the relative label older records were written with
/// ("2 hours ago").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Moment {
    At(DateTime<Utc>),
    Label(String),
}

impl Moment {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Moment::At(at) => Some(*at),
            Moment::Label(_) => None,
        }
    }
}

impl From<DateTime<Utc>> for Moment {
    fn from(at: DateTime<Utc>) -> Self {
        Moment::At(at)
    }
}
