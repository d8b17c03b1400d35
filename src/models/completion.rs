use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Checklist;

/// Persisted outcome of a finished cleaning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub id: String,
    pub room_number: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub assignment_id: Option<String>,
    #[serde(default)]
    pub completed_by: Option<String>,
    pub completed_tasks: usize,
    pub total_tasks: usize,
    /// Required photos never uploaded; finalization does not block on them.
    #[serde(default)]
    pub photos_pending: usize,
    pub notes: String,
    pub completion_rate: f64,
}

impl CompletionRecord {
    pub fn from_checklist(checklist: &Checklist, notes: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            room_number: checklist.room_number.clone(),
            completed_at: now,
            assignment_id: None,
            completed_by: None,
            completed_tasks: checklist.completed_tasks(),
            total_tasks: checklist.total_tasks(),
            photos_pending: checklist.photo_summary().pending.len(),
            notes: notes.into(),
            completion_rate: checklist.progress(),
        }
    }
}
