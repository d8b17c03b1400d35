//! Read-only bulk export of the core collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};

use crate::errors::ServiceError;
use crate::models::{Area, Assignment, CompletionRecord, LoginRecord, Room, Staff, Supply};
use crate::store::{keys, Store};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub exported_at: DateTime<Utc>,
    pub rooms: Vec<Room>,
    pub staff: Vec<Staff>,
    pub assignments: Vec<Assignment>,
    pub supplies: Vec<Supply>,
    pub completion_records: Vec<CompletionRecord>,
    pub login_history: Vec<LoginRecord>,
    /// Stored checklists keyed by room number.
    pub checklists: BTreeMap<String, Vec<Area>>,
}

impl ExportDocument {
    pub fn to_json(&self) -> Result<String, ServiceError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ServiceError::StoreError(e.into()))
    }
}

/// Copies every core collection into one document. Writes nothing, but
/// holds the write gate while reading so a multi-collection commit is
/// never captured half-applied.
#[instrument(skip(store), err)]
pub async fn export(store: &Store) -> Result<ExportDocument, ServiceError> {
    let _gate = store.exclusive().await;
    let mut checklists = BTreeMap::new();
    for key in store.keys().await? {
        if let Some(room_number) = key.strip_prefix(keys::CHECKLIST_PREFIX) {
            let areas = store.load::<Area>(&key).await?.records;
            checklists.insert(room_number.to_string(), areas);
        }
    }

    let document = ExportDocument {
        exported_at: Utc::now(),
        rooms: store.load(keys::ROOMS).await?.records,
        staff: store.load(keys::STAFF).await?.records,
        assignments: store.load(keys::ASSIGNMENTS).await?.records,
        supplies: store.load(keys::SUPPLIES).await?.records,
        completion_records: store.load(keys::COMPLETIONS).await?.records,
        login_history: store.load(keys::LOGIN_HISTORY).await?.records,
        checklists,
    };
    info!(
        rooms = document.rooms.len(),
        staff = document.staff.len(),
        checklists = document.checklists.len(),
        "export assembled"
    );
    Ok(document)
}
