use serde::Serialize;
use strum::Display;
use thiserror::Error;

use crate::store::StoreError;

/// Entity families addressed by keyed errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Room,
    Staff,
    Assignment,
    Supply,
    Checklist,
    Task,
}

/// Coarse error classification handed to collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Unauthorized,
    InvalidState,
    Validation,
    Concurrency,
    Storage,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },

    #[error("Conflict on {entity} {id}: {reason}")]
    Conflict {
        entity: EntityKind,
        id: String,
        reason: String,
    },

    #[error("Unauthorized: invalid credentials for staff {id}")]
    Unauthorized { id: String },

    #[error("Invalid state for {entity} {id}: {reason}")]
    InvalidState {
        entity: EntityKind,
        id: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Concurrent modification of {key}")]
    ConcurrentModification { key: String },

    #[error("Store error: {0}")]
    StoreError(StoreError),
}

impl ServiceError {
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn conflict(entity: EntityKind, id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_state(
        entity: EntityKind,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            entity,
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NotFound { .. } => ErrorKind::NotFound,
            ServiceError::Conflict { .. } => ErrorKind::Conflict,
            ServiceError::Unauthorized { .. } => ErrorKind::Unauthorized,
            ServiceError::InvalidState { .. } => ErrorKind::InvalidState,
            ServiceError::ValidationError(_) => ErrorKind::Validation,
            ServiceError::ConcurrentModification { .. } => ErrorKind::Concurrency,
            ServiceError::StoreError(_) => ErrorKind::Storage,
        }
    }

    /// Id of the entity the rejected operation targeted, when there is one.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            ServiceError::NotFound { id, .. }
            | ServiceError::Conflict { id, .. }
            | ServiceError::Unauthorized { id }
            | ServiceError::InvalidState { id, .. } => Some(id),
            ServiceError::ConcurrentModification { key } => Some(key),
            ServiceError::ValidationError(_) | ServiceError::StoreError(_) => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::StaleWrite { key, .. } => ServiceError::ConcurrentModification { key },
            other => ServiceError::StoreError(other),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(errors.to_string())
    }
}
