use serde::{Deserialize, Serialize};

use crate::errors::{EntityKind, ServiceError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningTask {
    pub id: String,
    pub description: String,
    pub completed: bool,
    pub photo_required: bool,
    pub photo_uploaded: bool,
}

impl CleaningTask {
    fn new(id: &str, description: &str, photo_required: bool) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            completed: false,
            photo_required,
            photo_uploaded: false,
        }
    }

    /// Photo-complete: no photo needed, or the photo is in.
    pub fn photo_complete(&self) -> bool {
        !self.photo_required || self.photo_uploaded
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: String,
    pub area: String,
    pub tasks: Vec<CleaningTask>,
}

/// Task still waiting on its verification photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPhoto {
    pub area_id: String,
    pub task_id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoSummary {
    pub required: usize,
    pub uploaded: usize,
    pub pending: Vec<PendingPhoto>,
}

/// One room's checklist for the current cleaning session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub room_number: String,
    pub areas: Vec<Area>,
}

impl Checklist {
    /// Fresh session: bathroom (6 tasks), bedroom (5), general (4), nothing done.
    pub fn template(room_number: impl Into<String>) -> Self {
        let areas = vec![
            Area {
                id: "bathroom".into(),
                area: "Bathroom".into(),
                tasks: vec![
                    CleaningTask::new("toilet", "Clean and disinfect toilet", true),
                    CleaningTask::new("shower", "Clean shower/bathtub", true),
                    CleaningTask::new("sink", "Clean sink and mirror", false),
                    CleaningTask::new("floor", "Mop bathroom floor", false),
                    CleaningTask::new("towels", "Replace towels", false),
                    CleaningTask::new("supplies", "Restock bathroom supplies", false),
                ],
            },
            Area {
                id: "bedroom".into(),
                area: "Bedroom".into(),
                tasks: vec![
                    CleaningTask::new("bed", "Change bed linens", true),
                    CleaningTask::new("vacuum", "Vacuum carpet/floor", false),
                    CleaningTask::new("dust", "Dust furniture and surfaces", false),
                    CleaningTask::new("windows", "Clean windows and mirrors", false),
                    CleaningTask::new("trash", "Empty trash bins", false),
                ],
            },
            Area {
                id: "general".into(),
                area: "General".into(),
                tasks: vec![
                    CleaningTask::new("entry", "Clean entry area", false),
                    CleaningTask::new("ac", "Check AC/heating", false),
                    CleaningTask::new("amenities", "Restock amenities", false),
                    CleaningTask::new("final", "Final inspection", true),
                ],
            },
        ];
        Self {
            room_number: room_number.into(),
            areas,
        }
    }

    pub fn from_areas(room_number: impl Into<String>, areas: Vec<Area>) -> Self {
        Self {
            room_number: room_number.into(),
            areas,
        }
    }

    pub fn tasks(&self) -> impl Iterator<Item = &CleaningTask> {
        self.areas.iter().flat_map(|area| area.tasks.iter())
    }

    pub fn task(&self, area_id: &str, task_id: &str) -> Option<&CleaningTask> {
        self.areas
            .iter()
            .find(|area| area.id == area_id)?
            .tasks
            .iter()
            .find(|task| task.id == task_id)
    }

    fn task_mut(&mut self, area_id: &str, task_id: &str) -> Result<&mut CleaningTask, ServiceError> {
        self.areas
            .iter_mut()
            .find(|area| area.id == area_id)
            .and_then(|area| area.tasks.iter_mut().find(|task| task.id == task_id))
            .ok_or_else(|| {
                ServiceError::not_found(EntityKind::Task, format!("{}/{}", area_id, task_id))
            })
    }

    /// Flips `completed`. Photo state is not consulted.
    pub fn toggle(&mut self, area_id: &str, task_id: &str) -> Result<bool, ServiceError> {
        let task = self.task_mut(area_id, task_id)?;
        task.completed = !task.completed;
        Ok(task.completed)
    }

    pub fn upload_photo(&mut self, area_id: &str, task_id: &str) -> Result<(), ServiceError> {
        let task = self.task_mut(area_id, task_id)?;
        if !task.photo_required {
            return Err(ServiceError::invalid_state(
                EntityKind::Task,
                format!("{}/{}", area_id, task_id),
                "task does not require a photo",
            ));
        }
        task.photo_uploaded = true;
        Ok(())
    }

    pub fn total_tasks(&self) -> usize {
        self.tasks().count()
    }

    pub fn completed_tasks(&self) -> usize {
        self.tasks().filter(|task| task.completed).count()
    }

    /// Completed share of all tasks, as a percentage.
    pub fn progress(&self) -> f64 {
        let total = self.total_tasks();
        if total == 0 {
            return 0.0;
        }
        self.completed_tasks() as f64 / total as f64 * 100.0
    }

    /// True once every task is completed. Photos are not part of the gate.
    pub fn can_finalize(&self) -> bool {
        let total = self.total_tasks();
        total > 0 && self.completed_tasks() == total
    }

    pub fn photo_summary(&self) -> PhotoSummary {
        let mut required = 0;
        let mut uploaded = 0;
        let mut pending = Vec::new();
        for area in &self.areas {
            for task in area.tasks.iter().filter(|t| t.photo_required) {
                required += 1;
                if task.photo_uploaded {
                    uploaded += 1;
                } else {
                    pending.push(PendingPhoto {
                        area_id: area.id.clone(),
                        task_id: task.id.clone(),
                        description: task.description.clone(),
                    });
                }
            }
        }
        PhotoSummary {
            required,
            uploaded,
            pending,
        }
    }
}
