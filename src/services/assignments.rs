use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    config::SchedulingConfig,
    errors::{EntityKind, ServiceError},
    events::{Event, EventSender},
    metrics::{names, Metrics},
    models::{
        AssignRoomCommand, Assignment, AssignmentFilter, AssignmentStatus, Room, RoomStatus,
        Staff, StaffStatus,
    },
    services::{rooms, staff},
    store::{keys, Snapshot, Store, WriteGuard},
};

const MIN_ESTIMATED_MINUTES: u32 = 5;

/// Weighted cleaning estimate: base minutes scaled by room type and by the
/// staff member's specializations, rounded, never below five minutes.
pub fn estimate_minutes(base: u32, room_type: &str, staff: &Staff) -> u32 {
    let is_suite = room_type.eq_ignore_ascii_case("suite");
    let room_factor = if room_type.eq_ignore_ascii_case("deluxe") {
        1.25
    } else if is_suite {
        1.5
    } else {
        1.0
    };

    let mut staff_factor = 1.0;
    if staff.has_specialization("Quick Turnovers") {
        staff_factor *= 0.85;
    }
    if is_suite && staff.has_specialization("VIP Suites") {
        staff_factor *= 0.9;
    }

    let minutes = (f64::from(base) * room_factor * staff_factor).round();
    (minutes as u32).max(MIN_ESTIMATED_MINUTES)
}

/// Rooms, staff and assignments read together so one operation can check
/// all of its preconditions before writing any of them.
struct Board {
    rooms: Snapshot<Room>,
    staff: Snapshot<Staff>,
    assignments: Snapshot<Assignment>,
    /// Rooms whose stored checklist is dropped on commit.
    reset_checklists: Vec<String>,
}

impl Board {
    async fn load(store: &Store) -> Result<Self, ServiceError> {
        Ok(Self {
            rooms: store.load(keys::ROOMS).await?,
            staff: store.load(keys::STAFF).await?,
            assignments: store.load(keys::ASSIGNMENTS).await?,
            reset_checklists: Vec::new(),
        })
    }

    async fn commit(&self, store: &Store, guard: &WriteGuard) -> Result<(), ServiceError> {
        store
            .save(guard, keys::ASSIGNMENTS, self.assignments.version, &self.assignments.records)
            .await?;
        store
            .save(guard, keys::STAFF, self.staff.version, &self.staff.records)
            .await?;
        store
            .save(guard, keys::ROOMS, self.rooms.version, &self.rooms.records)
            .await?;
        for room_number in &self.reset_checklists {
            store.remove(guard, &keys::checklist(room_number)).await?;
        }
        Ok(())
    }

    fn assignment_index(&self, id: &str) -> Result<usize, ServiceError> {
        self.assignments
            .records
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| ServiceError::not_found(EntityKind::Assignment, id))
    }

    fn open_index_for_room(&self, room_number: &str) -> Option<usize> {
        self.assignments
            .records
            .iter()
            .position(|a| a.room_number == room_number && a.is_open())
    }

    /// Drops `room_number` from the member's open rooms and re-derives busy.
    /// A member removed from the roster has nothing to update.
    fn release(&mut self, staff_id: &str, room_number: &str) {
        if let Some(member) = self.staff.records.iter_mut().find(|m| m.id == staff_id) {
            member.rooms_assigned.remove(room_number);
            member.recompute_status();
        }
    }

    /// One forward step for the assignment at `index`, carrying the room
    /// and staff side effects. Only mutates the in-memory board.
    fn advance_at(
        &mut self,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<(AssignmentStatus, AssignmentStatus), ServiceError> {
        let assignment = &self.assignments.records[index];
        let from = assignment.status;
        let id = assignment.id.clone();
        let room_number = assignment.room_number.clone();
        let staff_id = assignment.staff_id.clone();

        let to = from.next().ok_or_else(|| {
            ServiceError::invalid_state(
                EntityKind::Assignment,
                &id,
                format!("assignment is already {}", from),
            )
        })?;

        let room_index = rooms::position(&self.rooms.records, &room_number)?;
        let room = &mut self.rooms.records[room_index];
        match to {
            AssignmentStatus::InProgress => {
                room.transition_to(RoomStatus::InProgress)?;
            }
            AssignmentStatus::Completed => {
                room.transition_to(RoomStatus::Clean)?;
                room.assigned_to = None;
                room.last_cleaned = now.into();
            }
            AssignmentStatus::Pending | AssignmentStatus::Superseded => {}
        }

        // the room checks above may fail, so the assignment moves last
        self.assignments.records[index]
            .advance(now)
            .map_err(|status| {
                ServiceError::invalid_state(
                    EntityKind::Assignment,
                    &id,
                    format!("assignment is already {}", status),
                )
            })?;
        if to == AssignmentStatus::Completed {
            self.release(&staff_id, &room_number);
        }
        Ok((from, to))
    }
}

/// A validated, not yet written, end of a room's cleaning session.
pub(crate) struct RoomCloseout {
    board: Board,
    steps: Vec<(AssignmentStatus, AssignmentStatus)>,
    pub(crate) assignment: Option<Assignment>,
}

/// Binds staff to rooms and drives each assignment through its lifecycle.
#[derive(Clone)]
pub struct AssignmentScheduler {
    store: Store,
    event_sender: Arc<EventSender>,
    metrics: Arc<Metrics>,
    scheduling: SchedulingConfig,
}

impl AssignmentScheduler {
    pub fn new(
        store: Store,
        event_sender: Arc<EventSender>,
        metrics: Arc<Metrics>,
        scheduling: SchedulingConfig,
    ) -> Self {
        Self {
            store,
            event_sender,
            metrics,
            scheduling,
        }
    }

    async fn load_assignments(&self) -> Result<Vec<Assignment>, ServiceError> {
        Ok(self.store.load(keys::ASSIGNMENTS).await?.records)
    }

    /// Creates a pending assignment. Preconditions are checked in order:
    /// staff exists, room exists, staff available, room free of open work,
    /// room not under maintenance.
    #[instrument(skip(self), err)]
    pub async fn assign(&self, command: AssignRoomCommand) -> Result<Assignment, ServiceError> {
        command.validate()?;
        let now = Utc::now();

        let guard = self.store.exclusive().await;
        let mut board = Board::load(&self.store).await?;

        let staff_index = staff::position(&board.staff.records, &command.staff_id)?;
        let room_index = rooms::position(&board.rooms.records, &command.room_number)?;

        let member = &board.staff.records[staff_index];
        if member.status != StaffStatus::Available {
            return Err(ServiceError::conflict(
                EntityKind::Staff,
                &member.id,
                format!("staff member is {}", member.status),
            ));
        }
        if let Some(open) = board.open_index_for_room(&command.room_number) {
            return Err(ServiceError::conflict(
                EntityKind::Room,
                &command.room_number,
                format!(
                    "room already has open assignment {}",
                    board.assignments.records[open].id
                ),
            ));
        }
        let room = &board.rooms.records[room_index];
        if room.status == RoomStatus::Maintenance {
            return Err(ServiceError::invalid_state(
                EntityKind::Room,
                &room.number,
                "room is under maintenance",
            ));
        }

        let priority = command.priority.unwrap_or(room.priority);
        let minutes = command.estimated_minutes.unwrap_or_else(|| {
            estimate_minutes(
                self.scheduling.default_estimated_minutes,
                &room.room_type,
                member,
            )
        });
        let staff_ref = member.to_ref();
        let assignment = Assignment::new(&command.room_number, &staff_ref, priority, minutes, now);

        let member = &mut board.staff.records[staff_index];
        member.rooms_assigned.insert(command.room_number.clone());
        member.recompute_status();
        board.rooms.records[room_index].assigned_to = Some(staff_ref);
        board.assignments.records.push(assignment.clone());
        // a new session starts from a fresh checklist
        board.reset_checklists.push(command.room_number.clone());

        board.commit(&self.store, &guard).await?;

        self.metrics.increment(names::ASSIGNMENTS_CREATED);
        info!(
            assignment_id = %assignment.id,
            room_number = %assignment.room_number,
            staff_id = %assignment.staff_id,
            estimated_minutes = assignment.estimated_minutes,
            "room assigned"
        );
        self.event_sender.send(Event::AssignmentCreated {
            assignment_id: assignment.id.clone(),
            room_number: assignment.room_number.clone(),
            staff_id: assignment.staff_id.clone(),
        });
        Ok(assignment)
    }

    /// Moves an assignment one step: pending to in-progress, or in-progress
    /// to completed.
    #[instrument(skip(self), err)]
    pub async fn advance(&self, id: &str) -> Result<Assignment, ServiceError> {
        let guard = self.store.exclusive().await;
        let mut board = Board::load(&self.store).await?;
        let index = board.assignment_index(id)?;
        let (from, to) = board.advance_at(index, Utc::now())?;
        board.commit(&self.store, &guard).await?;

        self.advanced(id, from, to);
        Ok(board.assignments.records[index].clone())
    }

    fn advanced(&self, id: &str, from: AssignmentStatus, to: AssignmentStatus) {
        if to == AssignmentStatus::Completed {
            self.metrics.increment(names::ASSIGNMENTS_COMPLETED);
        }
        info!(assignment_id = %id, %from, %to, "assignment advanced");
        self.event_sender.send(Event::AssignmentAdvanced {
            assignment_id: id.to_string(),
            from,
            to,
        });
    }

    /// Plans the close-out of a cleaning of `room_number` without writing.
    /// The open assignment is advanced to completed, through in-progress
    /// when still pending; with none the room is marked clean directly. The
    /// room's checklist is dropped so the finished session cannot be
    /// finalized twice. Every check runs here, before any write.
    pub(crate) async fn prepare_closeout(
        &self,
        room_number: &str,
        now: DateTime<Utc>,
    ) -> Result<RoomCloseout, ServiceError> {
        let mut board = Board::load(&self.store).await?;
        let room_index = rooms::position(&board.rooms.records, room_number)?;

        let mut steps = Vec::new();
        let assignment = match board.open_index_for_room(room_number) {
            Some(index) => {
                while board.assignments.records[index].is_open() {
                    steps.push(board.advance_at(index, now)?);
                }
                Some(board.assignments.records[index].clone())
            }
            None => {
                let room = &mut board.rooms.records[room_index];
                room.transition_to(RoomStatus::Clean)?;
                room.last_cleaned = now.into();
                None
            }
        };
        board.reset_checklists.push(room_number.to_string());
        Ok(RoomCloseout {
            board,
            steps,
            assignment,
        })
    }

    /// Writes a planned close-out under a gate the caller holds.
    pub(crate) async fn commit_closeout(
        &self,
        guard: &WriteGuard,
        closeout: RoomCloseout,
    ) -> Result<(), ServiceError> {
        closeout.board.commit(&self.store, guard).await?;
        if let Some(assignment) = &closeout.assignment {
            for (from, to) in closeout.steps {
                self.advanced(&assignment.id, from, to);
            }
        }
        Ok(())
    }

    /// Hands an open assignment to another available staff member. The old
    /// assignment is superseded and a new pending one replaces it.
    #[instrument(skip(self), err)]
    pub async fn reassign(&self, id: &str, new_staff_id: &str) -> Result<Assignment, ServiceError> {
        let now = Utc::now();
        let guard = self.store.exclusive().await;
        let mut board = Board::load(&self.store).await?;

        let index = board.assignment_index(id)?;
        let previous = board.assignments.records[index].clone();
        if !previous.is_open() {
            return Err(ServiceError::invalid_state(
                EntityKind::Assignment,
                id,
                format!("assignment is already {}", previous.status),
            ));
        }
        let staff_index = staff::position(&board.staff.records, new_staff_id)?;
        let member = &board.staff.records[staff_index];
        if member.status != StaffStatus::Available {
            return Err(ServiceError::conflict(
                EntityKind::Staff,
                new_staff_id,
                format!("staff member is {}", member.status),
            ));
        }
        let room_index = rooms::position(&board.rooms.records, &previous.room_number)?;

        let staff_ref = member.to_ref();
        let replacement = Assignment::new(
            &previous.room_number,
            &staff_ref,
            previous.priority,
            previous.estimated_minutes,
            now,
        );

        board.assignments.records[index].supersede(&replacement.id);
        board.release(&previous.staff_id, &previous.room_number);
        let member = &mut board.staff.records[staff_index];
        member.rooms_assigned.insert(previous.room_number.clone());
        member.recompute_status();
        board.rooms.records[room_index].assigned_to = Some(staff_ref);
        board.assignments.records.push(replacement.clone());

        board.commit(&self.store, &guard).await?;

        self.metrics.increment(names::ASSIGNMENTS_REASSIGNED);
        info!(
            previous_id = %previous.id,
            assignment_id = %replacement.id,
            from_staff = %previous.staff_id,
            to_staff = %new_staff_id,
            "assignment reassigned"
        );
        self.event_sender.send(Event::AssignmentReassigned {
            previous_id: previous.id,
            assignment_id: replacement.id.clone(),
            staff_id: new_staff_id.to_string(),
        });
        Ok(replacement)
    }

    /// Available staff, most efficient first, ties by ascending id.
    #[instrument(skip(self), err)]
    pub async fn candidates(&self) -> Result<Vec<Staff>, ServiceError> {
        let mut staff: Vec<Staff> = self
            .store
            .load::<Staff>(keys::STAFF)
            .await?
            .records
            .into_iter()
            .filter(|member| member.status == StaffStatus::Available)
            .collect();
        staff.sort_by(|a, b| b.efficiency.cmp(&a.efficiency).then_with(|| a.id.cmp(&b.id)));
        Ok(staff)
    }

    #[instrument(skip(self), err)]
    pub async fn get(&self, id: &str) -> Result<Assignment, ServiceError> {
        self.load_assignments()
            .await?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| ServiceError::not_found(EntityKind::Assignment, id))
    }

    #[instrument(skip(self), err)]
    pub async fn list(&self, filter: AssignmentFilter) -> Result<Vec<Assignment>, ServiceError> {
        Ok(self
            .load_assignments()
            .await?
            .into_iter()
            .filter(|a| filter.matches(a))
            .collect())
    }

    pub async fn open_for_room(&self, room_number: &str) -> Result<Option<Assignment>, ServiceError> {
        Ok(self
            .load_assignments()
            .await?
            .into_iter()
            .find(|a| a.room_number == room_number && a.is_open()))
    }

    pub async fn open_for_staff(&self, staff_id: &str) -> Result<Vec<Assignment>, ServiceError> {
        Ok(self
            .load_assignments()
            .await?
            .into_iter()
            .filter(|a| a.staff_id == staff_id && a.is_open())
            .collect())
    }

    /// Open assignments whose due time has passed.
    pub async fn overdue(&self, now: DateTime<Utc>) -> Result<Vec<Assignment>, ServiceError> {
        Ok(self
            .load_assignments()
            .await?
            .into_iter()
            .filter(|a| a.is_overdue(now))
            .collect())
    }
}
