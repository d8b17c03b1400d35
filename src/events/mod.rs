use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, warn};

use crate::models::{AssignmentStatus, RoomStatus};

/// Domain events published after a mutation has been written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Room events
    RoomStatusChanged {
        room_number: String,
        old_status: RoomStatus,
        new_status: RoomStatus,
    },
    RoomIssueRecorded {
        room_number: String,
        issue: String,
    },

    // Staff events
    StaffAdded(String),
    StaffUpdated(String),
    StaffRemoved(String),
    StaffLoggedIn(String),

    // Assignment events
    AssignmentCreated {
        assignment_id: String,
        room_number: String,
        staff_id: String,
    },
    AssignmentAdvanced {
        assignment_id: String,
        from: AssignmentStatus,
        to: AssignmentStatus,
    },
    AssignmentReassigned {
        previous_id: String,
        assignment_id: String,
        staff_id: String,
    },

    // Checklist events
    ChecklistFinalized {
        room_number: String,
        completion_id: String,
        photos_pending: usize,
    },

    // Supply events
    StockAdjusted {
        supply_id: String,
        old_stock: u32,
        new_stock: u32,
    },
    StockCritical {
        supply_id: String,
        current_stock: u32,
        min_threshold: u32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender with its receiving half.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Publishes without waiting. The mutation behind an event is already
    /// stored, so delivery problems are logged rather than returned.
    pub fn send(&self, event: Event) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(?event, "event channel full, dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                warn!(?event, "event channel closed, dropping event");
            }
        }
    }
}

/// Drains the channel, logging each event.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockCritical {
                supply_id,
                current_stock,
                min_threshold,
            } => {
                warn!(
                    supply_id = %supply_id,
                    current_stock,
                    min_threshold,
                    "supply at or below minimum threshold"
                );
            }
            Event::ChecklistFinalized {
                room_number,
                photos_pending,
                ..
            } if *photos_pending > 0 => {
                warn!(
                    room_number = %room_number,
                    photos_pending,
                    "room finalized with verification photos missing"
                );
            }
            other => info!(event = ?other, "event processed"),
        }
    }

    info!("Event channel closed, stopping event processing");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (sender, mut rx) = EventSender::channel(4);
        sender.send(Event::StaffAdded("7".into()));
        assert_eq!(rx.recv().await, Some(Event::StaffAdded("7".into())));
    }

    #[tokio::test]
    async fn send_never_blocks_on_a_full_or_closed_channel() {
        let (sender, rx) = EventSender::channel(1);
        sender.send(Event::StaffAdded("1".into()));
        sender.send(Event::StaffAdded("2".into()));
        drop(rx);
        sender.send(Event::StaffRemoved("1".into()));
    }
}
