//! Initial property data written into an empty store.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal_macros::dec;
use std::collections::BTreeSet;
use tracing::info;

use crate::errors::ServiceError;
use crate::models::{
    Assignment, AssignmentStatus, Moment, Priority, Room, RoomStatus, Shift, Staff, StaffRole,
    StaffStatus, Supply, Usage,
};
use crate::store::{keys, Store, WriteGuard};

fn label(text: &str) -> Moment {
    Moment::Label(text.to_string())
}

fn room_table() -> Vec<Room> {
    use RoomStatus::*;

    vec![
        Room::new("101", 1, "Standard")
            .with_status(Clean)
            .with_priority(Priority::Low)
            .with_last_cleaned(label("2 hours ago")),
        Room::new("102", 1, "Standard")
            .with_status(Overdue)
            .with_priority(Priority::High)
            .with_last_cleaned(label("6 hours ago"))
            .with_issue("Bathroom needs attention"),
        Room::new("103", 1, "Deluxe")
            .with_status(InProgress)
            .with_last_cleaned(label("30 min ago")),
        Room::new("201", 2, "Standard")
            .with_status(Dirty)
            .with_last_cleaned(label("4 hours ago")),
        Room::new("202", 2, "Suite")
            .with_status(Clean)
            .with_priority(Priority::Low)
            .with_last_cleaned(label("1 hour ago")),
        Room::new("203", 2, "Standard")
            .with_status(Maintenance)
            .with_priority(Priority::High)
            .with_last_cleaned(label("8 hours ago"))
            .with_issue("AC repair needed"),
        Room::new("301", 3, "Deluxe")
            .with_status(Clean)
            .with_priority(Priority::Low)
            .with_last_cleaned(label("3 hours ago")),
        Room::new("302", 3, "Standard")
            .with_status(Dirty)
            .with_last_cleaned(label("5 hours ago")),
        Room::new("303", 3, "Suite")
            .with_status(InProgress)
            .with_last_cleaned(label("45 min ago")),
        Room::new("401", 4, "Standard")
            .with_status(Overdue)
            .with_priority(Priority::High)
            .with_last_cleaned(label("7 hours ago"))
            .with_issue("Guest complaint"),
    ]
}

#[allow(clippy::too_many_arguments)]
fn member(
    id: &str,
    name: &str,
    email: &str,
    role: StaffRole,
    status: StaffStatus,
    shift: Shift,
    pin: &str,
    hired: (i32, u32, u32),
    efficiency: u8,
    specializations: &[&str],
    notes: &str,
) -> Staff {
    Staff {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        phone: format!("+1-555-010{}", id),
        role,
        status,
        shift,
        pin: pin.to_string(),
        hire_date: NaiveDate::from_ymd_opt(hired.0, hired.1, hired.2).unwrap_or(NaiveDate::MIN),
        efficiency,
        rooms_assigned: BTreeSet::new(),
        specializations: specializations.iter().map(|s| s.to_string()).collect(),
        notes: notes.to_string(),
    }
}

pub fn staff() -> Vec<Staff> {
    use StaffRole::*;
    use StaffStatus::*;

    let mut roster = vec![
        member(
            "1",
            "Maria Santos",
            "maria@hotel.com",
            Housekeeper,
            Available,
            Shift::Morning,
            "1234",
            (2023, 1, 15),
            95,
            &["Deep Cleaning", "VIP Suites"],
            "Excellent attention to detail. Preferred for VIP guests.",
        ),
        member(
            "2",
            "John Davis",
            "john@hotel.com",
            Housekeeper,
            Busy,
            Shift::Morning,
            "2345",
            (2023, 3, 20),
            88,
            &["Standard Rooms", "Quick Turnovers"],
            "Fast and reliable. Good for high-volume days.",
        ),
        member(
            "3",
            "Sarah Lee",
            "sarah@hotel.com",
            Supervisor,
            Available,
            Shift::FullDay,
            "3456",
            (2022, 8, 10),
            92,
            &["Quality Control", "Training", "Inventory"],
            "Team leader with excellent organizational skills.",
        ),
        member(
            "4",
            "Mike Rodriguez",
            "mike@hotel.com",
            Maintenance,
            Break,
            Shift::Morning,
            "4567",
            (2023, 5, 12),
            85,
            &["HVAC", "Plumbing", "Electrical"],
            "Handles all maintenance requests efficiently.",
        ),
        member(
            "5",
            "Lisa Kim",
            "lisa@hotel.com",
            Housekeeper,
            Busy,
            Shift::Evening,
            "5678",
            (2021, 11, 2),
            97,
            &["Deep Cleaning", "Suites"],
            "Senior housekeeper.",
        ),
        member(
            "6",
            "Tom Brown",
            "tom@hotel.com",
            Manager,
            Available,
            Shift::FullDay,
            "6789",
            (2020, 6, 1),
            90,
            &[],
            "",
        ),
    ];
    roster[1].rooms_assigned.insert("103".to_string());
    roster[4].rooms_assigned.insert("303".to_string());
    roster
}

/// One finished and two running cleanings, consistent with [`rooms`] and
/// [`staff`].
pub fn assignments(now: DateTime<Utc>) -> Vec<Assignment> {
    let roster = staff();
    let mut done = Assignment::new(
        "101",
        &roster[0].to_ref(),
        Priority::Low,
        45,
        now - Duration::hours(3),
    );
    done.status = AssignmentStatus::Completed;
    done.started_at = Some(done.assigned_at + Duration::minutes(5));
    done.completed_at = Some(now - Duration::hours(2));

    let mut running = Vec::new();
    for (room, member, minutes) in [("103", &roster[1], 56), ("303", &roster[4], 68)] {
        let mut assignment = Assignment::new(
            room,
            &member.to_ref(),
            Priority::Medium,
            minutes,
            now - Duration::minutes(30),
        );
        assignment.status = AssignmentStatus::InProgress;
        assignment.started_at = Some(assignment.assigned_at);
        running.push(assignment);
    }

    let mut all = vec![done];
    all.extend(running);
    all
}

/// The property's rooms, with the running assignee set on 103 and 303.
pub fn rooms() -> Vec<Room> {
    let roster = staff();
    room_table()
        .into_iter()
        .map(|room| {
            match roster
                .iter()
                .find(|member| member.rooms_assigned.contains(&room.number))
            {
                Some(member) => room.with_assignee(member.to_ref()),
                None => room,
            }
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn supply(
    id: &str,
    name: &str,
    category: &str,
    stock: (u32, u32, u32),
    unit: &str,
    cost_per_unit: rust_decimal::Decimal,
    restocked: &str,
    usage: (u32, u32, u32),
) -> Supply {
    Supply {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        current_stock: stock.0,
        min_threshold: stock.1,
        max_capacity: stock.2,
        unit: unit.to_string(),
        cost_per_unit,
        last_restocked: label(restocked),
        usage: Usage {
            daily: usage.0,
            weekly: usage.1,
            monthly: usage.2,
        },
    }
}

pub fn supplies() -> Vec<Supply> {
    vec![
        supply("1", "Toilet Paper", "Bathroom", (45, 20, 100), "rolls", dec!(1.25), "2 days ago", (8, 56, 240)),
        supply("2", "Towels", "Bathroom", (12, 15, 50), "pieces", dec!(8.50), "1 week ago", (3, 21, 90)),
        supply("3", "Bed Sheets", "Bedroom", (28, 25, 75), "sets", dec!(15.00), "3 days ago", (4, 28, 120)),
        supply("4", "All-Purpose Cleaner", "Cleaning", (8, 10, 30), "bottles", dec!(3.75), "5 days ago", (2, 14, 60)),
        supply("5", "Vacuum Bags", "Equipment", (25, 15, 50), "pieces", dec!(2.00), "1 week ago", (1, 7, 30)),
        supply("6", "Disinfectant", "Cleaning", (6, 12, 40), "bottles", dec!(4.25), "4 days ago", (3, 21, 90)),
    ]
}

/// Writes seed data into every core collection that does not exist yet.
/// Returns the keys that were written.
pub async fn populate(store: &Store, guard: &WriteGuard) -> Result<Vec<&'static str>, ServiceError> {
    let now = Utc::now();
    let mut written = Vec::new();

    if store.load::<Room>(keys::ROOMS).await?.is_absent() {
        store.save(guard, keys::ROOMS, 0, &rooms()).await?;
        written.push(keys::ROOMS);
    }
    if store.load::<Staff>(keys::STAFF).await?.is_absent() {
        store.save(guard, keys::STAFF, 0, &staff()).await?;
        written.push(keys::STAFF);
    }
    if store.load::<Assignment>(keys::ASSIGNMENTS).await?.is_absent() {
        store.save(guard, keys::ASSIGNMENTS, 0, &assignments(now)).await?;
        written.push(keys::ASSIGNMENTS);
    }
    if store.load::<Supply>(keys::SUPPLIES).await?.is_absent() {
        store.save(guard, keys::SUPPLIES, 0, &supplies()).await?;
        written.push(keys::SUPPLIES);
    }

    if !written.is_empty() {
        info!(collections = ?written, "seeded empty store");
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_staff_match_running_assignments() {
        let roster = staff();
        let running: Vec<_> = assignments(Utc::now())
            .into_iter()
            .filter(|a| a.is_open())
            .collect();
        for member in &roster {
            let open: BTreeSet<String> = running
                .iter()
                .filter(|a| a.staff_id == member.id)
                .map(|a| a.room_number.clone())
                .collect();
            assert_eq!(member.rooms_assigned, open, "staff {}", member.id);
            assert_eq!(member.status == StaffStatus::Busy, !open.is_empty());
        }
    }

    #[test]
    fn assignees_only_on_running_rooms() {
        let assigned: Vec<String> = rooms()
            .into_iter()
            .filter(|room| room.assigned_to.is_some())
            .map(|room| room.number)
            .collect();
        assert_eq!(assigned, vec!["103".to_string(), "303".to_string()]);
    }

    #[tokio::test]
    async fn populate_skips_existing_collections() {
        let store = Store::in_memory();
        let guard = store.exclusive().await;
        store.save(&guard, keys::ROOMS, 0, &rooms()[..1]).await.unwrap();

        let written = populate(&store, &guard).await.unwrap();
        assert_eq!(written, vec![keys::STAFF, keys::ASSIGNMENTS, keys::SUPPLIES]);
        assert_eq!(store.load::<Room>(keys::ROOMS).await.unwrap().records.len(), 1);
        assert!(populate(&store, &guard).await.unwrap().is_empty());
    }
}
