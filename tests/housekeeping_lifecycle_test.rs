mod common;

use assert_matches::assert_matches;
use common::TestApp;
use housekeeping_core::{
    errors::{EntityKind, ErrorKind, ServiceError},
    metrics::names,
    models::{AssignRoomCommand, AssignmentStatus, RoomFilter, RoomStatus, StaffStatus},
};

#[tokio::test]
async fn full_cleaning_cycle_returns_room_and_staff_to_rest() {
    let test = TestApp::new().await;
    let app = &test.app;

    let maria = test.stored_staff("1").await;
    assert_eq!(maria.efficiency, 95);
    assert_eq!(maria.status, StaffStatus::Available);

    let assignment = app
        .assignments
        .assign(AssignRoomCommand::new("1", "101"))
        .await
        .unwrap();
    assert_eq!(test.stored_staff("1").await.status, StaffStatus::Busy);

    let started = app.assignments.advance(&assignment.id).await.unwrap();
    assert_eq!(started.status, AssignmentStatus::InProgress);
    assert_eq!(test.stored_room("101").await.status, RoomStatus::InProgress);

    test.complete_every_task("101").await;
    assert_eq!(app.checklists.progress("101").await.unwrap(), 100.0);

    let record = app
        .checklists
        .finalize("101", "Guest requested extra pillows")
        .await
        .unwrap();
    assert_eq!(record.total_tasks, 15);
    assert_eq!(record.completed_by.as_deref(), Some("Maria Santos"));

    let room = test.stored_room("101").await;
    assert_eq!(room.status, RoomStatus::Clean);
    assert!(room.assigned_to.is_none());
    assert_eq!(
        app.assignments.get(&assignment.id).await.unwrap().status,
        AssignmentStatus::Completed
    );
    let maria = test.stored_staff("1").await;
    assert_eq!(maria.status, StaffStatus::Available);
    assert!(maria.rooms_assigned.is_empty());
    assert_eq!(app.metrics.get(names::CHECKLISTS_FINALIZED), 1);
}

#[tokio::test]
async fn second_assignment_on_a_room_conflicts() {
    let test = TestApp::new().await;
    let app = &test.app;

    app.assignments
        .assign(AssignRoomCommand::new("1", "201"))
        .await
        .unwrap();
    let err = app
        .assignments
        .assign(AssignRoomCommand::new("6", "201"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.entity_id(), Some("201"));

    let open = app
        .assignments
        .list(Default::default())
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.room_number == "201" && a.is_open())
        .count();
    assert_eq!(open, 1);
    // Tom was never touched
    assert_eq!(test.stored_staff("6").await.status, StaffStatus::Available);
}

#[tokio::test]
async fn removing_staff_with_running_work_changes_nothing() {
    let test = TestApp::new().await;
    let app = &test.app;

    let running = app.assignments.open_for_room("103").await.unwrap().unwrap();
    assert_eq!(running.status, AssignmentStatus::InProgress);
    let john_before = test.stored_staff("2").await;

    let err = app.staff.remove("2").await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict { entity: EntityKind::Staff, .. });

    assert_eq!(test.stored_staff("2").await, john_before);
    assert_eq!(test.stored_assignment(&running.id).await, running);
}

#[tokio::test]
async fn reassign_then_remove_the_previous_staff_member() {
    let test = TestApp::new().await;
    let app = &test.app;

    let running = app.assignments.open_for_room("103").await.unwrap().unwrap();
    let replacement = app.assignments.reassign(&running.id, "3").await.unwrap();
    assert_eq!(replacement.room_number, "103");

    let removed = app.staff.remove("2").await.unwrap();
    assert_eq!(removed.name, "John Davis");

    // the room keeps its history under the old name snapshot
    let history = app
        .assignments
        .list(housekeeping_core::models::AssignmentFilter {
            room_number: Some("103".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    let names: Vec<_> = history.iter().map(|a| a.staff_name.as_str()).collect();
    assert_eq!(names, vec!["John Davis", "Sarah Lee"]);
    assert_eq!(
        test.stored_room("103").await.assigned_to.map(|s| s.name),
        Some("Sarah Lee".to_string())
    );
}

#[tokio::test]
async fn missing_photo_does_not_block_finalize() {
    let test = TestApp::new().await;
    let app = &test.app;

    for (area, task) in [("bathroom", "toilet"), ("bathroom", "shower"), ("bedroom", "bed")] {
        app.checklists.upload_photo("302", area, task).await.unwrap();
    }
    test.complete_every_task("302").await;

    let summary = app.checklists.photo_summary("302").await.unwrap();
    assert_eq!(summary.pending.len(), 1);
    assert_eq!(summary.pending[0].task_id, "final");
    assert!(app.checklists.can_finalize("302").await.unwrap());

    let record = app.checklists.finalize("302", "").await.unwrap();
    assert_eq!(record.photos_pending, 1);
    assert_eq!(test.stored_room("302").await.status, RoomStatus::Clean);
}

#[tokio::test]
async fn new_assignment_starts_a_fresh_checklist() {
    let test = TestApp::new().await;
    let app = &test.app;

    app.checklists
        .toggle_task("201", "bedroom", "bed")
        .await
        .unwrap();
    assert_eq!(app.checklists.get("201").await.unwrap().completed_tasks(), 1);

    app.assignments
        .assign(AssignRoomCommand::new("3", "201"))
        .await
        .unwrap();
    assert_eq!(app.checklists.get("201").await.unwrap().completed_tasks(), 0);
}

#[tokio::test]
async fn finished_session_is_not_finalized_twice() {
    let test = TestApp::new().await;
    let app = &test.app;

    test.complete_every_task("201").await;
    app.checklists.finalize("201", "").await.unwrap();
    assert_eq!(app.checklists.get("201").await.unwrap().completed_tasks(), 0);

    app.rooms.set_status("201", RoomStatus::Dirty).await.unwrap();
    let err = app.checklists.finalize("201", "").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    assert_eq!(test.stored_room("201").await.status, RoomStatus::Dirty);
    assert_eq!(app.checklists.completions(Some("201")).await.unwrap().len(), 1);
    assert_eq!(app.dashboard.sample().await.unwrap().completed_today, 1);
}

#[tokio::test]
async fn dashboard_reflects_completed_work_without_writing() {
    let test = TestApp::new().await;
    let app = &test.app;

    let before = app.dashboard.sample().await.unwrap();
    assert_eq!(before.total_rooms, 10);
    assert_eq!(before.pending_tasks, 2);
    assert_eq!(before.active_staff, 5);
    assert_eq!(before.critical_supplies, 3);

    let keys_before = test.store().keys().await.unwrap();
    test.complete_every_task("401").await;
    app.checklists.finalize("401", "").await.unwrap();

    let after = app.dashboard.sample().await.unwrap();
    assert_eq!(after.completed_today, 1);
    assert_eq!(after.clean_rooms, before.clean_rooms + 1);
    assert_eq!(after.overdue_rooms, before.overdue_rooms - 1);
    assert_eq!(app.dashboard.latest().await, Some(after));

    let dirty = app
        .rooms
        .list(RoomFilter {
            status: Some(RoomStatus::Dirty),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(dirty.len(), 2);
    let keys_after = test.store().keys().await.unwrap();
    assert!(!keys_before.contains(&"completion-records".to_string()));
    assert!(keys_after.contains(&"completion-records".to_string()));
    assert!(keys_after.iter().all(|key| !key.starts_with("cleaning-tasks-")));
}

#[tokio::test]
async fn concurrent_assigns_for_one_room_admit_exactly_one() {
    let test = TestApp::new().await;
    let scheduler = test.app.assignments.clone();

    let attempts = ["1", "3", "6"].map(|staff| {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.assign(AssignRoomCommand::new(staff, "302")).await })
    });

    let mut admitted = 0;
    let mut conflicts = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::Conflict);
                conflicts += 1;
            }
        }
    }
    assert_eq!((admitted, conflicts), (1, 2));
}

#[tokio::test]
async fn login_is_recorded_and_exported() {
    let test = TestApp::new().await;
    let app = &test.app;

    app.staff.login("5", "5678").await.unwrap();
    assert_matches!(
        app.staff.login("5", "0000").await,
        Err(ServiceError::Unauthorized { .. })
    );

    let document = app.export().await.unwrap();
    assert_eq!(document.login_history.len(), 1);
    assert_eq!(document.login_history[0].name, "Lisa Kim");
    assert_eq!(app.metrics.get(names::FAILED_LOGINS), 1);
}
