//! Property-based tests for the housekeeping invariants.
//!
//! Stock arithmetic, checklist toggling, cleaning estimates and the room
//! transition table are exercised across generated inputs.

use housekeeping_core::{
    models::{Checklist, Moment, RoomStatus, StockStatus, Supply, Usage},
    seed,
    services::assignments::estimate_minutes,
};
use proptest::prelude::*;
use proptest::sample::select;
use rust_decimal::Decimal;
use strum::IntoEnumIterator;

fn supply_strategy() -> impl Strategy<Value = Supply> {
    (1u32..2_000)
        .prop_flat_map(|max| (Just(max), 0..=max, 0..=max))
        .prop_map(|(max_capacity, current_stock, min_threshold)| Supply {
            id: "1".into(),
            name: "Towels".into(),
            category: "Linens".into(),
            current_stock,
            min_threshold,
            max_capacity,
            unit: "pieces".into(),
            cost_per_unit: Decimal::new(850, 2),
            last_restocked: Moment::Label("2 days ago".into()),
            usage: Usage::default(),
        })
}

fn task_strategy() -> impl Strategy<Value = (String, String)> {
    let pairs: Vec<(String, String)> = Checklist::template("101")
        .areas
        .iter()
        .flat_map(|a| a.tasks.iter().map(move |t| (a.id.clone(), t.id.clone())))
        .collect();
    select(pairs)
}

fn room_status_strategy() -> impl Strategy<Value = RoomStatus> {
    select(RoomStatus::iter().collect::<Vec<_>>())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn stock_adjustments_stay_within_capacity(
        supply in supply_strategy(),
        delta in -5_000i64..5_000,
    ) {
        let mut adjusted = supply.clone();
        let applied = adjusted.apply_delta(delta);

        prop_assert!(adjusted.current_stock <= adjusted.max_capacity);
        prop_assert_eq!(
            i64::from(adjusted.current_stock) - i64::from(supply.current_stock),
            applied
        );
        prop_assert!(applied.abs() <= delta.abs());
        if applied != delta {
            prop_assert!(adjusted.current_stock == 0 || adjusted.current_stock == adjusted.max_capacity);
        }
    }

    #[test]
    fn critical_exactly_at_or_below_threshold(supply in supply_strategy()) {
        let critical = supply.status() == StockStatus::Critical;
        prop_assert_eq!(critical, supply.current_stock <= supply.min_threshold);
    }

    #[test]
    fn estimates_never_fall_below_five_minutes(
        base in 0u32..600,
        room_type in select(vec!["Standard", "Deluxe", "Suite", "Penthouse"]),
        member in select(seed::staff()),
    ) {
        prop_assert!(estimate_minutes(base, room_type, &member) >= 5);
    }

    #[test]
    fn suites_never_estimate_shorter_than_standard_rooms(
        base in 5u32..600,
        member in select(seed::staff()),
    ) {
        prop_assert!(
            estimate_minutes(base, "Suite", &member) >= estimate_minutes(base, "Standard", &member)
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn toggling_twice_restores_the_checklist(
        prior in prop::collection::vec(task_strategy(), 0..20),
        (area, task) in task_strategy(),
    ) {
        let mut checklist = Checklist::template("202");
        for (a, t) in &prior {
            checklist.toggle(a, t).unwrap();
        }
        let before = checklist.clone();

        checklist.toggle(&area, &task).unwrap();
        prop_assert_ne!(&checklist, &before);
        checklist.toggle(&area, &task).unwrap();
        prop_assert_eq!(checklist, before);
    }

    #[test]
    fn progress_only_rises_while_completing_tasks(
        order in Just(Checklist::template("303")).prop_flat_map(|c| {
            let ids: Vec<(String, String)> = c
                .areas
                .iter()
                .flat_map(|a| a.tasks.iter().map(move |t| (a.id.clone(), t.id.clone())))
                .collect();
            Just(ids).prop_shuffle()
        }),
    ) {
        let mut checklist = Checklist::template("303");
        let mut last = checklist.progress();
        prop_assert_eq!(last, 0.0);

        for (area, task) in &order {
            prop_assert!(!checklist.can_finalize());
            checklist.toggle(area, task).unwrap();
            let progress = checklist.progress();
            prop_assert!(progress > last && progress <= 100.0);
            last = progress;
        }
        prop_assert_eq!(last, 100.0);
        prop_assert!(checklist.can_finalize());
    }

    #[test]
    fn rejected_transitions_leave_the_room_untouched(
        from in room_status_strategy(),
        to in room_status_strategy(),
    ) {
        let mut room = seed::rooms().remove(0).with_status(from);
        match room.transition_to(to) {
            Ok(changed) => {
                prop_assert_eq!(room.status, to);
                prop_assert_eq!(changed, from != to);
            }
            Err(_) => {
                prop_assert!(!from.can_transition_to(to));
                prop_assert_eq!(room.status, from);
            }
        }
    }
}
