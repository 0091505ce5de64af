use std::collections::HashSet;

use super::common::*;
use crate::workflows::allocation::domain::{FacultyId, SlotKey};
use crate::workflows::allocation::planner::{AllocationPlan, AllocationPlanner, FacultyPriorities};

fn plan(roster: Vec<FacultyPriorities>) -> AllocationPlan {
    AllocationPlanner::new().plan(YEAR, roster)
}

fn awarded(plan: &AllocationPlan, faculty: u32) -> Option<(u32, u32, u8)> {
    plan.allocation_for(FacultyId(faculty)).map(|allocation| {
        (
            allocation.subject_id.0,
            allocation.batch_id.0,
            allocation.allocated_level.get(),
        )
    })
}

/// Twelve faculty with overlapping lists over a handful of slots.
fn crowded_roster() -> Vec<FacultyPriorities> {
    (1..=12u32)
        .map(|faculty| {
            let joining_year = 2005 + (faculty as i32 * 7) % 13;
            let start = faculty % 4;
            let choices: Vec<(u32, u32)> = (0..5)
                .map(|offset| (10 + (start + offset) % 6, 1 + (faculty + offset) % 2))
                .collect();
            ranked(faculty, joining_year, &choices)
        })
        .collect()
}

#[test]
fn senior_faculty_wins_contested_first_choice() {
    let plan = plan(vec![
        ranked(2, 2020, &[(10, 1), (12, 1)]),
        ranked(1, 2015, &[(10, 1), (11, 1)]),
    ]);

    assert_eq!(awarded(&plan, 1), Some((10, 1, 1)));
    assert_eq!(awarded(&plan, 2), Some((12, 1, 2)));
    assert_eq!(plan.contests.len(), 1);
    assert_eq!(plan.contests[0].winner, FacultyId(1));
    assert_eq!(plan.contests[0].displaced, vec![FacultyId(2)]);
    assert!(plan.unallocated.is_empty());
}

#[test]
fn displaced_faculty_falls_back_to_next_free_choice() {
    let plan = plan(vec![
        ranked(7, 2010, &[(5, 1)]),
        ranked(8, 2019, &[(5, 1), (6, 1)]),
    ]);

    assert_eq!(awarded(&plan, 7), Some((5, 1, 1)));
    assert_eq!(awarded(&plan, 8), Some((6, 1, 2)));
}

#[test]
fn faculty_with_every_choice_taken_is_left_unallocated() {
    let slots = [(10, 1), (11, 1), (12, 1), (13, 1), (14, 1)];
    let mut roster: Vec<FacultyPriorities> = slots
        .iter()
        .zip(1u32..)
        .map(|(&slot, faculty)| ranked(faculty, 2000 + faculty as i32, &[slot]))
        .collect();
    roster.push(ranked(9, 2023, &slots));

    let plan = plan(roster);

    assert_eq!(plan.allocations.len(), 5);
    assert_eq!(awarded(&plan, 9), None);
    assert_eq!(plan.unallocated, vec![FacultyId(9)]);
}

#[test]
fn empty_roster_plans_nothing() {
    let plan = plan(Vec::new());

    assert!(plan.allocations.is_empty());
    assert!(plan.contests.is_empty());
    assert!(plan.unallocated.is_empty());
}

#[test]
fn equal_seniority_goes_to_lower_faculty_id() {
    let plan = plan(vec![
        ranked(5, 2018, &[(10, 2), (11, 2)]),
        ranked(4, 2018, &[(10, 2), (12, 2)]),
    ]);

    assert_eq!(awarded(&plan, 4), Some((10, 2, 1)));
    assert_eq!(awarded(&plan, 5), Some((11, 2, 2)));
}

#[test]
fn first_choices_settle_before_any_fallback() {
    // 2 is more senior than 3 but loses (10, 1) to 1; 3's uncontested first choice still
    // beats 2's fallback onto the same slot.
    let plan = plan(vec![
        ranked(1, 2010, &[(10, 1)]),
        ranked(2, 2012, &[(10, 1), (11, 1)]),
        ranked(3, 2020, &[(11, 1)]),
    ]);

    assert_eq!(awarded(&plan, 1), Some((10, 1, 1)));
    assert_eq!(awarded(&plan, 3), Some((11, 1, 1)));
    assert_eq!(plan.unallocated, vec![FacultyId(2)]);
}

#[test]
fn fallback_serves_displaced_faculty_in_seniority_order() {
    let plan = plan(vec![
        ranked(1, 2010, &[(10, 1)]),
        ranked(3, 2016, &[(10, 1), (12, 1)]),
        ranked(2, 2013, &[(10, 1), (12, 1), (13, 1)]),
    ]);

    assert_eq!(awarded(&plan, 2), Some((12, 1, 2)));
    assert_eq!(awarded(&plan, 3), None);
    assert_eq!(plan.contests[0].displaced, vec![FacultyId(2), FacultyId(3)]);
}

#[test]
fn only_one_level_one_entry_competes_per_faculty() {
    let mut doubled = ranked(1, 2010, &[(10, 1)]);
    doubled.entries.push(entry(1, 11, 1, 1));

    let plan = plan(vec![doubled, ranked(2, 2015, &[(11, 1)])]);

    assert_eq!(awarded(&plan, 1), Some((10, 1, 1)));
    assert_eq!(awarded(&plan, 2), Some((11, 1, 1)));
    assert!(plan.contests.is_empty());
}

#[test]
fn no_slot_is_awarded_twice() {
    let plan = plan(crowded_roster());

    let mut slots = HashSet::new();
    for allocation in &plan.allocations {
        assert!(
            slots.insert(SlotKey::new(allocation.subject_id, allocation.batch_id)),
            "slot awarded twice: {allocation:?}"
        );
    }
}

#[test]
fn each_faculty_member_receives_at_most_one_allocation() {
    let plan = plan(crowded_roster());

    let mut faculty = HashSet::new();
    for allocation in &plan.allocations {
        assert!(faculty.insert(allocation.faculty_id));
    }
    for unallocated in &plan.unallocated {
        assert!(!faculty.contains(unallocated));
    }
    assert_eq!(faculty.len() + plan.unallocated.len(), 12);
}

#[test]
fn allocated_level_matches_the_ranked_entry() {
    let roster = crowded_roster();
    let plan = plan(roster.clone());

    for allocation in &plan.allocations {
        let ranked = roster
            .iter()
            .find(|faculty| faculty.member.faculty_id == allocation.faculty_id)
            .expect("allocated faculty is on the roster");
        let entry = ranked
            .entries
            .iter()
            .find(|entry| entry.slot() == allocation.slot())
            .expect("allocation comes from the faculty member's own list");
        assert_eq!(entry.level, allocation.allocated_level);
    }
}

#[test]
fn plan_does_not_depend_on_input_order() {
    let forward = plan(crowded_roster());

    let mut reversed_roster = crowded_roster();
    reversed_roster.reverse();
    let reversed = plan(reversed_roster);

    assert_eq!(forward, reversed);
    assert_eq!(forward, plan(crowded_roster()));
}

#[test]
fn unallocated_senior_never_loses_a_slot_to_a_junior_fallback() {
    let plan = plan(crowded_roster());
    let roster = crowded_roster();

    for faculty in &roster {
        if plan.allocation_for(faculty.member.faculty_id).is_some() {
            continue;
        }
        for entry in &faculty.entries {
            let holder = plan
                .allocations
                .iter()
                .find(|allocation| allocation.slot() == entry.slot())
                .expect("every slot of an unallocated faculty member is taken");
            if holder.allocated_level.is_first() {
                continue;
            }
            let holder_member = roster
                .iter()
                .find(|other| other.member.faculty_id == holder.faculty_id)
                .expect("holder on roster")
                .member;
            assert!(holder_member.order_key() < faculty.member.order_key());
        }
    }
}

#[test]
fn faculty_listed_twice_is_planned_once_from_the_senior_row() {
    let plan = plan(vec![
        ranked(2, 2000, &[(10, 1)]),
        ranked(1, 2010, &[(10, 1), (11, 1), (12, 1)]),
        ranked(3, 2015, &[(13, 1)]),
        ranked(1, 2020, &[(10, 1), (11, 1), (12, 1)]),
    ]);

    let for_faculty_one: Vec<_> = plan
        .allocations
        .iter()
        .filter(|allocation| allocation.faculty_id == FacultyId(1))
        .collect();
    assert_eq!(for_faculty_one.len(), 1);
    assert_eq!(awarded(&plan, 1), Some((11, 1, 2)));
    assert_eq!(plan.allocations.len(), 3);
    assert!(plan.unallocated.is_empty());
}

#[test]
fn duplicated_loser_is_reported_unallocated_once() {
    let plan = plan(vec![
        ranked(2, 2000, &[(10, 1)]),
        ranked(1, 2010, &[(10, 1)]),
        ranked(1, 2020, &[(10, 1)]),
    ]);

    assert_eq!(plan.allocations.len(), 1);
    assert_eq!(plan.unallocated, vec![FacultyId(1)]);
}
