use std::collections::BTreeMap;

use duty_cover::demo::{generate_demo_input, DemoParameters};
use duty_cover::schedule::{
    can_assign, plan_coverage, plan_coverage_with, Availability, CoverageInput, DaySchedule, DayState, DutyPlan,
    ExcludedSessions, LockValue, Locks, Options, PlanSettings, Roster, Staff,
};

fn options(max_per_slot: u32, prevent_consecutive: bool) -> Options {
    Options {
        prevent_consecutive,
        max_per_slot,
        ignore_consecutive_limit: false,
    }
}

fn duty_counts(plan: &DutyPlan, day: &str) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for slot in plan.day_schedule(day).into_iter().flat_map(|s| s.values()) {
        for assignment in slot {
            *counts.entry(assignment.staff_id.clone()).or_insert(0) += 1;
        }
    }
    counts
}

fn demo_input(seed: u64) -> CoverageInput {
    generate_demo_input(seed, &DemoParameters::default())
}

#[test]
fn two_classes_go_to_two_staff() {
    let input = CoverageInput {
        roster: vec![Staff::new("A").with_max_duties(1), Staff::new("B").with_max_duties(2)],
        availability: {
            let mut availability = Availability::new();
            availability.add_staff("Mon", 1, "A");
            availability.add_staff("Mon", 1, "B");
            availability.add_class("Mon", 1, "X");
            availability.add_class("Mon", 1, "Y");
            availability
        },
        ..CoverageInput::default()
    };

    let plan = plan_coverage(&input, &options(1, false));
    let counts = duty_counts(&plan, "Mon");
    assert_eq!(counts.get("A"), Some(&1));
    assert_eq!(counts.get("B"), Some(&1));
    assert_eq!(plan.gap_count(), 0);
}

#[test]
fn one_class_uses_one_of_three_staff() {
    let mut availability = Availability::new();
    for id in ["A", "B", "C"] {
        availability.add_staff("Mon", 1, id);
    }
    availability.add_class("Mon", 1, "X");
    let input = CoverageInput {
        roster: vec![Staff::new("A"), Staff::new("B"), Staff::new("C")],
        availability,
        ..CoverageInput::default()
    };

    let plan = plan_coverage(&input, &options(1, false));
    assert_eq!(plan.assignment_count(), 1);
    assert!(plan.gaps.is_empty());
}

#[test]
fn empty_lock_keeps_class_out_of_the_output() {
    let mut availability = Availability::new();
    availability.add_staff("Mon", 3, "A");
    availability.add_staff("Mon", 3, "B");
    availability.add_class("Mon", 3, "class-7");
    availability.add_class("Mon", 3, "class-8");
    let mut locks = Locks::new();
    locks.insert("Mon", 3, "class-7", LockValue::Empty);
    let input = CoverageInput {
        roster: vec![Staff::new("A"), Staff::new("B")],
        availability,
        locks,
        excluded: ExcludedSessions::new(),
    };

    let plan = plan_coverage(&input, &options(1, false));
    let period = plan.day_schedule("Mon").and_then(|s| s.get(&3)).expect("period 3 covered");
    assert!(period.iter().all(|a| a.class_id != "class-7"));
    assert!(plan
        .day_gaps("Mon")
        .and_then(|g| g.get(&3))
        .map_or(true, |classes| !classes.contains("class-7")));
}

#[test]
fn locked_covers_are_never_handed_to_idle_staff() {
    let mut availability = Availability::new();
    availability.add_staff("Mon", 1, "A");
    availability.add_class("Mon", 1, "X");
    availability.add_staff("Mon", 2, "A");
    availability.add_staff("Mon", 2, "B");
    availability.add_class("Mon", 2, "Y");
    let mut locks = Locks::new();
    locks.insert("Mon", 2, "Y", LockValue::Assigned("A".to_string()));
    let input = CoverageInput {
        roster: vec![Staff::new("A"), Staff::new("B")],
        availability,
        locks,
        excluded: ExcludedSessions::new(),
    };

    // Y is locked to A, so B has no legal move and stays idle
    let plan = plan_coverage(&input, &options(1, false));
    assert_eq!(duty_counts(&plan, "Mon").get("B"), None);

    let mut unlocked = input.clone();
    unlocked.locks = Locks::new();
    let plan = plan_coverage(&unlocked, &options(1, false));
    assert_eq!(duty_counts(&plan, "Mon").get("B"), Some(&1));
}

#[test]
fn caps_and_consecutive_rule_hold_on_generated_days() {
    let rules = options(2, true);
    for seed in 0..20 {
        let mut input = demo_input(seed);
        input.locks = Locks::new();
        let plan = plan_coverage(&input, &rules);

        for (day, schedule) in &plan.schedule {
            let mut periods_by_staff: BTreeMap<&str, Vec<i32>> = BTreeMap::new();
            for (&period, slot) in schedule {
                let mut per_staff: BTreeMap<&str, u32> = BTreeMap::new();
                for assignment in slot {
                    *per_staff.entry(assignment.staff_id.as_str()).or_insert(0) += 1;
                }
                for (staff_id, used) in per_staff {
                    assert!(used <= rules.max_per_slot, "seed {seed}: {staff_id} over slot cap on {day} P{period}");
                    periods_by_staff.entry(staff_id).or_default().push(period);
                }
            }

            let counts = duty_counts(&plan, day);
            for member in &input.roster {
                let duties = counts.get(&member.id).copied().unwrap_or(0);
                assert!(duties <= member.daily_cap(), "seed {seed}: {} over daily cap on {day}", member.id);
            }
            for (staff_id, periods) in periods_by_staff {
                assert!(
                    periods.windows(2).all(|pair| pair[1] - pair[0] != 1),
                    "seed {seed}: {staff_id} covers adjacent periods on {day}: {periods:?}"
                );
            }
        }
    }
}

#[test]
fn locks_and_exclusions_are_honoured_on_generated_days() {
    for seed in 0..20 {
        let input = demo_input(seed);
        let plan = plan_coverage(&input, &options(1, false));

        for (day, slots) in input.availability.days() {
            for (&period, slot) in slots {
                let covered = plan.day_schedule(day).and_then(|s| s.get(&period));
                let gaps = plan.day_gaps(day).and_then(|g| g.get(&period));
                for class_id in &slot.classes {
                    let in_schedule = covered.is_some_and(|s| s.iter().any(|a| &a.class_id == class_id));
                    let in_gaps = gaps.is_some_and(|g| g.contains(class_id));

                    if input.excluded.contains(day, period, class_id) {
                        assert!(!in_schedule && !in_gaps, "seed {seed}: excluded {class_id} planned");
                        continue;
                    }
                    match input.locks.get(day, period, class_id) {
                        Some(LockValue::Empty) => {
                            assert!(!in_schedule && !in_gaps, "seed {seed}: empty-locked {class_id} planned")
                        }
                        Some(LockValue::Assigned(staff_id)) => {
                            let held = covered.is_some_and(|s| {
                                s.iter().any(|a| &a.class_id == class_id && &a.staff_id == staff_id)
                            });
                            assert!(held, "seed {seed}: lock {day} P{period} {class_id} -> {staff_id} missing");
                        }
                        None => assert!(in_schedule ^ in_gaps, "seed {seed}: {class_id} lost on {day} P{period}"),
                    }
                }
            }
        }
    }
}

#[test]
fn identical_input_gives_identical_plans() {
    let input = demo_input(99);
    let settings = PlanSettings::default();
    let rules = options(2, true);
    let first = serde_json::to_string(&plan_coverage_with(&input, &rules, &settings)).unwrap();
    let second = serde_json::to_string(&plan_coverage_with(&input, &rules, &settings)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn fairness_never_loses_coverage() {
    for seed in 0..10 {
        let input = demo_input(seed);
        let rules = options(1, true);
        let base = plan_coverage_with(&input, &rules, &PlanSettings { fairness: false, ..PlanSettings::default() });
        let balanced = plan_coverage(&input, &rules);
        assert!(balanced.assignment_count() >= base.assignment_count(), "seed {seed}");
        assert!(balanced.gap_count() <= base.gap_count(), "seed {seed}");

        for day in balanced.schedule.keys() {
            let idle_before = input
                .roster
                .iter()
                .filter(|m| !duty_counts(&base, day).contains_key(&m.id))
                .count();
            let idle_after = input
                .roster
                .iter()
                .filter(|m| !duty_counts(&balanced, day).contains_key(&m.id))
                .count();
            assert!(idle_after <= idle_before, "seed {seed}: more idle staff on {day}");
        }
    }
}

#[test]
fn idle_staff_gain_a_duty_from_a_busy_colleague() {
    // the spread term makes the engine pile period 4 onto a, leaving b idle
    let mut availability = Availability::new();
    for period in 1..=4 {
        availability.add_staff("Mon", period, "a");
        availability.add_class("Mon", period, format!("c{period}"));
    }
    availability.add_staff("Mon", 4, "b");
    let input = CoverageInput {
        roster: vec![Staff::new("a"), Staff::new("b")],
        availability,
        ..CoverageInput::default()
    };
    let rules = options(1, false);

    let base = plan_coverage_with(&input, &rules, &PlanSettings { fairness: false, ..PlanSettings::default() });
    assert_eq!(duty_counts(&base, "Mon").get("b"), None);

    let plan = plan_coverage(&input, &rules);
    let counts = duty_counts(&plan, "Mon");
    assert_eq!(counts.get("b"), Some(&1));
    assert_eq!(counts.get("a"), Some(&3));
    assert_eq!(plan.assignment_count(), 4);
}

#[test]
fn idle_staff_are_left_without_any_legal_move() {
    for seed in 0..10 {
        let input = demo_input(seed);
        let rules = options(1, true);
        let plan = plan_coverage(&input, &rules);
        let roster = Roster::new(&input.roster);

        for (day, slots) in input.availability.days() {
            let empty = DaySchedule::new();
            let schedule = plan.day_schedule(day).unwrap_or(&empty);
            let state = DayState::from_schedule(schedule);

            for member in &input.roster {
                let staff_id = member.id.as_str();
                if state.duty_count(staff_id) > 0 {
                    continue;
                }
                for (&period, slot) in slots {
                    if !slot.staff.contains(staff_id) || !can_assign(&state, &roster, &rules, period, staff_id) {
                        continue;
                    }
                    let covered = schedule.get(&period);
                    let open = slot.classes.iter().any(|class_id| {
                        input.locks.get(day, period, class_id).is_none()
                            && !input.excluded.contains(day, period, class_id)
                            && !covered.is_some_and(|s| s.iter().any(|a| &a.class_id == class_id))
                    });
                    assert!(!open, "seed {seed}: {staff_id} idle on {day} beside an open class in P{period}");

                    let donor = covered.is_some_and(|s| {
                        s.iter().any(|a| {
                            input.locks.get(day, period, &a.class_id).is_none() && state.duty_count(&a.staff_id) > 1
                        })
                    });
                    assert!(!donor, "seed {seed}: {staff_id} idle on {day} beside a swappable duty in P{period}");
                }
            }
        }
    }
}
