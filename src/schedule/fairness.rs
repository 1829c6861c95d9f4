use std::borrow::Cow;

use tracing::{debug, info};

use super::feasibility::can_assign;
use super::state::{DayInputs, DayState};
use super::types::{Assignment, ClassId, DaySchedule, LockValue, Period, StaffId};

/// A single change the rebalancer can make for an idle staff member
#[derive(Debug, Clone, PartialEq, Eq)]
enum FairnessMove {
    /// Cover a class nobody holds yet
    Fill { period: Period, class_id: ClassId },
    /// Take the class at `index` in `period` over from a busier donor
    Swap { period: Period, index: usize, donor: StaffId },
}

/// Gives staff with no duties on the day one duty where a legal move exists.
///
/// Idle staff are handled in roster order. Each first tries to pick up a class
/// still needing cover; failing that, takes over one unlocked class from a
/// donor holding more than one duty. Staff with no legal move stay idle.
///
/// Returns the borrowed `base` when nothing changed.
pub fn apply_fairness_adjustments<'s>(
    inputs: &DayInputs<'_>,
    base: &'s DaySchedule,
) -> Cow<'s, DaySchedule> {
    let mut schedule = Cow::Borrowed(base);
    let mut state = DayState::from_schedule(base);

    for member in inputs.roster.members() {
        let staff_id = member.id.as_str();
        if state.duty_count(staff_id) > 0 || !inputs.available_today(staff_id) {
            continue;
        }

        let eligible = eligible_periods(inputs, &state, staff_id);
        if eligible.is_empty() {
            debug!(day = inputs.day, staff_id, "no eligible period for idle staff");
            continue;
        }

        let Some(found) = find_open_class(inputs, &schedule, &eligible, staff_id)
            .or_else(|| find_swap(inputs, &schedule, &state, &eligible))
        else {
            debug!(day = inputs.day, staff_id, "idle staff left without duty");
            continue;
        };

        match found {
            FairnessMove::Fill { period, class_id } => {
                info!(day = inputs.day, period, staff_id, class_id = %class_id, "fairness fill");
                schedule
                    .to_mut()
                    .entry(period)
                    .or_default()
                    .push(Assignment::new(class_id, staff_id));
                state.record(period, staff_id);
            }
            FairnessMove::Swap { period, index, donor } => {
                let Some(assignment) = schedule
                    .to_mut()
                    .get_mut(&period)
                    .and_then(|slot| slot.get_mut(index))
                else {
                    continue;
                };
                info!(
                    day = inputs.day,
                    period,
                    staff_id,
                    donor = %donor,
                    class_id = %assignment.class_id,
                    "fairness swap"
                );
                assignment.staff_id = staff_id.to_string();
                state.release(period, &donor);
                state.record(period, staff_id);
            }
        }
    }

    schedule
}

/// Periods where the staff member is free and every cap and rule allows one more class
fn eligible_periods(inputs: &DayInputs<'_>, state: &DayState, staff_id: &str) -> Vec<Period> {
    inputs
        .slots
        .iter()
        .filter(|(_, slot)| slot.staff.contains(staff_id))
        .map(|(&period, _)| period)
        .filter(|&period| can_assign(state, inputs.roster, inputs.options, period, staff_id))
        .collect()
}

/// The lock on a class, unless it names someone no longer on the roster
fn live_lock<'i>(inputs: &DayInputs<'i>, period: Period, class_id: &str) -> Option<&'i LockValue> {
    inputs
        .locks
        .get(inputs.day, period, class_id)
        .filter(|value| match value {
            LockValue::Assigned(owner) => inputs.roster.contains(owner),
            LockValue::Empty => true,
        })
}

fn find_open_class(
    inputs: &DayInputs<'_>,
    schedule: &DaySchedule,
    eligible: &[Period],
    staff_id: &str,
) -> Option<FairnessMove> {
    for &period in eligible {
        let Some(slot) = inputs.slots.get(&period) else {
            continue;
        };
        let covered = schedule.get(&period);
        let open = slot.classes.iter().find(|class_id| {
            let already_covered = covered
                .is_some_and(|assignments| assignments.iter().any(|a| &a.class_id == *class_id));
            let locked_elsewhere = match live_lock(inputs, period, class_id) {
                Some(LockValue::Assigned(owner)) => owner != staff_id,
                Some(LockValue::Empty) => true,
                None => false,
            };
            !already_covered
                && !locked_elsewhere
                && !inputs.excluded.contains(inputs.day, period, class_id)
        });
        if let Some(class_id) = open {
            return Some(FairnessMove::Fill {
                period,
                class_id: class_id.clone(),
            });
        }
    }
    None
}

fn find_swap(
    inputs: &DayInputs<'_>,
    schedule: &DaySchedule,
    state: &DayState,
    eligible: &[Period],
) -> Option<FairnessMove> {
    for &period in eligible {
        let Some(assignments) = schedule.get(&period) else {
            continue;
        };
        for (index, assignment) in assignments.iter().enumerate() {
            if live_lock(inputs, period, &assignment.class_id).is_some() {
                continue;
            }
            if state.duty_count(&assignment.staff_id) > 1 {
                return Some(FairnessMove::Swap {
                    period,
                    index,
                    donor: assignment.staff_id.clone(),
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::types::{Availability, ExcludedSessions, Locks, Options, Roster, Staff};

    struct Fixture {
        staff: Vec<Staff>,
        availability: Availability,
        locks: Locks,
        excluded: ExcludedSessions,
        options: Options,
    }

    impl Fixture {
        fn new(staff: Vec<Staff>) -> Self {
            Self {
                staff,
                availability: Availability::new(),
                locks: Locks::new(),
                excluded: ExcludedSessions::new(),
                options: Options::default(),
            }
        }

        fn rebalance<'s>(&self, base: &'s DaySchedule) -> Cow<'s, DaySchedule> {
            let roster = Roster::new(&self.staff);
            let inputs = DayInputs::new(
                "Mon",
                self.availability.day("Mon"),
                &roster,
                &self.locks,
                &self.excluded,
                &self.options,
            );
            apply_fairness_adjustments(&inputs, base)
        }
    }

    #[test]
    fn unchanged_schedule_is_borrowed() {
        let mut fixture = Fixture::new(vec![Staff::new("a")]);
        fixture.availability.add_staff("Mon", 1, "a");
        fixture.availability.add_class("Mon", 1, "x");
        let mut base = DaySchedule::new();
        base.insert(1, vec![Assignment::new("x", "a")]);

        let result = fixture.rebalance(&base);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert!(std::ptr::eq(&*result, &base));
    }

    #[test]
    fn idle_staff_fills_an_open_class() {
        let mut fixture = Fixture::new(vec![Staff::new("a"), Staff::new("b")]);
        fixture.availability.add_staff("Mon", 2, "b");
        fixture.availability.add_class("Mon", 2, "y");
        fixture.availability.add_staff("Mon", 1, "a");
        fixture.availability.add_class("Mon", 1, "x");
        let mut base = DaySchedule::new();
        base.insert(1, vec![Assignment::new("x", "a")]);

        let result = fixture.rebalance(&base);
        assert!(matches!(result, Cow::Owned(_)));
        assert_eq!(result.get(&2), Some(&vec![Assignment::new("y", "b")]));
    }

    #[test]
    fn fill_skips_locked_and_excluded_classes() {
        let mut fixture = Fixture::new(vec![Staff::new("a"), Staff::new("b")]);
        fixture.availability.add_staff("Mon", 1, "b");
        fixture.availability.add_class("Mon", 1, "locked");
        fixture.availability.add_class("Mon", 1, "outside");
        fixture.availability.add_class("Mon", 1, "empty");
        fixture
            .locks
            .insert("Mon", 1, "locked", LockValue::Assigned("a".to_string()));
        fixture.locks.insert("Mon", 1, "empty", LockValue::Empty);
        fixture.excluded.insert("Mon", 1, "outside");

        let base = DaySchedule::new();
        let result = fixture.rebalance(&base);
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn idle_staff_takes_over_from_busy_donor() {
        let mut fixture = Fixture::new(vec![Staff::new("a"), Staff::new("b")]);
        for period in [1, 3] {
            fixture.availability.add_staff("Mon", period, "a");
            fixture.availability.add_class("Mon", period, format!("c{period}"));
        }
        fixture.availability.add_staff("Mon", 3, "b");
        let mut base = DaySchedule::new();
        base.insert(1, vec![Assignment::new("c1", "a")]);
        base.insert(3, vec![Assignment::new("c3", "a")]);

        let result = fixture.rebalance(&base);
        assert_eq!(result.get(&3), Some(&vec![Assignment::new("c3", "b")]));
        assert_eq!(result.get(&1), Some(&vec![Assignment::new("c1", "a")]));
    }

    #[test]
    fn locked_assignments_are_never_swapped() {
        let mut fixture = Fixture::new(vec![Staff::new("a"), Staff::new("b")]);
        for period in [1, 3] {
            fixture.availability.add_staff("Mon", period, "a");
            fixture.availability.add_class("Mon", period, format!("c{period}"));
        }
        fixture.availability.add_staff("Mon", 3, "b");
        fixture
            .locks
            .insert("Mon", 3, "c3", LockValue::Assigned("a".to_string()));
        let mut base = DaySchedule::new();
        base.insert(1, vec![Assignment::new("c1", "a")]);
        base.insert(3, vec![Assignment::new("c3", "a")]);

        let result = fixture.rebalance(&base);
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn off_roster_lock_does_not_block_a_fill() {
        let mut fixture = Fixture::new(vec![Staff::new("b")]);
        fixture.availability.add_staff("Mon", 1, "b");
        fixture.availability.add_class("Mon", 1, "x");
        fixture
            .locks
            .insert("Mon", 1, "x", LockValue::Assigned("ghost".to_string()));

        let base = DaySchedule::new();
        let result = fixture.rebalance(&base);
        assert_eq!(result.get(&1), Some(&vec![Assignment::new("x", "b")]));
    }

    #[test]
    fn off_roster_lock_does_not_block_a_swap() {
        let mut fixture = Fixture::new(vec![Staff::new("a"), Staff::new("b")]);
        for period in [1, 3] {
            fixture.availability.add_staff("Mon", period, "a");
            fixture.availability.add_class("Mon", period, format!("c{period}"));
        }
        fixture.availability.add_staff("Mon", 3, "b");
        fixture
            .locks
            .insert("Mon", 3, "c3", LockValue::Assigned("ghost".to_string()));
        let mut base = DaySchedule::new();
        base.insert(1, vec![Assignment::new("c1", "a")]);
        base.insert(3, vec![Assignment::new("c3", "a")]);

        let result = fixture.rebalance(&base);
        assert!(matches!(result, Cow::Owned(_)));
        assert_eq!(result.get(&3), Some(&vec![Assignment::new("c3", "b")]));
    }

    #[test]
    fn donor_with_single_duty_keeps_it() {
        let mut fixture = Fixture::new(vec![Staff::new("a"), Staff::new("b")]);
        fixture.availability.add_staff("Mon", 1, "a");
        fixture.availability.add_staff("Mon", 1, "b");
        fixture.availability.add_class("Mon", 1, "x");
        let mut base = DaySchedule::new();
        base.insert(1, vec![Assignment::new("x", "a")]);

        let result = fixture.rebalance(&base);
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn zero_cap_staff_stay_idle() {
        let mut fixture = Fixture::new(vec![Staff::new("a").with_max_duties(0)]);
        fixture.availability.add_staff("Mon", 1, "a");
        fixture.availability.add_class("Mon", 1, "x");
        let base = DaySchedule::new();
        assert!(matches!(fixture.rebalance(&base), Cow::Borrowed(_)));
    }
}
