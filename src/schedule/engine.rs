use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use super::feasibility::can_assign;
use super::lookahead::{score_candidate, CandidateScore, ScoreWeights};
use super::state::{DayInputs, DayState};
use super::types::{
    Assignment, Availability, ClassId, DayGaps, DaySchedule, DutyPlan, ExcludedSessions,
    LockValue, Locks, Options, Period, Roster, SlotAvailability, Staff,
};

/// Assigns cover for every day and period in `availability` using the default score weights
pub fn assign_duties(
    roster: &[Staff],
    availability: &Availability,
    locks: &Locks,
    options: &Options,
    excluded: &ExcludedSessions,
) -> DutyPlan {
    assign_duties_with_weights(roster, availability, locks, options, excluded, &ScoreWeights::default())
}

/// Same as [`assign_duties`] with caller-chosen tie-break weights
pub fn assign_duties_with_weights(
    roster: &[Staff],
    availability: &Availability,
    locks: &Locks,
    options: &Options,
    excluded: &ExcludedSessions,
    weights: &ScoreWeights,
) -> DutyPlan {
    let roster = Roster::new(roster);
    let mut plan = DutyPlan::default();

    for (day, slots) in availability.days() {
        let inputs = DayInputs::new(day, Some(slots), &roster, locks, excluded, options);
        let (schedule, gaps) = assign_day(&inputs, weights);
        if !schedule.is_empty() {
            plan.schedule.insert(day.clone(), schedule);
        }
        if !gaps.is_empty() {
            plan.gaps.insert(day.clone(), gaps);
        }
    }

    info!(
        assignments = plan.assignment_count(),
        gaps = plan.gap_count(),
        "duty assignment finished"
    );
    plan
}

/// Runs the period-by-period rounds for a single day
pub fn assign_day(inputs: &DayInputs<'_>, weights: &ScoreWeights) -> (DaySchedule, DayGaps) {
    let mut state = DayState::new();
    let mut schedule = DaySchedule::new();
    let mut gaps = DayGaps::new();

    for (&period, slot) in inputs.slots {
        let mut pool = inputs.open_pool(period, slot);
        let mut assignments = apply_locks(inputs, period, &mut pool, &mut state);
        warn_on_lock_overflow(inputs, period, &assignments, &state);

        let deferred = single_duty_round(inputs, weights, period, slot, pool, &mut state, &mut assignments);
        let uncovered = capacity_rounds(inputs, period, slot, deferred, &mut state, &mut assignments);

        if !assignments.is_empty() {
            schedule.insert(period, assignments);
        }
        if !uncovered.is_empty() {
            debug!(day = inputs.day, period, uncovered = uncovered.len(), "classes left without cover");
            gaps.insert(period, uncovered.into_iter().collect());
        }
    }

    (schedule, gaps)
}

/// Applies the slot's locks to `pool`.
///
/// `Empty` locks drop their class. Locks naming a roster member take the class
/// out of the pool and are recorded against that member, caps notwithstanding.
/// Locks to unknown staff, or for classes no longer in the pool, are skipped.
pub(crate) fn apply_locks(
    inputs: &DayInputs<'_>,
    period: Period,
    pool: &mut BTreeSet<ClassId>,
    state: &mut DayState,
) -> Vec<Assignment> {
    let mut assignments = Vec::new();
    for (class_id, value) in inputs.locks.for_slot(inputs.day, period) {
        match value {
            LockValue::Empty => {
                pool.remove(class_id);
            }
            LockValue::Assigned(staff_id) => {
                if !inputs.roster.contains(staff_id) || !pool.remove(class_id) {
                    continue;
                }
                state.record(period, staff_id);
                assignments.push(Assignment::new(class_id.as_str(), staff_id.as_str()));
            }
        }
    }
    assignments
}

fn warn_on_lock_overflow(
    inputs: &DayInputs<'_>,
    period: Period,
    locked: &[Assignment],
    state: &DayState,
) {
    for assignment in locked {
        let staff_id = assignment.staff_id.as_str();
        let over_day = inputs
            .roster
            .daily_cap(staff_id)
            .is_some_and(|cap| state.duty_count(staff_id) > cap);
        let over_slot = state.slot_usage(period, staff_id) > inputs.options.slot_capacity();
        if over_day || over_slot {
            warn!(
                day = inputs.day,
                period,
                staff_id,
                class_id = %assignment.class_id,
                "lock exceeds a duty cap; keeping it"
            );
        }
    }
}

/// First pass: each class goes to someone not yet used in this slot.
/// Returns the classes nobody could take.
fn single_duty_round(
    inputs: &DayInputs<'_>,
    weights: &ScoreWeights,
    period: Period,
    slot: &SlotAvailability,
    pool: BTreeSet<ClassId>,
    state: &mut DayState,
    assignments: &mut Vec<Assignment>,
) -> Vec<ClassId> {
    let staff = inputs.staff_by_load(slot, state);
    let mut deferred = Vec::new();

    for class_id in pool {
        let current: &DayState = state;
        let candidates: Vec<&str> = staff
            .iter()
            .copied()
            .filter(|id| current.slot_usage(period, id) == 0)
            .filter(|id| can_assign(current, inputs.roster, inputs.options, period, id))
            .collect();

        let chosen = match candidates.as_slice() {
            [] => None,
            [only] => Some(*only),
            _ => pick_by_lookahead(inputs, current, period, &class_id, &candidates, weights),
        };

        match chosen {
            Some(staff_id) => {
                state.record(period, staff_id);
                assignments.push(Assignment::new(class_id, staff_id));
            }
            None => deferred.push(class_id),
        }
    }

    deferred
}

fn pick_by_lookahead<'s>(
    inputs: &DayInputs<'_>,
    state: &DayState,
    period: Period,
    class_id: &str,
    candidates: &[&'s str],
    weights: &ScoreWeights,
) -> Option<&'s str> {
    let best: CandidateScore = candidates
        .iter()
        .map(|id| score_candidate(inputs, state, period, id, class_id, weights))
        .min()?;
    debug!(
        day = inputs.day,
        period,
        class_id,
        staff_id = %best.staff_id,
        composite = best.composite,
        candidates = candidates.len(),
        "lookahead picked candidate"
    );
    candidates.iter().copied().find(|id| *id == best.staff_id)
}

/// Later passes: fill leftover classes using any remaining slot capacity,
/// re-ranking staff by load each pass until a pass makes no progress.
fn capacity_rounds(
    inputs: &DayInputs<'_>,
    period: Period,
    slot: &SlotAvailability,
    mut deferred: Vec<ClassId>,
    state: &mut DayState,
    assignments: &mut Vec<Assignment>,
) -> Vec<ClassId> {
    let capacity = inputs.options.slot_capacity();
    let mut progressed = true;

    while !deferred.is_empty() && progressed {
        progressed = false;
        let staff = inputs.staff_by_load(slot, state);
        deferred.retain(|class_id| {
            let pick = staff.iter().copied().find(|id| {
                state.slot_usage(period, id) < capacity
                    && can_assign(state, inputs.roster, inputs.options, period, id)
            });
            match pick {
                Some(staff_id) => {
                    state.record(period, staff_id);
                    assignments.push(Assignment::new(class_id.as_str(), staff_id));
                    progressed = true;
                    false
                }
                None => true,
            }
        });
    }

    deferred
}
