use std::cmp::Ordering;
use std::ops::Bound;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::engine::apply_locks;
use super::feasibility::can_assign;
use super::state::{DayInputs, DayState};
use super::types::{Period, StaffId};

/// Hand-tuned weights of the composite tie-break score; override per run if needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Per class the continuation leaves uncovered
    pub unfilled: u64,
    /// Per unit of max - min daily duties
    pub spread: u64,
    /// Flat cost when the candidate worked the adjacent period
    pub consecutive: u64,
    /// Per duty the candidate already holds
    pub duty: u64,
}

impl ScoreWeights {
    pub const DEFAULT: Self = Self {
        unfilled: 200,
        spread: 50,
        consecutive: 50,
        duty: 5,
    };
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What the greedy continuation left behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationOutcome {
    pub remaining_unfilled: u32,
    pub duty_spread: u32,
}

/// Ranking of one candidate; lower is better
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateScore {
    pub staff_id: StaffId,
    pub composite: u64,
    pub remaining_unfilled: u32,
    pub duty_spread: u32,
    pub current_duty: u32,
    pub consecutive_penalty: u64,
}

impl Ord for CandidateScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.composite
            .cmp(&other.composite)
            .then(self.remaining_unfilled.cmp(&other.remaining_unfilled))
            .then(self.duty_spread.cmp(&other.duty_spread))
            .then(self.current_duty.cmp(&other.current_duty))
            .then(self.consecutive_penalty.cmp(&other.consecutive_penalty))
            .then_with(|| self.staff_id.cmp(&other.staff_id))
    }
}

impl PartialOrd for CandidateScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Plays the rest of the day forward after giving `class_id` to `staff_id` in `start_period`.
///
/// Works on a copy of the counters. Every later period gets its locks applied
/// and then a single first-fit pass over staff ordered by duty count; there is
/// no nested scoring, so this is an estimate and nothing more.
pub fn simulate_assignment(
    inputs: &DayInputs<'_>,
    state: &DayState,
    start_period: Period,
    staff_id: &str,
    class_id: &str,
) -> SimulationOutcome {
    let mut sim = state.clone();
    sim.record(start_period, staff_id);

    let mut remaining_unfilled = 0u32;
    let later = inputs
        .slots
        .range((Bound::Excluded(start_period), Bound::Unbounded));
    for (&period, slot) in later {
        let mut pool = inputs.open_pool(period, slot);
        apply_locks(inputs, period, &mut pool, &mut sim);

        let staff = inputs.staff_by_load(slot, &sim);
        for _class in &pool {
            let pick = staff
                .iter()
                .copied()
                .find(|id| can_assign(&sim, inputs.roster, inputs.options, period, id));
            match pick {
                Some(id) => sim.record(period, id),
                None => remaining_unfilled += 1,
            }
        }
    }

    let outcome = SimulationOutcome {
        remaining_unfilled,
        duty_spread: sim.duty_spread(),
    };
    trace!(
        day = inputs.day,
        period = start_period,
        staff_id,
        class_id,
        remaining_unfilled = outcome.remaining_unfilled,
        duty_spread = outcome.duty_spread,
        "lookahead finished"
    );
    outcome
}

/// Scores handing `class_id` to `staff_id`; see [`ScoreWeights`] for the terms
pub fn score_candidate(
    inputs: &DayInputs<'_>,
    state: &DayState,
    start_period: Period,
    staff_id: &str,
    class_id: &str,
    weights: &ScoreWeights,
) -> CandidateScore {
    let outcome = simulate_assignment(inputs, state, start_period, staff_id, class_id);
    let current_duty = state.duty_count(staff_id);
    let consecutive_penalty = match state.last_assigned_period(staff_id) {
        Some(last) if (i64::from(last) - i64::from(start_period)).abs() == 1 => weights.consecutive,
        _ => 0,
    };

    let composite = u64::from(outcome.remaining_unfilled)
        .saturating_mul(weights.unfilled)
        .saturating_add(u64::from(outcome.duty_spread).saturating_mul(weights.spread))
        .saturating_add(consecutive_penalty)
        .saturating_add(u64::from(current_duty).saturating_mul(weights.duty));

    CandidateScore {
        staff_id: staff_id.to_string(),
        composite,
        remaining_unfilled: outcome.remaining_unfilled,
        duty_spread: outcome.duty_spread,
        current_duty,
        consecutive_penalty,
    }
}
