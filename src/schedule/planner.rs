use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::engine::assign_duties_with_weights;
use super::fairness::apply_fairness_adjustments;
use super::lookahead::ScoreWeights;
use super::state::DayInputs;
use super::types::{CoverageInput, DayGaps, DaySchedule, DutyPlan, Options, Roster};

/// Knobs for a full planning run beyond the engine [`Options`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSettings {
    /// Run the fairness rebalancer after the engine
    pub fairness: bool,
    pub weights: ScoreWeights,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            fairness: true,
            weights: ScoreWeights::DEFAULT,
        }
    }
}

/// Engine followed by the fairness pass on each day
pub fn plan_coverage(input: &CoverageInput, options: &Options) -> DutyPlan {
    plan_coverage_with(input, options, &PlanSettings::default())
}

pub fn plan_coverage_with(input: &CoverageInput, options: &Options, settings: &PlanSettings) -> DutyPlan {
    let mut plan = assign_duties_with_weights(
        &input.roster,
        &input.availability,
        &input.locks,
        options,
        &input.excluded,
        &settings.weights,
    );
    if !settings.fairness {
        return plan;
    }

    let roster = Roster::new(&input.roster);
    let empty = DaySchedule::new();
    let mut changed_days = 0usize;

    for (day, slots) in input.availability.days() {
        let inputs = DayInputs::new(day, Some(slots), &roster, &input.locks, &input.excluded, options);
        let base = plan.schedule.get(day).unwrap_or(&empty);
        let Cow::Owned(adjusted) = apply_fairness_adjustments(&inputs, base) else {
            continue;
        };

        if let Some(gaps) = plan.gaps.get_mut(day) {
            drop_covered_gaps(gaps, &adjusted);
            if gaps.is_empty() {
                plan.gaps.remove(day);
            }
        }
        plan.schedule.insert(day.clone(), adjusted);
        changed_days += 1;
    }

    info!(
        changed_days,
        assignments = plan.assignment_count(),
        gaps = plan.gap_count(),
        "fairness pass finished"
    );
    plan
}

fn drop_covered_gaps(gaps: &mut DayGaps, schedule: &DaySchedule) {
    for (period, classes) in gaps.iter_mut() {
        if let Some(assignments) = schedule.get(period) {
            classes.retain(|class_id| !assignments.iter().any(|a| &a.class_id == class_id));
        }
    }
    gaps.retain(|_, classes| !classes.is_empty());
}
