use std::collections::BTreeMap;

use serde::Serialize;

use super::slot_utils::sort_days;
use super::types::{CoverageInput, Day, DutyPlan, Roster, StaffId};

/// Load figures for one day of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayLoad {
    pub day: Day,
    pub duties: BTreeMap<StaffId, u32>,
    /// Roster staff free at some point that day who ended with no duty
    pub idle_staff: Vec<StaffId>,
    pub covered: usize,
    pub uncovered: usize,
}

/// Per-day load summary in display order
pub fn summarize(plan: &DutyPlan, input: &CoverageInput) -> Vec<DayLoad> {
    let roster = Roster::new(&input.roster);
    let mut day_keys: Vec<&Day> = input.availability.days().map(|(day, _)| day).collect();
    for day in plan.schedule.keys().chain(plan.gaps.keys()) {
        if !day_keys.contains(&day) {
            day_keys.push(day);
        }
    }

    sort_days(day_keys)
        .into_iter()
        .map(|day| {
            let mut duties: BTreeMap<StaffId, u32> = BTreeMap::new();
            let mut covered = 0;
            for assignment in plan.schedule.get(day).into_iter().flat_map(|s| s.values()).flatten() {
                *duties.entry(assignment.staff_id.clone()).or_insert(0) += 1;
                covered += 1;
            }

            let idle_staff = roster
                .members()
                .filter(|member| !duties.contains_key(&member.id))
                .filter(|member| {
                    input
                        .availability
                        .day(day)
                        .is_some_and(|slots| slots.values().any(|slot| slot.staff.contains(&member.id)))
                })
                .map(|member| member.id.clone())
                .collect();

            let uncovered = plan
                .gaps
                .get(day)
                .map(|gaps| gaps.values().map(|classes| classes.len()).sum::<usize>())
                .unwrap_or(0);

            DayLoad {
                day: day.to_string(),
                duties,
                idle_staff,
                covered,
                uncovered,
            }
        })
        .collect()
}
