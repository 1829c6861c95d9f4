pub mod types;
pub mod slot_utils;
pub mod state;
pub mod feasibility;
pub mod lookahead;
pub mod engine;
pub mod fairness;
pub mod planner;
pub mod summary;

pub use types::{
    Assignment, Availability, CoverageInput, DayGaps, DaySchedule, DutyPlan, ExcludedSessions,
    LockValue, Locks, Options, Period, Roster, SlotAvailability, Staff,
};
pub use state::{DayInputs, DayState};
pub use feasibility::can_assign;
pub use lookahead::{score_candidate, simulate_assignment, CandidateScore, ScoreWeights};
pub use engine::{assign_day, assign_duties, assign_duties_with_weights};
pub use fairness::apply_fairness_adjustments;
pub use planner::{plan_coverage, plan_coverage_with, PlanSettings};
pub use summary::{summarize, DayLoad};
