//! Seeded random coverage problems for trying the engine without real data.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::schedule::{Availability, CoverageInput, ExcludedSessions, LockValue, Locks, Period, Staff};

const DAYS: [&str; 5] = ["Mon", "Tue", "Wed", "Thu", "Fri"];

/// Shape of a generated problem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoParameters {
    pub days: usize,
    pub periods: Period,
    pub staff: usize,
    pub classes: usize,
    /// Percent chance that a staff member is free in a given period
    pub free_percent: u32,
    /// Percent chance that a class needs cover in a given period
    pub absence_percent: u32,
}

impl Default for DemoParameters {
    fn default() -> Self {
        Self {
            days: 5,
            periods: 6,
            staff: 12,
            classes: 20,
            free_percent: 35,
            absence_percent: 15,
        }
    }
}

/// Builds a random but reproducible problem: same seed, same input
pub fn generate_demo_input(seed: u64, params: &DemoParameters) -> CoverageInput {
    let mut rng = StdRng::seed_from_u64(seed);

    let roster: Vec<Staff> = (1..=params.staff)
        .map(|n| {
            let staff = Staff::new(format!("T{:02}", n));
            match rng.gen_range(0..4) {
                0 => staff.with_max_duties(rng.gen_range(1..=3)),
                _ => staff,
            }
        })
        .collect();
    let classes: Vec<String> = (1..=params.classes).map(|n| format!("C{:02}", n)).collect();

    let mut availability = Availability::new();
    let mut locks = Locks::new();
    let mut excluded = ExcludedSessions::new();

    for day in DAYS.iter().take(params.days) {
        for period in 1..=params.periods {
            for member in &roster {
                if rng.gen_range(0..100) < params.free_percent {
                    availability.add_staff(*day, period, member.id.as_str());
                }
            }
            let needing: Vec<&String> = classes
                .iter()
                .filter(|_| rng.gen_range(0..100) < params.absence_percent)
                .collect();
            for class_id in &needing {
                availability.add_class(*day, period, class_id.as_str());
            }

            // sprinkle a few manual decisions over the first class needing cover
            if let Some(first) = needing.first() {
                match rng.gen_range(0..10) {
                    0 => locks.insert(*day, period, first.as_str(), LockValue::Empty),
                    1 => excluded.insert(*day, period, first.as_str()),
                    2 => {
                        if let Some(member) = roster.choose(&mut rng) {
                            locks.insert(
                                *day,
                                period,
                                first.as_str(),
                                LockValue::Assigned(member.id.clone()),
                            );
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    CoverageInput {
        roster,
        availability,
        locks,
        excluded,
    }
}
