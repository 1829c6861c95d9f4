use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::types::{
    ClassId, DaySchedule, ExcludedSessions, Locks, Options, Period, Roster, SlotAvailability,
    StaffId,
};

static NO_SLOTS: BTreeMap<Period, SlotAvailability> = BTreeMap::new();

/// Working counters for one day.
///
/// Built fresh for every engine run and cloned as-is when the lookahead
/// needs a snapshot; none of the caller's inputs live in here.
#[derive(Debug, Clone, Default)]
pub struct DayState {
    duty_count: HashMap<StaffId, u32>,
    slot_usage: HashMap<Period, HashMap<StaffId, u32>>,
    assigned_periods: HashMap<StaffId, Vec<Period>>,
}

impl DayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the counters from an existing day schedule
    pub fn from_schedule(schedule: &DaySchedule) -> Self {
        let mut state = Self::new();
        for (&period, assignments) in schedule {
            for assignment in assignments {
                state.record(period, &assignment.staff_id);
            }
        }
        state
    }

    pub fn duty_count(&self, staff_id: &str) -> u32 {
        self.duty_count.get(staff_id).copied().unwrap_or(0)
    }

    pub fn slot_usage(&self, period: Period, staff_id: &str) -> u32 {
        self.slot_usage
            .get(&period)
            .and_then(|usage| usage.get(staff_id))
            .copied()
            .unwrap_or(0)
    }

    /// Period of the most recent assignment recorded for this staff member
    pub fn last_assigned_period(&self, staff_id: &str) -> Option<Period> {
        self.assigned_periods.get(staff_id)?.last().copied()
    }

    pub fn assigned_periods(&self, staff_id: &str) -> &[Period] {
        self.assigned_periods
            .get(staff_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn record(&mut self, period: Period, staff_id: &str) {
        *self.duty_count.entry(staff_id.to_string()).or_insert(0) += 1;
        *self
            .slot_usage
            .entry(period)
            .or_default()
            .entry(staff_id.to_string())
            .or_insert(0) += 1;
        self.assigned_periods
            .entry(staff_id.to_string())
            .or_default()
            .push(period);
    }

    /// Takes back one assignment in `period`; a no-op if there is none
    pub fn release(&mut self, period: Period, staff_id: &str) {
        let Some(usage) = self
            .slot_usage
            .get_mut(&period)
            .and_then(|usage| usage.get_mut(staff_id))
        else {
            return;
        };
        if *usage == 0 {
            return;
        }
        *usage -= 1;

        if let Some(count) = self.duty_count.get_mut(staff_id) {
            *count = count.saturating_sub(1);
        }
        if let Some(periods) = self.assigned_periods.get_mut(staff_id) {
            if let Some(pos) = periods.iter().rposition(|&p| p == period) {
                periods.remove(pos);
            }
        }
    }

    /// max - min duty count over staff holding at least one duty
    pub fn duty_spread(&self) -> u32 {
        let mut busy = self.duty_count.values().copied().filter(|&count| count > 0);
        let Some(first) = busy.next() else {
            return 0;
        };
        let (min, max) = busy.fold((first, first), |(lo, hi), count| (lo.min(count), hi.max(count)));
        max - min
    }
}

/// Read-only view of everything the engine consults for one day
#[derive(Debug, Clone, Copy)]
pub struct DayInputs<'a> {
    pub day: &'a str,
    pub slots: &'a BTreeMap<Period, SlotAvailability>,
    pub roster: &'a Roster<'a>,
    pub locks: &'a Locks,
    pub excluded: &'a ExcludedSessions,
    pub options: &'a Options,
}

impl<'a> DayInputs<'a> {
    pub fn new(
        day: &'a str,
        slots: Option<&'a BTreeMap<Period, SlotAvailability>>,
        roster: &'a Roster<'a>,
        locks: &'a Locks,
        excluded: &'a ExcludedSessions,
        options: &'a Options,
    ) -> Self {
        Self {
            day,
            slots: slots.unwrap_or(&NO_SLOTS),
            roster,
            locks,
            excluded,
            options,
        }
    }

    /// Local copy of the slot's classes with excluded sessions taken out
    pub fn open_pool(&self, period: Period, slot: &SlotAvailability) -> BTreeSet<ClassId> {
        slot.classes
            .iter()
            .filter(|class_id| !self.excluded.contains(self.day, period, class_id))
            .cloned()
            .collect()
    }

    /// Free roster staff for the slot, fewest duties first, then by id
    pub fn staff_by_load<'s>(&self, slot: &'s SlotAvailability, state: &DayState) -> Vec<&'s str> {
        let mut staff: Vec<&str> = slot
            .staff
            .iter()
            .map(String::as_str)
            .filter(|id| self.roster.contains(id))
            .collect();
        staff.sort_by_key(|id| state.duty_count(id));
        staff
    }

    /// Whether the staff member is free in any period of the day
    pub fn available_today(&self, staff_id: &str) -> bool {
        self.slots.values().any(|slot| slot.staff.contains(staff_id))
    }
}
