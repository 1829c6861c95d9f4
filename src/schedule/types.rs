use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::slot_utils::PeriodKey;

pub type StaffId = String;
pub type ClassId = String;
pub type Day = String;
pub type Period = i32;

/// Daily cap applied to staff without one of their own
pub const DEFAULT_MAX_DUTIES_PER_DAY: u32 = 6;
/// Slot capacity applied when the caller leaves it unset or invalid
pub const DEFAULT_MAX_PER_SLOT: u32 = 1;

/// A supervising staff member who can cover classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub id: StaffId,
    #[serde(default)]
    pub max_duties_per_day: Option<u32>,
}

impl Staff {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            max_duties_per_day: None,
        }
    }

    pub fn with_max_duties(mut self, max: u32) -> Self {
        self.max_duties_per_day = Some(max);
        self
    }

    pub fn daily_cap(&self) -> u32 {
        self.max_duties_per_day.unwrap_or(DEFAULT_MAX_DUTIES_PER_DAY)
    }
}

/// Roster lookup over the caller's ordered staff list.
///
/// Duplicate ids are reported once and otherwise ignored: the first
/// occurrence wins for every lookup and for roster-order iteration.
#[derive(Debug, Clone)]
pub struct Roster<'a> {
    members: Vec<&'a Staff>,
    index: HashMap<&'a str, usize>,
}

impl<'a> Roster<'a> {
    pub fn new(staff: &'a [Staff]) -> Self {
        let mut members = Vec::with_capacity(staff.len());
        let mut index = HashMap::with_capacity(staff.len());
        for member in staff {
            if index.contains_key(member.id.as_str()) {
                warn!(staff_id = %member.id, "duplicate staff id in roster; keeping the first entry");
                continue;
            }
            index.insert(member.id.as_str(), members.len());
            members.push(member);
        }
        Self { members, index }
    }

    pub fn get(&self, staff_id: &str) -> Option<&'a Staff> {
        self.index.get(staff_id).map(|&i| self.members[i])
    }

    pub fn contains(&self, staff_id: &str) -> bool {
        self.index.contains_key(staff_id)
    }

    pub fn daily_cap(&self, staff_id: &str) -> Option<u32> {
        self.get(staff_id).map(Staff::daily_cap)
    }

    /// Unique members in roster order
    pub fn members(&self) -> impl Iterator<Item = &'a Staff> + '_ {
        self.members.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Manual override for one class in one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "staff_id", rename_all = "snake_case")]
pub enum LockValue {
    /// Pin this staff member to the class
    Assigned(StaffId),
    /// Leave the class deliberately uncovered
    Empty,
}

/// One row of the lock table as exchanged with callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockEntry {
    pub day: Day,
    pub period: PeriodKey,
    pub class_id: ClassId,
    pub value: LockValue,
}

/// Lock table keyed by day, period and class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LockEntry>", into = "Vec<LockEntry>")]
pub struct Locks {
    slots: BTreeMap<Day, BTreeMap<Period, BTreeMap<ClassId, LockValue>>>,
}

impl Locks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        day: impl Into<String>,
        period: Period,
        class_id: impl Into<String>,
        value: LockValue,
    ) {
        self.slots
            .entry(day.into())
            .or_default()
            .entry(period)
            .or_default()
            .insert(class_id.into(), value);
    }

    pub fn get(&self, day: &str, period: Period, class_id: &str) -> Option<&LockValue> {
        self.slots.get(day)?.get(&period)?.get(class_id)
    }

    /// Locks for one slot, ordered by class id
    pub fn for_slot(&self, day: &str, period: Period) -> impl Iterator<Item = (&ClassId, &LockValue)> {
        self.slots
            .get(day)
            .and_then(|periods| periods.get(&period))
            .into_iter()
            .flatten()
    }

    pub fn len(&self) -> usize {
        self.slots
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<LockEntry>> for Locks {
    fn from(entries: Vec<LockEntry>) -> Self {
        let mut locks = Locks::new();
        for entry in entries {
            match entry.period.coerce() {
                Some(period) => locks.insert(entry.day, period, entry.class_id, entry.value),
                None => warn!(day = %entry.day, class_id = %entry.class_id, "skipping lock with unreadable period"),
            }
        }
        locks
    }
}

impl From<Locks> for Vec<LockEntry> {
    fn from(locks: Locks) -> Self {
        let mut entries = Vec::new();
        for (day, periods) in locks.slots {
            for (period, classes) in periods {
                for (class_id, value) in classes {
                    entries.push(LockEntry {
                        day: day.clone(),
                        period: period.into(),
                        class_id,
                        value,
                    });
                }
            }
        }
        entries
    }
}

/// One externally covered session as exchanged with callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub day: Day,
    pub period: PeriodKey,
    pub class_id: ClassId,
}

/// Class sessions handled outside the coverage pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SessionEntry>", into = "Vec<SessionEntry>")]
pub struct ExcludedSessions {
    slots: BTreeMap<Day, BTreeMap<Period, BTreeSet<ClassId>>>,
}

impl ExcludedSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, day: impl Into<String>, period: Period, class_id: impl Into<String>) {
        self.slots
            .entry(day.into())
            .or_default()
            .entry(period)
            .or_default()
            .insert(class_id.into());
    }

    pub fn contains(&self, day: &str, period: Period, class_id: &str) -> bool {
        self.slots
            .get(day)
            .and_then(|periods| periods.get(&period))
            .is_some_and(|classes| classes.contains(class_id))
    }

    pub fn len(&self) -> usize {
        self.slots
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeSet::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<SessionEntry>> for ExcludedSessions {
    fn from(entries: Vec<SessionEntry>) -> Self {
        let mut excluded = ExcludedSessions::new();
        for entry in entries {
            match entry.period.coerce() {
                Some(period) => excluded.insert(entry.day, period, entry.class_id),
                None => warn!(day = %entry.day, class_id = %entry.class_id, "skipping excluded session with unreadable period"),
            }
        }
        excluded
    }
}

impl From<ExcludedSessions> for Vec<SessionEntry> {
    fn from(excluded: ExcludedSessions) -> Self {
        let mut entries = Vec::new();
        for (day, periods) in excluded.slots {
            for (period, classes) in periods {
                for class_id in classes {
                    entries.push(SessionEntry {
                        day: day.clone(),
                        period: period.into(),
                        class_id,
                    });
                }
            }
        }
        entries
    }
}

/// Who is free and what needs cover in one slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    #[serde(default)]
    pub staff: BTreeSet<StaffId>,
    #[serde(default)]
    pub classes: BTreeSet<ClassId>,
}

type RawAvailability = BTreeMap<Day, BTreeMap<String, SlotAvailability>>;

/// Availability per day and period, already filtered for absences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAvailability", into = "RawAvailability")]
pub struct Availability {
    days: BTreeMap<Day, BTreeMap<Period, SlotAvailability>>,
}

impl Availability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_staff(&mut self, day: impl Into<String>, period: Period, staff_id: impl Into<String>) {
        self.slot_mut(day.into(), period).staff.insert(staff_id.into());
    }

    pub fn add_class(&mut self, day: impl Into<String>, period: Period, class_id: impl Into<String>) {
        self.slot_mut(day.into(), period).classes.insert(class_id.into());
    }

    /// Merges another slot's sets into this slot
    pub fn merge_slot(&mut self, day: impl Into<String>, period: Period, slot: SlotAvailability) {
        let target = self.slot_mut(day.into(), period);
        target.staff.extend(slot.staff);
        target.classes.extend(slot.classes);
    }

    fn slot_mut(&mut self, day: Day, period: Period) -> &mut SlotAvailability {
        self.days.entry(day).or_default().entry(period).or_default()
    }

    pub fn slot(&self, day: &str, period: Period) -> Option<&SlotAvailability> {
        self.days.get(day)?.get(&period)
    }

    pub fn day(&self, day: &str) -> Option<&BTreeMap<Period, SlotAvailability>> {
        self.days.get(day)
    }

    pub fn days(&self) -> impl Iterator<Item = (&Day, &BTreeMap<Period, SlotAvailability>)> {
        self.days.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl From<RawAvailability> for Availability {
    fn from(raw: RawAvailability) -> Self {
        let mut availability = Availability::new();
        for (day, periods) in raw {
            for (key, slot) in periods {
                match PeriodKey::Text(key).coerce() {
                    Some(period) => availability.merge_slot(day.clone(), period, slot),
                    None => warn!(day = %day, "skipping availability with unreadable period"),
                }
            }
        }
        availability
    }
}

impl From<Availability> for RawAvailability {
    fn from(availability: Availability) -> Self {
        availability
            .days
            .into_iter()
            .map(|(day, periods)| {
                let periods = periods
                    .into_iter()
                    .map(|(period, slot)| (period.to_string(), slot))
                    .collect();
                (day, periods)
            })
            .collect()
    }
}

/// The tunable rules every engine call runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    #[serde(default)]
    pub prevent_consecutive: bool,
    #[serde(default = "default_max_per_slot", deserialize_with = "lenient_max_per_slot")]
    pub max_per_slot: u32,
    #[serde(default)]
    pub ignore_consecutive_limit: bool,
}

impl Options {
    /// Slot capacity with the fallback for zero applied
    pub fn slot_capacity(&self) -> u32 {
        self.max_per_slot.max(DEFAULT_MAX_PER_SLOT)
    }

    pub fn consecutive_rule_active(&self) -> bool {
        self.prevent_consecutive && !self.ignore_consecutive_limit
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            prevent_consecutive: false,
            max_per_slot: DEFAULT_MAX_PER_SLOT,
            ignore_consecutive_limit: false,
        }
    }
}

fn default_max_per_slot() -> u32 {
    DEFAULT_MAX_PER_SLOT
}

fn lenient_max_per_slot<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(normalize_max_per_slot(raw))
}

/// Maps a caller-supplied slot capacity to a usable one (unset or < 1 becomes 1)
pub fn normalize_max_per_slot(raw: Option<i64>) -> u32 {
    match raw {
        Some(value) if value >= 1 => u32::try_from(value).unwrap_or(u32::MAX),
        _ => DEFAULT_MAX_PER_SLOT,
    }
}

/// One staff-to-class cover in a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub class_id: ClassId,
    pub staff_id: StaffId,
}

impl Assignment {
    pub fn new(class_id: impl Into<String>, staff_id: impl Into<String>) -> Self {
        Self {
            class_id: class_id.into(),
            staff_id: staff_id.into(),
        }
    }
}

/// Assignments for one day: period -> covers in the order they were made
pub type DaySchedule = BTreeMap<Period, Vec<Assignment>>;
/// Classes left uncovered on one day
pub type DayGaps = BTreeMap<Period, BTreeSet<ClassId>>;
pub type Schedule = BTreeMap<Day, DaySchedule>;
pub type Gaps = BTreeMap<Day, DayGaps>;

/// Output of a planning run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyPlan {
    pub schedule: Schedule,
    pub gaps: Gaps,
}

impl DutyPlan {
    pub fn day_schedule(&self, day: &str) -> Option<&DaySchedule> {
        self.schedule.get(day)
    }

    pub fn day_gaps(&self, day: &str) -> Option<&DayGaps> {
        self.gaps.get(day)
    }

    pub fn assignment_count(&self) -> usize {
        self.schedule
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn gap_count(&self) -> usize {
        self.gaps
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeSet::len)
            .sum()
    }
}

/// Everything the engine reads, as supplied by the surrounding application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageInput {
    pub roster: Vec<Staff>,
    pub availability: Availability,
    #[serde(default)]
    pub locks: Locks,
    #[serde(default)]
    pub excluded: ExcludedSessions,
}
