use super::state::DayState;
use super::types::{Options, Period, Roster};

/// Whether `staff_id` may take one more class in `period` on the day `state` tracks.
///
/// Staff outside the roster are never assignable. The consecutive rule only
/// applies to a staff member's first class in a slot; once they hold one,
/// further classes in the same slot are judged on the caps alone.
pub fn can_assign(
    state: &DayState,
    roster: &Roster<'_>,
    options: &Options,
    period: Period,
    staff_id: &str,
) -> bool {
    let Some(cap) = roster.daily_cap(staff_id) else {
        return false;
    };
    if state.duty_count(staff_id) >= cap {
        return false;
    }

    let usage = state.slot_usage(period, staff_id);
    if usage >= options.slot_capacity() {
        return false;
    }

    if options.consecutive_rule_active() && usage == 0 && works_adjacent_period(state, period, staff_id) {
        return false;
    }

    true
}

fn works_adjacent_period(state: &DayState, period: Period, staff_id: &str) -> bool {
    [period.checked_sub(1), period.checked_add(1)]
        .into_iter()
        .flatten()
        .any(|neighbour| state.slot_usage(neighbour, staff_id) > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::types::Staff;

    fn roster_staff() -> Vec<Staff> {
        vec![Staff::new("a").with_max_duties(2), Staff::new("b")]
    }

    #[test]
    fn respects_daily_cap() {
        let staff = roster_staff();
        let roster = Roster::new(&staff);
        let options = Options::default();
        let mut state = DayState::new();
        state.record(1, "a");
        assert!(can_assign(&state, &roster, &options, 3, "a"));
        state.record(3, "a");
        assert!(!can_assign(&state, &roster, &options, 5, "a"));
    }

    #[test]
    fn respects_slot_capacity() {
        let staff = roster_staff();
        let roster = Roster::new(&staff);
        let mut options = Options::default();
        let mut state = DayState::new();
        state.record(1, "b");
        assert!(!can_assign(&state, &roster, &options, 1, "b"));
        options.max_per_slot = 2;
        assert!(can_assign(&state, &roster, &options, 1, "b"));
    }

    #[test]
    fn unknown_staff_is_never_assignable() {
        let staff = roster_staff();
        let roster = Roster::new(&staff);
        assert!(!can_assign(&DayState::new(), &roster, &Options::default(), 1, "ghost"));
    }

    #[test]
    fn consecutive_rule_blocks_neighbouring_first_class() {
        let staff = roster_staff();
        let roster = Roster::new(&staff);
        let options = Options {
            prevent_consecutive: true,
            max_per_slot: 2,
            ignore_consecutive_limit: false,
        };
        let mut state = DayState::new();
        state.record(2, "b");
        assert!(!can_assign(&state, &roster, &options, 1, "b"));
        assert!(!can_assign(&state, &roster, &options, 3, "b"));
        assert!(can_assign(&state, &roster, &options, 4, "b"));
        // a second class in a slot already held is not re-checked
        assert!(can_assign(&state, &roster, &options, 2, "b"));
    }

    #[test]
    fn ignore_limit_switches_consecutive_rule_off() {
        let staff = roster_staff();
        let roster = Roster::new(&staff);
        let options = Options {
            prevent_consecutive: true,
            max_per_slot: 1,
            ignore_consecutive_limit: true,
        };
        let mut state = DayState::new();
        state.record(2, "b");
        assert!(can_assign(&state, &roster, &options, 3, "b"));
    }
}
