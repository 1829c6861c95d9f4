use std::cmp::Ordering;
use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::types::Period;

/// A period key as it arrives from callers: a number, or text to be coerced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeriodKey {
    Number(i64),
    Float(f64),
    Text(String),
}

impl PeriodKey {
    /// Best-effort conversion to a numeric period; None when it can't be read
    pub fn coerce(&self) -> Option<Period> {
        match self {
            PeriodKey::Number(n) => Period::try_from(*n).ok(),
            PeriodKey::Float(f) => float_to_period(*f),
            PeriodKey::Text(s) => parse_period(s),
        }
    }
}

impl From<Period> for PeriodKey {
    fn from(value: Period) -> Self {
        PeriodKey::Number(i64::from(value))
    }
}

fn float_to_period(value: f64) -> Option<Period> {
    if value.is_finite() && value.fract() == 0.0 {
        Period::try_from(value as i64).ok()
    } else {
        None
    }
}

/// Parses a period key such as "3", " 3 ", "3.0", "P3" or "Period 3"
pub fn parse_period(raw: &str) -> Option<Period> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_ascii_lowercase();
    let digits = lower
        .strip_prefix("period")
        .or_else(|| lower.strip_prefix('p'))
        .unwrap_or(&lower)
        .trim();

    if let Ok(period) = digits.parse::<Period>() {
        return Some(period);
    }
    digits.parse::<f64>().ok().and_then(float_to_period)
}

/// Splits a cell holding several ids separated by ';' or ','
/// Blank entries are dropped and the order of first appearance is kept
pub fn split_ids(cell: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for part in cell.split([';', ',']) {
        let trimmed = part.trim();
        if !trimmed.is_empty() && !ids.iter().any(|id| id == trimmed) {
            ids.push(trimmed.to_string());
        }
    }
    ids
}

/// Position of a day in the week, if the key names a weekday
pub fn weekday_rank(day: &str) -> Option<u32> {
    Weekday::from_str(day.trim())
        .ok()
        .map(|weekday| weekday.num_days_from_monday())
}

/// Orders day keys Monday-first when they name weekdays, lexically otherwise
pub fn compare_days(a: &str, b: &str) -> Ordering {
    match (weekday_rank(a), weekday_rank(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Sorts day keys for display
pub fn sort_days<'a, I>(days: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut sorted: Vec<&str> = days.into_iter().map(String::as_str).collect();
    sorted.sort_by(|a, b| compare_days(a, b));
    sorted
}
