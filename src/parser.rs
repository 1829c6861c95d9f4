use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{info, warn};

use crate::error::AppError;
use crate::schedule::slot_utils::{parse_period, split_ids};
use crate::schedule::{Availability, CoverageInput, ExcludedSessions, LockValue, Locks, Period, Staff};

pub const STAFF_FILE: &str = "staff.csv";
pub const AVAILABILITY_FILE: &str = "availability.csv";
pub const LOCKS_FILE: &str = "locks.csv";
pub const EXCLUDED_FILE: &str = "excluded.csv";

/// Finds a column by header name, falling back to a fixed position
fn column(headers: &StringRecord, names: &[&str], fallback: usize) -> usize {
    headers
        .iter()
        .position(|h| names.iter().any(|name| h.trim().eq_ignore_ascii_case(name)))
        .unwrap_or(fallback)
}

fn cell(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("").trim()
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader)
}

/// Reads the day and period cells of a row, warning about rows that can't be placed
fn slot_of(record: &StringRecord, day_col: usize, period_col: usize, source: &str) -> Option<(String, Period)> {
    let day = cell(record, day_col);
    if day.is_empty() {
        warn!(source, "skipping row without a day");
        return None;
    }
    let raw_period = cell(record, period_col);
    match parse_period(raw_period) {
        Some(period) => Some((day.to_string(), period)),
        None => {
            warn!(source, day, period = raw_period, "skipping row with unreadable period");
            None
        }
    }
}

/// Loads the roster: `id,max_duties_per_day`. A blank or malformed cap means "use the default".
pub fn load_roster<R: Read>(reader: R) -> Result<Vec<Staff>, AppError> {
    let mut reader = csv_reader(reader);
    let headers = reader.headers()?.clone();
    let id_col = column(&headers, &["id", "staff_id", "staff"], 0);
    let max_col = column(&headers, &["max_duties_per_day", "max_duties", "max"], 1);

    let mut roster = Vec::new();
    for result in reader.records() {
        let record = result?;
        let id = cell(&record, id_col);
        if id.is_empty() {
            continue;
        }

        let raw_max = cell(&record, max_col);
        let max_duties_per_day = if raw_max.is_empty() {
            None
        } else {
            match raw_max.parse::<u32>() {
                Ok(max) => Some(max),
                Err(_) => {
                    warn!(staff_id = id, value = raw_max, "unreadable daily cap; using the default");
                    None
                }
            }
        };

        roster.push(Staff {
            id: id.to_string(),
            max_duties_per_day,
        });
    }

    Ok(roster)
}

/// Loads availability: `day,period,staff,classes` with id lists in the last two cells.
/// Several rows for the same slot are merged.
pub fn load_availability<R: Read>(reader: R) -> Result<Availability, AppError> {
    let mut reader = csv_reader(reader);
    let headers = reader.headers()?.clone();
    let day_col = column(&headers, &["day"], 0);
    let period_col = column(&headers, &["period"], 1);
    let staff_col = column(&headers, &["staff", "free_staff"], 2);
    let classes_col = column(&headers, &["classes", "uncovered_classes"], 3);

    let mut availability = Availability::new();
    for result in reader.records() {
        let record = result?;
        if record.len() < 3 {
            continue;
        }
        let Some((day, period)) = slot_of(&record, day_col, period_col, AVAILABILITY_FILE) else {
            continue;
        };

        for staff_id in split_ids(cell(&record, staff_col)) {
            availability.add_staff(day.as_str(), period, staff_id);
        }
        for class_id in split_ids(cell(&record, classes_col)) {
            availability.add_class(day.as_str(), period, class_id);
        }
    }

    Ok(availability)
}

/// Interprets the staff cell of a lock row
pub fn parse_lock_value(raw: &str) -> LockValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed.eq_ignore_ascii_case("empty") {
        LockValue::Empty
    } else {
        LockValue::Assigned(trimmed.to_string())
    }
}

/// Loads locks: `day,period,class_id,staff_id`
pub fn load_locks<R: Read>(reader: R) -> Result<Locks, AppError> {
    let mut reader = csv_reader(reader);
    let headers = reader.headers()?.clone();
    let day_col = column(&headers, &["day"], 0);
    let period_col = column(&headers, &["period"], 1);
    let class_col = column(&headers, &["class_id", "class"], 2);
    let staff_col = column(&headers, &["staff_id", "staff"], 3);

    let mut locks = Locks::new();
    for result in reader.records() {
        let record = result?;
        let Some((day, period)) = slot_of(&record, day_col, period_col, LOCKS_FILE) else {
            continue;
        };
        let class_id = cell(&record, class_col);
        if class_id.is_empty() {
            continue;
        }
        locks.insert(day, period, class_id, parse_lock_value(cell(&record, staff_col)));
    }

    Ok(locks)
}

/// Loads externally covered sessions: `day,period,class_id`
pub fn load_excluded<R: Read>(reader: R) -> Result<ExcludedSessions, AppError> {
    let mut reader = csv_reader(reader);
    let headers = reader.headers()?.clone();
    let day_col = column(&headers, &["day"], 0);
    let period_col = column(&headers, &["period"], 1);
    let class_col = column(&headers, &["class_id", "class"], 2);

    let mut excluded = ExcludedSessions::new();
    for result in reader.records() {
        let record = result?;
        let Some((day, period)) = slot_of(&record, day_col, period_col, EXCLUDED_FILE) else {
            continue;
        };
        let class_id = cell(&record, class_col);
        if !class_id.is_empty() {
            excluded.insert(day, period, class_id);
        }
    }

    Ok(excluded)
}

fn open_required(dir: &Path, name: &str) -> Result<File, AppError> {
    let path = dir.join(name);
    if !path.exists() {
        return Err(AppError::MissingInput(path.display().to_string()));
    }
    Ok(File::open(path)?)
}

fn open_optional(dir: &Path, name: &str) -> Result<Option<File>, AppError> {
    let path = dir.join(name);
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(File::open(path)?))
}

/// Loads a full coverage problem from a directory of CSV files.
/// `staff.csv` and `availability.csv` are required; locks and excluded sessions are optional.
pub fn load_coverage_input<P: AsRef<Path>>(dir: P) -> Result<CoverageInput, AppError> {
    let dir = dir.as_ref();
    let roster = load_roster(open_required(dir, STAFF_FILE)?)?;
    let availability = load_availability(open_required(dir, AVAILABILITY_FILE)?)?;
    let locks = match open_optional(dir, LOCKS_FILE)? {
        Some(file) => load_locks(file)?,
        None => Locks::new(),
    };
    let excluded = match open_optional(dir, EXCLUDED_FILE)? {
        Some(file) => load_excluded(file)?,
        None => ExcludedSessions::new(),
    };

    info!(
        staff = roster.len(),
        locks = locks.len(),
        excluded = excluded.len(),
        "loaded coverage input from {}",
        dir.display()
    );

    Ok(CoverageInput {
        roster,
        availability,
        locks,
        excluded,
    })
}
