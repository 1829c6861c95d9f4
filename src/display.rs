use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::Local;
use csv::WriterBuilder;

use crate::error::AppError;
use crate::schedule::slot_utils::sort_days;
use crate::schedule::{Assignment, CoverageInput, DayLoad, DutyPlan, Period};

/// Formats a cover as "class <- staff"
pub fn format_assignment(assignment: &Assignment) -> String {
    format!("{} <- {}", assignment.class_id, assignment.staff_id)
}

/// Days that appear anywhere in the plan, in display order
fn plan_days(plan: &DutyPlan) -> Vec<&str> {
    let mut keys: Vec<&String> = plan.schedule.keys().collect();
    for day in plan.gaps.keys() {
        if !keys.contains(&day) {
            keys.push(day);
        }
    }
    sort_days(keys)
}

/// Renders the plan as text lines, one per period, with uncovered classes flagged
pub fn render_plan(plan: &DutyPlan) -> Vec<String> {
    let mut lines = Vec::new();
    for day in plan_days(plan) {
        lines.push(format!("** {} **", day));

        let schedule = plan.day_schedule(day);
        let gaps = plan.day_gaps(day);
        let mut periods: Vec<Period> = schedule.into_iter().flat_map(|s| s.keys().copied()).collect();
        periods.extend(gaps.into_iter().flat_map(|g| g.keys().copied()));
        periods.sort_unstable();
        periods.dedup();

        for period in periods {
            let covers: Vec<String> = schedule
                .and_then(|s| s.get(&period))
                .map(|slot| slot.iter().map(format_assignment).collect())
                .unwrap_or_default();
            let mut line = format!("P{}: ", period);
            if covers.is_empty() {
                line.push_str("[NONE]");
            } else {
                line.push_str(&covers.join(", "));
            }
            if let Some(uncovered) = gaps.and_then(|g| g.get(&period)) {
                let names: Vec<&str> = uncovered.iter().map(String::as_str).collect();
                line.push_str(&format!("  !! uncovered: {}", names.join(", ")));
            }
            lines.push(line);
        }
    }
    lines
}

/// Writes the text rendering of a plan to a file
pub fn write_plan_to_file<P: AsRef<Path>>(plan: &DutyPlan, path: P) -> Result<(), AppError> {
    let mut file = File::create(path)?;
    writeln!(file, "# duty cover generated {}", Local::now().format("%Y-%m-%d %H:%M"))?;
    for line in render_plan(plan) {
        writeln!(file, "{}", line)?;
    }
    Ok(())
}

/// Exports the plan as CSV rows: `day,period,class_id,staff_id,status`
pub fn export_plan_csv<W: Write>(plan: &DutyPlan, writer: W) -> Result<(), AppError> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(["day", "period", "class_id", "staff_id", "status"])?;

    for day in plan_days(plan) {
        if let Some(schedule) = plan.day_schedule(day) {
            for (period, slot) in schedule {
                let period = period.to_string();
                for assignment in slot {
                    wtr.write_record([
                        day,
                        period.as_str(),
                        assignment.class_id.as_str(),
                        assignment.staff_id.as_str(),
                        "covered",
                    ])?;
                }
            }
        }
        if let Some(gaps) = plan.day_gaps(day) {
            for (period, classes) in gaps {
                let period = period.to_string();
                for class_id in classes {
                    wtr.write_record([day, period.as_str(), class_id.as_str(), "", "uncovered"])?;
                }
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the CSV export to a file
pub fn write_plan_csv<P: AsRef<Path>>(plan: &DutyPlan, path: P) -> Result<(), AppError> {
    export_plan_csv(plan, File::create(path)?)
}

/// Prints a plan and its load summary
pub fn print_plan(plan: &DutyPlan, input: &CoverageInput, loads: &[DayLoad]) {
    println!("\n=== Duty Cover ===");
    println!(
        "Staff: {}, covers made: {}, classes uncovered: {}",
        input.roster.len(),
        plan.assignment_count(),
        plan.gap_count()
    );

    for line in render_plan(plan) {
        if line.starts_with("**") {
            println!();
        }
        println!("  {}", line);
    }

    println!("\nLoad by day:");
    for load in loads {
        let duties: Vec<String> = load
            .duties
            .iter()
            .map(|(staff_id, count)| format!("{}={}", staff_id, count))
            .collect();
        println!("  {}: {}", load.day, duties.join(" "));
        if !load.idle_staff.is_empty() {
            println!("    ⚠️  idle: {}", load.idle_staff.join(", "));
        }
        if load.uncovered > 0 {
            println!("    ⚠️  uncovered classes: {}", load.uncovered);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::DaySchedule;

    fn sample_plan() -> DutyPlan {
        let mut plan = DutyPlan::default();
        let mut monday = DaySchedule::new();
        monday.insert(1, vec![Assignment::new("7A", "ann"), Assignment::new("7B", "bob")]);
        plan.schedule.insert("Mon".to_string(), monday);
        plan.gaps
            .entry("Mon".to_string())
            .or_default()
            .insert(2, ["8C".to_string()].into_iter().collect());
        plan
    }

    #[test]
    fn renders_covers_and_gaps() {
        let lines = render_plan(&sample_plan());
        assert_eq!(lines[0], "** Mon **");
        assert_eq!(lines[1], "P1: 7A <- ann, 7B <- bob");
        assert_eq!(lines[2], "P2: [NONE]  !! uncovered: 8C");
    }

    #[test]
    fn csv_export_lists_every_row() {
        let mut out = Vec::new();
        export_plan_csv(&sample_plan(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows[0], "day,period,class_id,staff_id,status");
        assert_eq!(rows[1], "Mon,1,7A,ann,covered");
        assert_eq!(rows[3], "Mon,2,8C,,uncovered");
        assert_eq!(rows.len(), 4);
    }
}
