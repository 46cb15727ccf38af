use crate::conflicts::SelectionProblems;
use crate::data::{Preferences, Schedule};
use crate::report::{ConflictReport, GroupedConflict, GroupedMissing, PersonProblems};
use crate::sections::SlotAvailability;
use itertools::Itertools;
use std::fmt::Write;

/// "a and b" for two items, "a, b, c" otherwise.
pub fn format_list<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [first, second] => format!("{} and {}", first.as_ref(), second.as_ref()),
        _ => items.iter().map(|item| -> &str { item.as_ref() }).join(", "),
    }
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

pub fn format_conflict(conflict: &GroupedConflict) -> String {
    format!(
        "COURSE CONFLICT: {} {} {} at {}:\n\t{}",
        conflict.people.len(),
        plural(conflict.people.len(), "student takes", "students take"),
        format_list(&conflict.courses),
        conflict.slot,
        format_list(&conflict.people)
    )
}

pub fn format_missing_course(missing: &GroupedMissing) -> String {
    format!(
        "COURSE NOT OFFERED: {} {} {}, which isn't scheduled:\n\t{}",
        missing.people.len(),
        plural(missing.people.len(), "student requests", "students request"),
        missing.course,
        format_list(&missing.people)
    )
}

/// Conflicts first, a blank line, then courses nobody offers.
pub fn format_conflict_report(report: &ConflictReport) -> String {
    let mut out = String::new();
    for conflict in &report.conflicts {
        out.push_str(&format_conflict(conflict));
        out.push('\n');
    }
    out.push('\n');
    for missing in &report.missing {
        out.push_str(&format_missing_course(missing));
        out.push('\n');
    }
    out
}

fn format_selection(problems: &SelectionProblems) -> String {
    let conflicts = problems
        .conflicts
        .iter()
        .map(|c| format!("\tCONFLICT: {} at {}\n", format_list(&c.courses), c.slot));
    let missing = problems
        .missing
        .iter()
        .map(|course| format!("\tCOURSE NOT OFFERED: {}\n", course));
    conflicts.chain(missing).collect()
}

pub fn format_person_report(report: &[PersonProblems]) -> String {
    report
        .iter()
        .map(|person| {
            format!(
                "Conflicts for: {}\n{}\n",
                person.name,
                format_selection(&person.problems)
            )
        })
        .collect()
}

/// The schedule as a `/`-separated table with one column per teacher, in the
/// layout [`crate::parser::parse_schedule`] reads back.
pub fn format_schedule_table(offerings: &Preferences, schedule: &Schedule) -> String {
    let teachers: Vec<&str> = offerings
        .people()
        .map(|(name, _)| name.as_str())
        .chain(schedule.teachers().into_iter().map(String::as_str))
        .sorted()
        .dedup()
        .collect();

    let cell = |teacher: &str, slot: &str| -> String {
        match schedule.course_at(teacher, slot) {
            Some(course) => course.clone(),
            None if schedule.is_blacked_out(teacher, slot) => "X".to_string(),
            None => "-".to_string(),
        }
    };

    let header = "Timeslots";
    let first_width = schedule
        .slot_order()
        .iter()
        .map(String::len)
        .chain([header.len()])
        .max()
        .unwrap_or_default();
    let widths: Vec<usize> = teachers
        .iter()
        .map(|&teacher| {
            schedule
                .slot_order()
                .iter()
                .map(|slot| cell(teacher, slot.as_str()).len())
                .chain([teacher.len()])
                .max()
                .unwrap_or_default()
        })
        .collect();

    let mut out = String::new();
    let mut row = |first: &str, cells: Vec<String>| {
        let mut line = format!("{:<width$}", first, width = first_width);
        for (value, width) in cells.iter().zip(&widths) {
            let _ = write!(line, " / {:<width$}", value, width = *width);
        }
        out.push_str(line.trim_end());
        out.push('\n');
    };
    row(header, teachers.iter().map(|t| t.to_string()).collect());
    for slot in schedule.slot_order() {
        row(slot.as_str(), teachers.iter().map(|&t| cell(t, slot.as_str())).collect());
    }
    out
}

/// A solver result: header line, then the table between `===` markers.
pub fn format_solution(
    number: usize,
    conflicts: f64,
    offerings: &Preferences,
    schedule: &Schedule,
) -> String {
    let rounded = conflicts.round() as i64;
    format!(
        "Solution #{}, {} {}:\n===\n{}===\n",
        number,
        rounded,
        plural(rounded.unsigned_abs() as usize, "conflict", "conflicts"),
        format_schedule_table(offerings, schedule)
    )
}

pub fn format_section_availability(class_list: &[String], slots: &[SlotAvailability]) -> String {
    let mut out = format!(
        "Total {} students in class: {}\n",
        class_list.len(),
        format_list(class_list)
    );
    for slot in slots {
        let _ = write!(out, "\nConflicts in slot {}\n", slot.slot);
        for taken in &slot.taken {
            let _ = writeln!(
                out,
                "\t{} {} {}: {}",
                taken.students.len(),
                plural(taken.students.len(), "student takes", "students take"),
                taken.course,
                format_list(&taken.students)
            );
        }
        let _ = writeln!(
            out,
            "-- can put {} people in a section at this timeslot: {}",
            slot.free.len(),
            format_list(&slot.free)
        );
    }
    out
}
