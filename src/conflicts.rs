use crate::data::{CourseName, CourseRequest, Schedule, Timeslot};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashSet;

/// Two or more requested courses that meet in the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Conflict {
    pub courses: Vec<CourseName>,
    pub slot: Timeslot,
}

/// Ordering key for a clash: more simultaneous courses first, then earlier slots.
pub fn clash_key(courses: &[CourseName], slot: &str, schedule: &Schedule) -> (Reverse<usize>, usize) {
    (
        Reverse(courses.len()),
        schedule.slot_index(slot).unwrap_or(usize::MAX),
    )
}

/// Everything wrong with one person's course selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionProblems {
    pub conflicts: Vec<Conflict>,
    pub missing: Vec<CourseName>,
}

impl SelectionProblems {
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty() && self.missing.is_empty()
    }

    pub fn count(&self) -> usize {
        self.conflicts.len() + self.missing.len()
    }
}

/// Checks a course selection against a schedule.
///
/// Courses that share a slot become one [`Conflict`] listing them in request
/// order. Courses with no slot are reported as missing, sorted by name.
/// Never fails: unknown courses are just missing.
pub fn problems_for_selection(courses: &[CourseRequest], schedule: &Schedule) -> SelectionProblems {
    let mut seen: HashSet<&str> = HashSet::new();
    // slot -> courses, in the order slots were first hit
    let mut timetable: Vec<(&Timeslot, Vec<CourseName>)> = Vec::new();
    let mut missing = Vec::new();

    for request in courses {
        let course = request.course.as_str();
        if !seen.insert(course) {
            continue;
        }
        let Some(slot) = schedule.slot_of(course) else {
            missing.push(course.to_string());
            continue;
        };
        match timetable.iter_mut().find(|(s, _)| *s == slot) {
            Some((_, in_slot)) => in_slot.push(course.to_string()),
            None => timetable.push((slot, vec![course.to_string()])),
        }
    }

    let mut conflicts: Vec<Conflict> = timetable
        .into_iter()
        .filter(|(_, in_slot)| in_slot.len() >= 2)
        .map(|(slot, in_slot)| Conflict {
            courses: in_slot,
            slot: slot.clone(),
        })
        .collect();

    conflicts.sort_by_key(|c| clash_key(&c.courses, &c.slot, schedule));
    missing.sort();

    SelectionProblems { conflicts, missing }
}
