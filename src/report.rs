use crate::conflicts::{Conflict, SelectionProblems, clash_key, problems_for_selection};
use crate::data::{CourseName, PersonName, Preferences, Schedule, Timeslot};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;

/// A conflict shared by everyone listed in `people`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupedConflict {
    pub people: Vec<PersonName>,
    pub courses: Vec<CourseName>,
    pub slot: Timeslot,
}

/// An unscheduled course and everyone who asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupedMissing {
    pub people: Vec<PersonName>,
    pub course: CourseName,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub conflicts: Vec<GroupedConflict>,
    pub missing: Vec<GroupedMissing>,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty() && self.missing.is_empty()
    }

    /// Number of (person, slot) clashes. A person with three courses in one
    /// slot counts once here, although the optimizer charges each of the three pairs.
    pub fn total_conflicts(&self) -> usize {
        self.conflicts.iter().map(|c| c.people.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonProblems {
    pub name: PersonName,
    #[serde(flatten)]
    pub problems: SelectionProblems,
}

/// The part of a "first last" name used for sorting.
pub fn last_name(name: &str) -> &str {
    name.split_once(' ').map_or(name, |(_, last)| last)
}

fn sort_by_last_name(people: &mut [PersonName]) {
    people.sort_by(|a, b| last_name(a).cmp(last_name(b)));
}

/// Merges identical conflicts and missing courses across everybody in `students`.
pub fn conflict_report(students: &Preferences, schedule: &Schedule) -> ConflictReport {
    let mut conflicts: HashMap<Conflict, Vec<PersonName>> = HashMap::new();
    let mut conflict_order: Vec<Conflict> = Vec::new();
    let mut missing: HashMap<CourseName, Vec<PersonName>> = HashMap::new();

    for (student, courses) in students.people() {
        let problems = problems_for_selection(courses, schedule);
        for conflict in problems.conflicts {
            let people = conflicts.entry(conflict.clone()).or_insert_with(|| {
                conflict_order.push(conflict);
                Vec::new()
            });
            people.push(student.clone());
        }
        for course in problems.missing {
            missing.entry(course).or_default().push(student.clone());
        }
    }

    let mut grouped_conflicts: Vec<GroupedConflict> = conflict_order
        .into_iter()
        .map(|conflict| {
            let mut people = conflicts.remove(&conflict).unwrap_or_default();
            sort_by_last_name(&mut people);
            GroupedConflict {
                people,
                courses: conflict.courses,
                slot: conflict.slot,
            }
        })
        .collect();
    grouped_conflicts
        .sort_by_key(|g| (Reverse(g.people.len()), clash_key(&g.courses, &g.slot, schedule)));

    let mut grouped_missing: Vec<GroupedMissing> = missing
        .into_iter()
        .map(|(course, mut people)| {
            sort_by_last_name(&mut people);
            GroupedMissing { people, course }
        })
        .collect();
    grouped_missing.sort_by(|a, b| {
        (Reverse(a.people.len()), &a.course).cmp(&(Reverse(b.people.len()), &b.course))
    });

    ConflictReport {
        conflicts: grouped_conflicts,
        missing: grouped_missing,
    }
}

/// Per-person problems, worst first. People without problems are left out.
pub fn person_report(students: &Preferences, schedule: &Schedule) -> Vec<PersonProblems> {
    let mut report: Vec<PersonProblems> = students
        .people()
        .map(|(name, courses)| PersonProblems {
            name: name.clone(),
            problems: problems_for_selection(courses, schedule),
        })
        .filter(|p| !p.problems.is_empty())
        .collect();

    report.sort_by(|a, b| {
        (Reverse(a.problems.count()), last_name(&a.name))
            .cmp(&(Reverse(b.problems.count()), last_name(&b.name)))
    });
    report
}
