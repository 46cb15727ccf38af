use crate::data::{CourseName, PersonName, Preferences, Schedule, Timeslot};
use serde::Serialize;
use std::collections::HashSet;

/// Class list members already committed to `course`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseTakers {
    pub course: CourseName,
    pub students: Vec<PersonName>,
}

/// How a new section at `slot` would fit the class list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    pub slot: Timeslot,
    pub taken: Vec<CourseTakers>,
    pub free: Vec<PersonName>,
}

fn requests(students: &Preferences, name: &str, course: &str) -> bool {
    students
        .classlist(course)
        .is_some_and(|classlist| classlist.contains(name))
}

/// For each slot, who in `class_list` is busy with an already scheduled course
/// and who could attend an extra section there. Useful for splitting a large
/// class or adding a late offering.
pub fn section_availability(
    class_list: &[PersonName],
    students: &Preferences,
    schedule: &Schedule,
) -> Vec<SlotAvailability> {
    schedule
        .slot_order()
        .iter()
        .map(|slot| {
            let mut busy: HashSet<&PersonName> = HashSet::new();
            let taken = schedule
                .row(slot)
                .filter_map(|(_, course)| {
                    let takers: Vec<&PersonName> = class_list
                        .iter()
                        .filter(|name| requests(students, name, course))
                        .collect();
                    busy.extend(takers.iter().copied());
                    (!takers.is_empty()).then(|| CourseTakers {
                        course: course.clone(),
                        students: takers.into_iter().cloned().collect(),
                    })
                })
                .collect();
            let free = class_list
                .iter()
                .filter(|name| !busy.contains(name))
                .cloned()
                .collect();
            SlotAvailability {
                slot: slot.clone(),
                taken,
                free,
            }
        })
        .collect()
}
