use crate::error::ScheduleError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

// Type aliases for clarity
pub type PersonName = String;
pub type CourseName = String;
pub type TeacherName = String;
pub type Timeslot = String;

/// One requested (or offered) course, with the free-text comment from the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct CourseRequest {
    pub course: CourseName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl CourseRequest {
    pub fn new(course: impl Into<CourseName>) -> Self {
        Self {
            course: course.into(),
            comment: None,
        }
    }

    pub fn with_comment(course: impl Into<CourseName>, comment: impl Into<String>) -> Self {
        Self {
            course: course.into(),
            comment: Some(comment.into()),
        }
    }
}

/// Course lists keyed by person. Holds student requests as well as teacher offerings.
///
/// Built by consuming operations so merging several sources never mutates a
/// value somebody else is still reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    people: BTreeMap<PersonName, Vec<CourseRequest>>,
    classes: BTreeMap<CourseName, BTreeSet<PersonName>>,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a person's courses. A name seen before gets the new courses appended.
    pub fn with_person(
        mut self,
        name: impl Into<PersonName>,
        courses: impl IntoIterator<Item = CourseRequest>,
    ) -> Self {
        let name = name.into();
        let courses: Vec<CourseRequest> = courses.into_iter().collect();
        for request in &courses {
            self.classes
                .entry(request.course.clone())
                .or_default()
                .insert(name.clone());
        }
        self.people.entry(name).or_default().extend(courses);
        self
    }

    pub fn merge(self, other: Preferences) -> Self {
        other
            .people
            .into_iter()
            .fold(self, |acc, (name, courses)| acc.with_person(name, courses))
    }

    pub fn people(&self) -> impl Iterator<Item = (&PersonName, &[CourseRequest])> {
        self.people.iter().map(|(name, courses)| (name, courses.as_slice()))
    }

    pub fn courses_of(&self, name: &str) -> Option<&[CourseRequest]> {
        self.people.get(name).map(Vec::as_slice)
    }

    /// Everyone who asked for `course`.
    pub fn classlist(&self, course: &str) -> Option<&BTreeSet<PersonName>> {
        self.classes.get(course)
    }

    /// Distinct course names mentioned by anyone, in name order.
    pub fn all_courses(&self) -> impl Iterator<Item = &CourseName> {
        self.classes.keys()
    }

    /// Number of distinct people who requested both courses.
    pub fn overlap(&self, first: &str, second: &str) -> usize {
        match (self.classes.get(first), self.classes.get(second)) {
            (Some(a), Some(b)) => a.intersection(b).count(),
            _ => 0,
        }
    }

    /// First person, in name order, whose list contains `course`.
    pub fn first_offering(&self, course: &str) -> Option<&PersonName> {
        self.people
            .iter()
            .find(|(_, courses)| courses.iter().any(|c| c.course == course))
            .map(|(name, _)| name)
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }
}

/// A single (teacher, course, slot) placement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Placement {
    pub teacher: TeacherName,
    pub course: CourseName,
    pub slot: Timeslot,
}

/// A teacher who cannot come in at a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Blackout {
    pub teacher: TeacherName,
    pub slot: Timeslot,
}

/// A possibly partial timetable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    slot_order: Vec<Timeslot>,
    timeslots: HashMap<Timeslot, BTreeMap<TeacherName, CourseName>>,
    courses: HashMap<CourseName, Timeslot>,
    blackouts: BTreeMap<TeacherName, BTreeSet<Timeslot>>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slots<I, S>(slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Timeslot>,
    {
        let mut schedule = Self::new();
        for slot in slots {
            schedule.add_slot(slot);
        }
        schedule
    }

    /// Records a slot at the end of the chronological order unless already known.
    pub fn add_slot(&mut self, slot: impl Into<Timeslot>) {
        let slot = slot.into();
        if !self.slot_order.contains(&slot) {
            self.slot_order.push(slot);
        }
    }

    pub fn add(
        &mut self,
        teacher: impl Into<TeacherName>,
        course: impl Into<CourseName>,
        slot: impl Into<Timeslot>,
    ) -> Result<(), ScheduleError> {
        let (teacher, course, slot) = (teacher.into(), course.into(), slot.into());

        if let Some(existing) = self.courses.get(&course) {
            if *existing != slot {
                return Err(ScheduleError::DuplicateCourse {
                    course,
                    existing: existing.clone(),
                    slot,
                });
            }
        }
        if let Some(existing) = self.timeslots.get(&slot).and_then(|row| row.get(&teacher)) {
            if *existing == course {
                return Ok(());
            }
            return Err(ScheduleError::TeacherDoubleBooked {
                teacher,
                existing: existing.clone(),
                course,
                slot,
            });
        }
        if self.courses.contains_key(&course) {
            let existing = self
                .row(&slot)
                .find(|(_, c)| **c == course)
                .map(|(t, _)| t.clone())
                .unwrap_or_default();
            return Err(ScheduleError::CourseTaughtTwice {
                course,
                existing,
                teacher,
                slot,
            });
        }

        self.add_slot(slot.clone());
        self.courses.insert(course.clone(), slot.clone());
        self.timeslots.entry(slot).or_default().insert(teacher, course);
        Ok(())
    }

    pub fn add_blackout(&mut self, teacher: impl Into<TeacherName>, slot: impl Into<Timeslot>) {
        let slot = slot.into();
        self.add_slot(slot.clone());
        self.blackouts.entry(teacher.into()).or_default().insert(slot);
    }

    pub fn slot_order(&self) -> &[Timeslot] {
        &self.slot_order
    }

    pub fn slot_index(&self, slot: &str) -> Option<usize> {
        self.slot_order.iter().position(|s| s == slot)
    }

    pub fn slot_of(&self, course: &str) -> Option<&Timeslot> {
        self.courses.get(course)
    }

    pub fn course_at(&self, teacher: &str, slot: &str) -> Option<&CourseName> {
        self.timeslots.get(slot).and_then(|row| row.get(teacher))
    }

    /// Teacher to course map for one slot, empty when nothing is placed there.
    pub fn row(&self, slot: &str) -> impl Iterator<Item = (&TeacherName, &CourseName)> {
        self.timeslots.get(slot).into_iter().flat_map(|row| row.iter())
    }

    pub fn is_blacked_out(&self, teacher: &str, slot: &str) -> bool {
        self.blackouts
            .get(teacher)
            .is_some_and(|slots| slots.contains(slot))
    }

    pub fn blackouts(&self) -> impl Iterator<Item = Blackout> + '_ {
        self.blackouts.iter().flat_map(|(teacher, slots)| {
            slots.iter().map(move |slot| Blackout {
                teacher: teacher.clone(),
                slot: slot.clone(),
            })
        })
    }

    /// All placements, in slot order and then teacher name order.
    pub fn placements(&self) -> Vec<Placement> {
        self.slot_order
            .iter()
            .flat_map(|slot| {
                self.row(slot).map(move |(teacher, course)| Placement {
                    teacher: teacher.clone(),
                    course: course.clone(),
                    slot: slot.clone(),
                })
            })
            .collect()
    }

    /// Every teacher who appears in a placement or a blackout, in name order.
    pub fn teachers(&self) -> BTreeSet<&TeacherName> {
        self.timeslots
            .values()
            .flat_map(|row| row.keys())
            .chain(self.blackouts.keys())
            .collect()
    }

    pub fn num_courses(&self) -> usize {
        self.courses.len()
    }

    pub fn carry_blackouts_from(&mut self, other: &Schedule) {
        for blackout in other.blackouts() {
            self.add_blackout(blackout.teacher, blackout.slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_person_concatenates_and_indexes_classes() {
        let prefs = Preferences::new()
            .with_person("Jane Smith", [CourseRequest::new("Math"), CourseRequest::new("Art")])
            .with_person("Jane Smith", [CourseRequest::with_comment("Math", "again")])
            .with_person("Bob Jones", [CourseRequest::new("Art")]);

        let jane = prefs.courses_of("Jane Smith").unwrap();
        assert_eq!(jane.len(), 3);
        assert_eq!(jane[2].comment.as_deref(), Some("again"));
        assert_eq!(prefs.classlist("Math").unwrap().len(), 1);
        assert_eq!(prefs.classlist("Art").unwrap().len(), 2);
        assert_eq!(prefs.overlap("Math", "Art"), 1);
        assert_eq!(prefs.overlap("Math", "Drama"), 0);
    }

    #[test]
    fn merge_keeps_both_sources() {
        let a = Preferences::new().with_person("Ann Lee", [CourseRequest::new("Math")]);
        let b = Preferences::new()
            .with_person("Ann Lee", [CourseRequest::new("Art")])
            .with_person("Cal Moe", [CourseRequest::new("Art")]);
        let merged = a.merge(b);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.courses_of("Ann Lee").unwrap().len(), 2);
        assert_eq!(merged.overlap("Math", "Art"), 1);
    }

    #[test]
    fn first_offering_uses_name_order() {
        let offerings = Preferences::new()
            .with_person("Zed", [CourseRequest::new("Math")])
            .with_person("Amy", [CourseRequest::new("Math")]);
        assert_eq!(offerings.first_offering("Math").map(String::as_str), Some("Amy"));
        assert!(offerings.first_offering("Art").is_none());
    }

    #[test]
    fn add_records_slots_in_first_seen_order() {
        let mut schedule = Schedule::with_slots(["9am", "10am"]);
        schedule.add("Smith", "Math", "11am").unwrap();
        schedule.add("Jones", "Art", "9am").unwrap();
        assert_eq!(schedule.slot_order(), ["9am", "10am", "11am"]);
        assert_eq!(schedule.slot_index("11am"), Some(2));
        assert_eq!(schedule.slot_of("Art").map(String::as_str), Some("9am"));
        assert_eq!(schedule.course_at("Smith", "11am").map(String::as_str), Some("Math"));
    }

    #[test]
    fn add_rejects_course_in_two_slots() {
        let mut schedule = Schedule::new();
        schedule.add("Smith", "Math", "9am").unwrap();
        let err = schedule.add("Jones", "Math", "10am").unwrap_err();
        assert!(matches!(err, ScheduleError::DuplicateCourse { .. }));
        assert_eq!(schedule.num_courses(), 1);
    }

    #[test]
    fn add_names_the_teacher_already_giving_the_course() {
        let mut schedule = Schedule::new();
        schedule.add("Smith", "Math", "9am").unwrap();
        let err = schedule.add("Jones", "Math", "9am").unwrap_err();
        assert_eq!(
            err,
            ScheduleError::CourseTaughtTwice {
                course: "Math".into(),
                existing: "Smith".into(),
                teacher: "Jones".into(),
                slot: "9am".into(),
            }
        );
        assert_eq!(
            err.to_string(),
            "Math is already taught by Smith at 9am, cannot also give it to Jones"
        );
        assert_eq!(schedule.num_courses(), 1);
    }

    #[test]
    fn add_rejects_teacher_double_booking_but_allows_repeat() {
        let mut schedule = Schedule::new();
        schedule.add("Smith", "Math", "9am").unwrap();
        schedule.add("Smith", "Math", "9am").unwrap();
        let err = schedule.add("Smith", "Art", "9am").unwrap_err();
        assert!(matches!(err, ScheduleError::TeacherDoubleBooked { .. }));
    }

    #[test]
    fn blackouts_are_independent_of_placements() {
        let mut schedule = Schedule::with_slots(["9am"]);
        schedule.add_blackout("Smith", "10am");
        assert!(schedule.is_blacked_out("Smith", "10am"));
        assert!(!schedule.is_blacked_out("Smith", "9am"));
        assert_eq!(schedule.num_courses(), 0);
        assert_eq!(schedule.slot_order(), ["9am", "10am"]);
        assert_eq!(schedule.teachers().len(), 1);
    }

    #[test]
    fn blackouts_are_listed_per_teacher_then_slot() {
        let mut schedule = Schedule::with_slots(["9am", "10am"]);
        schedule.add_blackout("Smith", "10am");
        schedule.add_blackout("Jones", "9am");
        schedule.add_blackout("Smith", "9am");
        schedule.add_blackout("Smith", "9am");
        let listed: Vec<(String, String)> = schedule
            .blackouts()
            .map(|b| (b.teacher, b.slot))
            .collect();
        assert_eq!(
            listed,
            [
                ("Jones".to_string(), "9am".to_string()),
                ("Smith".to_string(), "10am".to_string()),
                ("Smith".to_string(), "9am".to_string()),
            ]
        );
        assert!(!schedule.is_blacked_out("Jones", "10am"));
        assert!(!schedule.is_blacked_out("Lee", "9am"));

        let mut copy = Schedule::with_slots(["9am", "10am"]);
        copy.carry_blackouts_from(&schedule);
        assert!(copy.is_blacked_out("Smith", "10am"));
        assert_eq!(copy.blackouts().count(), 3);
    }
}
