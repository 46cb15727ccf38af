use crate::data::{CourseName, Preferences, Schedule, Timeslot};
use crate::error::ModelError;
use log::{debug, info, trace};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Values within this distance are treated as equal when checking a candidate assignment.
const TOLERANCE: f64 = 1e-4;

/// Index of a binary decision variable in a [`CompletionModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Eq,
    Le,
}

/// `Σ coefficient * var (sense) rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    fn new(name: String, terms: Vec<(VarId, f64)>, sense: Sense, rhs: f64) -> Self {
        Self {
            name,
            terms,
            sense,
            rhs,
        }
    }

    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coefficient)| coefficient * values[var.index()])
            .sum()
    }

    pub fn is_satisfied(&self, values: &[f64]) -> bool {
        let lhs = self.lhs(values);
        match self.sense {
            Sense::Eq => (lhs - self.rhs).abs() <= TOLERANCE,
            Sense::Le => lhs <= self.rhs + TOLERANCE,
        }
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.sense {
            Sense::Eq => "==",
            Sense::Le => "<=",
        };
        write!(f, "[{}] {} terms {} {}", self.name, self.terms.len(), op, self.rhs)
    }
}

/// The course completion problem as binary variables, a weighted objective to
/// minimise and linear constraints. Knows nothing about any particular solver.
///
/// `scheduled[slot, course]` variables occupy the dense block
/// `slot * courses.len() + course`; `conflict[course1, course2]` variables follow
/// and exist only for ordered pairs that share at least one student.
#[derive(Debug, Clone)]
pub struct CompletionModel {
    slots: Vec<Timeslot>,
    courses: Vec<CourseName>,
    conflicts: BTreeMap<(usize, usize), VarId>,
    objective: Vec<(VarId, f64)>,
    constraints: Vec<LinearConstraint>,
}

impl CompletionModel {
    /// Builds the model for completing `partial` with the courses in `offerings`
    /// so that the students in `students` clash as little as possible.
    pub fn build(
        offerings: &Preferences,
        students: &Preferences,
        partial: &Schedule,
    ) -> Result<Self, ModelError> {
        let slots: Vec<Timeslot> = partial.slot_order().to_vec();
        let courses: Vec<CourseName> = offerings.all_courses().cloned().collect();
        if slots.is_empty() {
            return Err(ModelError::NoSlots);
        }
        if courses.is_empty() {
            return Err(ModelError::NoCourses);
        }

        info!(
            "Setting up model with {} courses, {} timeslots and {} teachers...",
            courses.len(),
            slots.len(),
            offerings.len()
        );

        let mut model = Self {
            slots,
            courses,
            conflicts: BTreeMap::new(),
            objective: Vec::new(),
            constraints: Vec::new(),
        };

        model.add_conflict_objective(students);
        model.add_single_placement();
        model.add_teacher_non_overlap(offerings);
        model.add_conflict_linearization();
        model.add_pinned(partial)?;
        model.add_blackouts(offerings, partial);

        info!(
            "Model has {} variables ({} conflict indicators) and {} constraints.",
            model.num_variables(),
            model.conflicts.len(),
            model.constraints.len()
        );
        Ok(model)
    }

    fn add_conflict_objective(&mut self, students: &Preferences) {
        let mut next = self.slots.len() * self.courses.len();
        for (i, first) in self.courses.iter().enumerate() {
            for (j, second) in self.courses.iter().enumerate() {
                if i == j {
                    continue;
                }
                let overlap = students.overlap(first, second);
                if overlap == 0 {
                    continue;
                }
                let var = VarId(next);
                next += 1;
                self.conflicts.insert((i, j), var);
                // Each unordered pair has two ordered indicators.
                self.objective.push((var, overlap as f64 / 2.0));
                trace!("{} and {} share {} students", first, second, overlap);
            }
        }
        debug!(
            "Objective covers {} ordered course pairs with shared students.",
            self.conflicts.len()
        );
    }

    fn add_single_placement(&mut self) {
        info!("Adding 'course scheduled once' constraints...");
        for (c, course) in self.courses.iter().enumerate() {
            let terms = (0..self.slots.len())
                .map(|s| (self.scheduled(s, c), 1.0))
                .collect();
            self.constraints.push(LinearConstraint::new(
                format!("{} sched.", course),
                terms,
                Sense::Eq,
                1.0,
            ));
        }
    }

    fn add_teacher_non_overlap(&mut self, offerings: &Preferences) {
        info!("Adding 'no teacher overlap' constraints...");
        for (teacher, offered) in offerings.people() {
            let offered: BTreeSet<usize> = offered
                .iter()
                .filter_map(|request| self.course_index(&request.course))
                .collect();
            for (s, slot) in self.slots.iter().enumerate() {
                let terms = offered
                    .iter()
                    .map(|&c| (self.scheduled(s, c), 1.0))
                    .collect();
                self.constraints.push(LinearConstraint::new(
                    format!("{} no conf. at {}", teacher, slot),
                    terms,
                    Sense::Le,
                    1.0,
                ));
            }
        }
    }

    fn add_conflict_linearization(&mut self) {
        info!("Adding 'conflict indicator' constraints...");
        let pairs: Vec<((usize, usize), VarId)> =
            self.conflicts.iter().map(|(&pair, &var)| (pair, var)).collect();
        for ((first, second), conflict) in pairs {
            for (s, slot) in self.slots.iter().enumerate() {
                // scheduled[s, first] + scheduled[s, second] - 1 <= conflict
                self.constraints.push(LinearConstraint::new(
                    format!(
                        "{} and {} conf. at {}",
                        self.courses[first], self.courses[second], slot
                    ),
                    vec![
                        (self.scheduled(s, first), 1.0),
                        (self.scheduled(s, second), 1.0),
                        (conflict, -1.0),
                    ],
                    Sense::Le,
                    1.0,
                ));
            }
        }
    }

    fn add_pinned(&mut self, partial: &Schedule) -> Result<(), ModelError> {
        info!("Adding 'existing placement' constraints...");
        for placement in partial.placements() {
            let unknown = || ModelError::UnknownCourse {
                course: placement.course.clone(),
                slot: placement.slot.clone(),
            };
            let c = self.course_index(&placement.course).ok_or_else(unknown)?;
            let s = self.slot_index(&placement.slot).ok_or_else(unknown)?;
            debug!("{} pinned at {}", placement.course, placement.slot);
            self.constraints.push(LinearConstraint::new(
                format!("{} sched. at {}", placement.course, placement.slot),
                vec![(self.scheduled(s, c), 1.0)],
                Sense::Eq,
                1.0,
            ));
        }
        Ok(())
    }

    fn add_blackouts(&mut self, offerings: &Preferences, partial: &Schedule) {
        info!("Adding 'teacher unavailable' constraints...");
        for blackout in partial.blackouts() {
            let Some(offered) = offerings.courses_of(&blackout.teacher) else {
                debug!("{} is unavailable at {} but offers nothing", blackout.teacher, blackout.slot);
                continue;
            };
            let Some(s) = self.slot_index(&blackout.slot) else {
                continue;
            };
            let offered: BTreeSet<usize> = offered
                .iter()
                .filter_map(|request| self.course_index(&request.course))
                .collect();
            for c in offered {
                debug!(
                    "{} not at {} since {} is away",
                    self.courses[c], blackout.slot, blackout.teacher
                );
                self.constraints.push(LinearConstraint::new(
                    format!("{} not sched. at {}", self.courses[c], blackout.slot),
                    vec![(self.scheduled(s, c), 1.0)],
                    Sense::Eq,
                    0.0,
                ));
            }
        }
    }

    pub fn scheduled(&self, slot: usize, course: usize) -> VarId {
        VarId(slot * self.courses.len() + course)
    }

    pub fn slots(&self) -> &[Timeslot] {
        &self.slots
    }

    pub fn courses(&self) -> &[CourseName] {
        &self.courses
    }

    pub fn slot_index(&self, slot: &str) -> Option<usize> {
        self.slots.iter().position(|s| s == slot)
    }

    pub fn course_index(&self, course: &str) -> Option<usize> {
        self.courses.binary_search_by(|c| c.as_str().cmp(course)).ok()
    }

    pub fn num_variables(&self) -> usize {
        self.slots.len() * self.courses.len() + self.conflicts.len()
    }

    pub fn objective(&self) -> &[(VarId, f64)] {
        &self.objective
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .map(|(var, coefficient)| coefficient * values[var.index()])
            .sum()
    }

    pub fn violated_constraints<'a>(
        &'a self,
        values: &'a [f64],
    ) -> impl Iterator<Item = &'a LinearConstraint> + 'a {
        self.constraints.iter().filter(|c| !c.is_satisfied(values))
    }
}
