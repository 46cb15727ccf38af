use std::path::PathBuf;
use thiserror::Error;

/// Violations of the schedule invariants while adding assignments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("course {course} is already scheduled at {existing}, cannot also place it at {slot}")]
    DuplicateCourse {
        course: String,
        existing: String,
        slot: String,
    },
    #[error("{course} is already taught by {existing} at {slot}, cannot also give it to {teacher}")]
    CourseTaughtTwice {
        course: String,
        existing: String,
        teacher: String,
        slot: String,
    },
    #[error("{teacher} already teaches {existing} at {slot}, cannot also teach {course}")]
    TeacherDoubleBooked {
        teacher: String,
        existing: String,
        course: String,
        slot: String,
    },
}

/// Problems reading preference, schedule or class list files.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: file is empty, expected a name on the first line")]
    MissingName { path: PathBuf },
    #[error("{path}: missing header line")]
    MissingHeader { path: PathBuf },
    #[error("{path}:{line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("{path}:{line}: {source}")]
    Schedule {
        path: PathBuf,
        line: usize,
        #[source]
        source: ScheduleError,
    },
}

/// Problems turning the inputs into an optimization model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("no timeslots are known, nothing to schedule into")]
    NoSlots,
    #[error("no teacher offers any course")]
    NoCourses,
    #[error("{course} is scheduled at {slot} but no teacher offers it")]
    UnknownCourse { course: String, slot: String },
}

/// Terminal outcome of a failed solve.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("the model is infeasible")]
    Infeasible,
    #[error("no solution found within {0:.1} seconds")]
    TimedOut(f64),
    #[error("solver error: {0}")]
    Solver(String),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}
