use crate::data::{CourseRequest, PersonName, Preferences, Schedule};
use crate::error::ParseError;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

const EMPTY_CELL: &str = "-";
const UNAVAILABLE_CELL: &str = "X";
const SECTION_MARKER: &str = "===";

fn read(path: &Path) -> Result<String, ParseError> {
    fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Splits `course (comment)` into its parts.
fn parse_course_line(line: &str) -> CourseRequest {
    let line = line.trim();
    if let Some(body) = line.strip_suffix(')') {
        if let Some((course, comment)) = body.split_once('(') {
            let course = course.trim();
            if !course.is_empty() {
                return CourseRequest::with_comment(course, comment.trim());
            }
        }
    }
    CourseRequest::new(line)
}

/// Reads one person's courses: their name on the first line, one course per line after it.
pub fn parse_preferences(
    path: &Path,
    text: &str,
) -> Result<(PersonName, Vec<CourseRequest>), ParseError> {
    let mut lines = text.lines();
    let name = lines
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ParseError::MissingName {
            path: path.to_path_buf(),
        })?;

    let courses = lines
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(parse_course_line)
        .collect();
    Ok((name.to_string(), courses))
}

pub fn read_preference_file(path: &Path) -> Result<(PersonName, Vec<CourseRequest>), ParseError> {
    parse_preferences(path, &read(path)?)
}

/// Reads every `.txt` file in `dir`, in path order.
pub fn read_preference_dir(dir: &Path) -> Result<Preferences, ParseError> {
    let io_err = |source| ParseError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()
        .map_err(io_err)?;
    paths.retain(|p| p.extension().is_some_and(|ext| ext == "txt"));
    paths.sort();

    let mut preferences = Preferences::new();
    for path in &paths {
        let (name, courses) = read_preference_file(path)?;
        debug!("{} asks for {} courses", name, courses.len());
        preferences = preferences.with_person(name, courses);
    }
    info!("Read {} files from {}", paths.len(), dir.display());
    Ok(preferences)
}

fn split_schedule_line(line: &str) -> (&str, Vec<&str>) {
    let mut items = line.split('/').map(str::trim);
    let first = items.next().unwrap_or_default();
    (first, items.collect())
}

/// Parses a timetable with one column per teacher:
///
/// ```text
/// Timeslots / Smith / Jones
/// 9am       / Math  / Art
/// 10am      / -     / X
/// ```
///
/// `-` leaves a cell empty and `X` marks the teacher as unavailable. When the
/// text contains `===` lines, only the rows between the first two are read.
pub fn parse_schedule(path: &Path, text: &str) -> Result<Schedule, ParseError> {
    let mut lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .collect();
    if let Some(start) = lines.iter().position(|(_, l)| l.trim() == SECTION_MARKER) {
        let end = lines[start + 1..]
            .iter()
            .position(|(_, l)| l.trim() == SECTION_MARKER)
            .map_or(lines.len(), |offset| start + 1 + offset);
        lines = lines[start + 1..end].to_vec();
    }
    let mut lines = lines.into_iter().filter(|(_, l)| !l.trim().is_empty());

    let (_, header) = lines.next().ok_or_else(|| ParseError::MissingHeader {
        path: path.to_path_buf(),
    })?;
    let (_, teachers) = split_schedule_line(header);

    let mut schedule = Schedule::new();
    for (number, line) in lines {
        let (slot, cells) = split_schedule_line(line);
        if slot.is_empty() {
            return Err(ParseError::Malformed {
                path: path.to_path_buf(),
                line: number,
                reason: "missing timeslot name".to_string(),
            });
        }
        if cells.len() > teachers.len() {
            return Err(ParseError::Malformed {
                path: path.to_path_buf(),
                line: number,
                reason: format!("{} cells for {} teachers", cells.len(), teachers.len()),
            });
        }
        schedule.add_slot(slot);
        for (cell, teacher) in cells.iter().zip(&teachers) {
            match *cell {
                EMPTY_CELL | "" => {}
                UNAVAILABLE_CELL => schedule.add_blackout(*teacher, slot),
                course => {
                    schedule
                        .add(*teacher, course, slot)
                        .map_err(|source| ParseError::Schedule {
                            path: path.to_path_buf(),
                            line: number,
                            source,
                        })?
                }
            }
        }
    }
    info!(
        "Read schedule with {} timeslots and {} courses from {}",
        schedule.slot_order().len(),
        schedule.num_courses(),
        path.display()
    );
    Ok(schedule)
}

pub fn read_schedule_file(path: &Path) -> Result<Schedule, ParseError> {
    parse_schedule(path, &read(path)?)
}

/// One name per line.
pub fn read_class_list(path: &Path) -> Result<Vec<PersonName>, ParseError> {
    Ok(read(path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScheduleError;

    fn path() -> &'static Path {
        Path::new("test.txt")
    }

    #[test]
    fn preference_file_reads_name_courses_and_comments() {
        let text = "Jane Smith\nMath\n# a comment line\n  Art (if possible)  \n\nModern Dance\n";
        let (name, courses) = parse_preferences(path(), text).unwrap();
        assert_eq!(name, "Jane Smith");
        assert_eq!(
            courses,
            vec![
                CourseRequest::new("Math"),
                CourseRequest::with_comment("Art", "if possible"),
                CourseRequest::new("Modern Dance"),
            ]
        );
    }

    #[test]
    fn empty_preference_file_has_no_name() {
        let err = parse_preferences(path(), "").unwrap_err();
        assert!(matches!(err, ParseError::MissingName { .. }));
    }

    #[test]
    fn schedule_reads_cells_blanks_and_blackouts() {
        let text = "Timeslots / Smith / Jones\n\
                    9am / Math / Art\n\
                    10am / - / X\n\
                    11am / Science / -\n";
        let schedule = parse_schedule(path(), text).unwrap();
        assert_eq!(schedule.slot_order(), ["9am", "10am", "11am"]);
        assert_eq!(schedule.slot_of("Math").map(String::as_str), Some("9am"));
        assert_eq!(schedule.course_at("Jones", "9am").map(String::as_str), Some("Art"));
        assert!(schedule.is_blacked_out("Jones", "10am"));
        assert_eq!(schedule.num_courses(), 3);
    }

    #[test]
    fn schedule_between_markers_ignores_surrounding_text() {
        let text = "Solution #1, 0 conflicts:\n===\n\
                    Timeslots / Smith\n\
                    9am / Math\n\
                    ===\n\
                    COURSE CONFLICT: nonsense / here\n";
        let schedule = parse_schedule(path(), text).unwrap();
        assert_eq!(schedule.slot_order(), ["9am"]);
        assert_eq!(schedule.num_courses(), 1);
    }

    #[test]
    fn schedule_rejects_course_in_two_slots_with_line_number() {
        let text = "Timeslots / Smith / Jones\n9am / Math / -\n10am / - / Math\n";
        match parse_schedule(path(), text).unwrap_err() {
            ParseError::Schedule { line, source, .. } => {
                assert_eq!(line, 3);
                assert!(matches!(source, ScheduleError::DuplicateCourse { .. }));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn schedule_rejects_extra_cells() {
        let text = "Timeslots / Smith\n9am / Math / Art\n";
        let err = parse_schedule(path(), text).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { line: 2, .. }));
    }

    #[test]
    fn missing_header_is_an_error() {
        let err = parse_schedule(path(), "\n  \n").unwrap_err();
        assert!(matches!(err, ParseError::MissingHeader { .. }));
    }

    #[test]
    fn preference_dir_merges_txt_files_only() {
        let dir = std::env::temp_dir().join(format!("course-scheduler-prefs-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.txt"), "Ann Lee\nMath\n").unwrap();
        fs::write(dir.join("b.txt"), "Ann Lee\nArt\n").unwrap();
        fs::write(dir.join("c.txt"), "Bob Ray\nArt\n").unwrap();
        fs::write(dir.join(".DS_Store"), "junk").unwrap();

        let prefs = read_preference_dir(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(prefs.len(), 2);
        let ann: Vec<&str> = prefs
            .courses_of("Ann Lee")
            .unwrap()
            .iter()
            .map(|c| c.course.as_str())
            .collect();
        assert_eq!(ann, ["Math", "Art"]);
        assert_eq!(prefs.classlist("Art").unwrap().len(), 2);
    }
}
