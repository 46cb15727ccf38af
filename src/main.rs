mod config;
mod conflicts;
mod data;
mod error;
mod format;
mod model;
mod parser;
mod report;
mod sections;
mod server;
mod solver;

use clap::{Parser, Subcommand};
use config::{Config, parse_time_limit};
use data::{Preferences, Schedule};
use error::ParseError;
use log::{info, warn};
use parser::{read_class_list, read_preference_dir, read_schedule_file};
use solver::{HighsOptimizer, complete_schedule};
use std::error::Error;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(version, about = "Completes course timetables and reports student conflicts")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the JSON API
    Serve {
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
    /// Report conflicts in a (possibly partial) schedule
    Check {
        students: PathBuf,
        schedule: PathBuf,
        /// More student preference directories to merge in
        #[arg(long = "also")]
        more_students: Vec<PathBuf>,
        /// Group the report by student instead of by conflict
        #[arg(short = 's', long)]
        by_student: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fill in a partial schedule with as few student conflicts as possible
    Solve {
        students: PathBuf,
        teachers: PathBuf,
        schedule: PathBuf,
        #[arg(long = "also")]
        more_students: Vec<PathBuf>,
        /// Solver time budget in seconds
        #[arg(short = 't', long, value_parser = parse_seconds)]
        time_limit: Option<Duration>,
        #[arg(short = 's', long)]
        by_student: bool,
    },
    /// Show which slots could host an extra section for a class list
    Sections {
        students: PathBuf,
        class_list: PathBuf,
        schedule: PathBuf,
    },
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    parse_time_limit(raw).ok_or_else(|| format!("{raw} is not a positive number of seconds"))
}

/// Reads and merges student preference directories, in order.
fn read_students(first: &Path, more: &[PathBuf]) -> Result<Preferences, ParseError> {
    let mut students = read_preference_dir(first)?;
    for dir in more {
        students = students.merge(read_preference_dir(dir)?);
    }
    if students.is_empty() {
        warn!("No student preferences found in {}", first.display());
    }
    Ok(students)
}

fn print_report(students: &Preferences, schedule: &Schedule, by_student: bool) {
    if by_student {
        let report = report::person_report(students, schedule);
        if report.is_empty() {
            println!("No conflicts.");
            return;
        }
        print!("{}", format::format_person_report(&report));
    } else {
        let report = report::conflict_report(students, schedule);
        if report.is_empty() {
            println!("No conflicts.");
            return;
        }
        info!("{} student conflicts in total", report.total_conflicts());
        print!("{}", format::format_conflict_report(&report));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config::log_filter()))
        .init();

    let args = Args::parse();
    let mut config = Config::from_env();

    match args.command.unwrap_or(Command::Serve { addr: None }) {
        Command::Serve { addr } => {
            if let Some(addr) = addr {
                config.addr = addr;
            }
            server::run_server(config).await?;
        }
        Command::Check {
            students,
            schedule,
            more_students,
            by_student,
            json,
        } => {
            let students = read_students(&students, &more_students)?;
            let schedule = read_schedule_file(&schedule)?;
            if !json {
                print_report(&students, &schedule, by_student);
            } else if by_student {
                let report = report::person_report(&students, &schedule);
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let report = report::conflict_report(&students, &schedule);
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Command::Solve {
            students,
            teachers,
            schedule,
            more_students,
            time_limit,
            by_student,
        } => {
            let students = read_students(&students, &more_students)?;
            let offerings = read_preference_dir(&teachers)?;
            let partial = read_schedule_file(&schedule)?;
            let time_limit = time_limit.unwrap_or(config.time_limit);

            let completion = tokio::task::spawn_blocking(move || {
                complete_schedule(
                    &offerings,
                    &students,
                    &partial,
                    &HighsOptimizer::default(),
                    time_limit,
                )
                .map(|completion| (completion, offerings, students))
            })
            .await?;
            let (completion, offerings, students) = completion?;

            println!();
            print!(
                "{}",
                format::format_solution(1, completion.objective, &offerings, &completion.schedule)
            );
            println!();
            print_report(&students, &completion.schedule, by_student);
        }
        Command::Sections {
            students,
            class_list,
            schedule,
        } => {
            let students = read_preference_dir(&students)?;
            let class_list = read_class_list(&class_list)?;
            let schedule = read_schedule_file(&schedule)?;
            let slots = sections::section_availability(&class_list, &students, &schedule);
            print!("{}", format::format_section_availability(&class_list, &slots));
        }
    }
    Ok(())
}
