use crate::data::{Preferences, Schedule};
use crate::error::SolveError;
use crate::model::{CompletionModel, Sense, VarId};
use good_lp::variable;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, constraint,
    default_solver,
};
use log::{debug, info, warn};
use std::time::{Duration, Instant};

/// Variable values returned by an optimizer, indexed by [`VarId`].
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub values: Vec<f64>,
    pub objective: f64,
}

impl Assignment {
    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.index()]
    }

    pub fn is_set(&self, var: VarId) -> bool {
        self.value(var) > 0.9
    }
}

/// Anything that can minimise a [`CompletionModel`] within a time budget.
pub trait Optimizer {
    fn solve(&self, model: &CompletionModel, time_budget: Duration)
    -> Result<Assignment, SolveError>;
}

/// Solves the model with the HiGHS MIP solver through good_lp.
#[derive(Debug, Clone)]
pub struct HighsOptimizer {
    pub random_seed: i32,
    pub log_to_console: bool,
}

impl Default for HighsOptimizer {
    fn default() -> Self {
        Self {
            random_seed: 1234,
            log_to_console: false,
        }
    }
}

impl Optimizer for HighsOptimizer {
    fn solve(
        &self,
        model: &CompletionModel,
        time_budget: Duration,
    ) -> Result<Assignment, SolveError> {
        let start_time = Instant::now();
        let mut problem = ProblemVariables::new();
        let vars = problem.add_vector(variable().binary(), model.num_variables());

        let objective: Expression = model
            .objective()
            .iter()
            .map(|(var, weight)| *weight * vars[var.index()])
            .sum();

        let mut lp = problem
            .minimise(objective)
            .using(default_solver)
            .set_option("threads", 1) // limit to 1 thread for reproducibility
            .set_option("random_seed", self.random_seed)
            .set_option("time_limit", time_budget.as_secs_f64())
            .set_option("log_to_console", self.log_to_console);

        for linear in model.constraints() {
            let lhs: Expression = linear
                .terms
                .iter()
                .map(|(var, coefficient)| *coefficient * vars[var.index()])
                .sum();
            let rhs = linear.rhs;
            match linear.sense {
                Sense::Eq => lp.add_constraint(constraint!(lhs == rhs)),
                Sense::Le => lp.add_constraint(constraint!(lhs <= rhs)),
            };
        }

        info!(
            "Starting HiGHS with a budget of {:.1}s...",
            time_budget.as_secs_f64()
        );
        let solution = match lp.solve() {
            Ok(s) => s,
            // All variables are binary, so "unbounded" can only mean no feasible point.
            Err(ResolutionError::Infeasible | ResolutionError::Unbounded) => {
                return Err(SolveError::Infeasible);
            }
            Err(e) => return Err(SolveError::Solver(e.to_string())),
        };
        let elapsed = start_time.elapsed();

        // Binary variables come back within the solver's integrality tolerance.
        let values: Vec<f64> = vars.iter().map(|var| solution.value(*var).round()).collect();
        check_solution(model, values, elapsed, time_budget)
    }
}

/// Accepts solver output only if it satisfies every constraint. A broken
/// solution once the budget is spent means the solver stopped early.
fn check_solution(
    model: &CompletionModel,
    values: Vec<f64>,
    elapsed: Duration,
    time_budget: Duration,
) -> Result<Assignment, SolveError> {
    let violated: Vec<_> = model.violated_constraints(&values).collect();
    if let Some(first) = violated.first() {
        warn!(
            "Solver returned {} violated constraints, first {}",
            violated.len(),
            first
        );
        if elapsed >= time_budget {
            return Err(SolveError::TimedOut(time_budget.as_secs_f64()));
        }
        return Err(SolveError::Solver(format!("solution violates {}", first.name)));
    }

    let objective = model.objective_value(&values);
    info!("Solution found in {:.2?} with objective {}", elapsed, objective);
    Ok(Assignment { values, objective })
}

/// A completed schedule and the weighted conflict count it achieves.
#[derive(Debug, Clone)]
pub struct Completion {
    pub schedule: Schedule,
    pub objective: f64,
}

/// Fills the gaps in `partial` so that students' courses clash as little as possible.
pub fn complete_schedule(
    offerings: &Preferences,
    students: &Preferences,
    partial: &Schedule,
    optimizer: &impl Optimizer,
    time_budget: Duration,
) -> Result<Completion, SolveError> {
    let model = CompletionModel::build(offerings, students, partial)?;
    let assignment = optimizer.solve(&model, time_budget)?;
    let schedule = materialize(&model, &assignment, offerings, partial)?;
    Ok(Completion {
        schedule,
        objective: assignment.objective,
    })
}

/// Turns solved `scheduled` variables into a new schedule, crediting each course
/// to the first teacher (by name) who offers it.
pub fn materialize(
    model: &CompletionModel,
    assignment: &Assignment,
    offerings: &Preferences,
    partial: &Schedule,
) -> Result<Schedule, SolveError> {
    let mut schedule = Schedule::with_slots(partial.slot_order().iter().cloned());
    for (s, slot) in model.slots().iter().enumerate() {
        for (c, course) in model.courses().iter().enumerate() {
            if !assignment.is_set(model.scheduled(s, c)) {
                continue;
            }
            let Some(teacher) = offerings.first_offering(course) else {
                warn!("{} was placed at {} but nobody offers it", course, slot);
                continue;
            };
            debug!("{} teaches {} at {}", teacher, course, slot);
            schedule.add(teacher.clone(), course.clone(), slot.clone())?;
        }
    }
    schedule.carry_blackouts_from(partial);
    Ok(schedule)
}
