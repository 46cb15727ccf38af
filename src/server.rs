use crate::config::Config;
use crate::data::{Blackout, CourseRequest, Placement, Preferences, Schedule, Timeslot};
use crate::error::{ScheduleError, SolveError};
use crate::report::{ConflictReport, PersonProblems, conflict_report, person_report};
use crate::solver::{HighsOptimizer, complete_schedule};
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

type ApiError = (StatusCode, String);

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersonInput {
    pub name: String,
    pub courses: Vec<CourseRequest>,
}

fn to_preferences(people: Vec<PersonInput>) -> Preferences {
    people
        .into_iter()
        .fold(Preferences::new(), |acc, p| acc.with_person(p.name, p.courses))
}

/// A schedule on the wire: slots in chronological order, placements and blackouts.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ScheduleDocument {
    #[serde(default)]
    pub slots: Vec<Timeslot>,
    #[serde(default)]
    pub placements: Vec<Placement>,
    #[serde(default)]
    pub blackouts: Vec<Blackout>,
}

impl ScheduleDocument {
    pub fn into_schedule(self) -> Result<Schedule, ScheduleError> {
        let mut schedule = Schedule::with_slots(self.slots);
        for p in self.placements {
            schedule.add(p.teacher, p.course, p.slot)?;
        }
        for b in self.blackouts {
            schedule.add_blackout(b.teacher, b.slot);
        }
        Ok(schedule)
    }
}

impl From<&Schedule> for ScheduleDocument {
    fn from(schedule: &Schedule) -> Self {
        Self {
            slots: schedule.slot_order().to_vec(),
            placements: schedule.placements(),
            blackouts: schedule.blackouts().collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveInput {
    pub offerings: Vec<PersonInput>,
    pub requests: Vec<PersonInput>,
    #[serde(default)]
    pub schedule: ScheduleDocument,
    pub time_limit_secs: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveOutput {
    pub schedule: ScheduleDocument,
    pub conflicts: f64,
    pub report: ConflictReport,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInput {
    pub requests: Vec<PersonInput>,
    pub schedule: ScheduleDocument,
    #[serde(default)]
    pub by_person: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CheckOutput {
    ByConflict(ConflictReport),
    ByPerson(Vec<PersonProblems>),
}

fn status_for(error: &SolveError) -> StatusCode {
    match error {
        SolveError::Model(_) => StatusCode::BAD_REQUEST,
        SolveError::Infeasible => StatusCode::UNPROCESSABLE_ENTITY,
        SolveError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
        SolveError::Solver(_) | SolveError::Schedule(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn bad_request(error: impl ToString) -> ApiError {
    (StatusCode::BAD_REQUEST, error.to_string())
}

fn solve(input: SolveInput, default_limit: Duration) -> Result<SolveOutput, ApiError> {
    let time_limit = match input.time_limit_secs {
        Some(secs) => Duration::try_from_secs_f64(secs)
            .ok()
            .filter(|limit| !limit.is_zero())
            .ok_or_else(|| bad_request(format!("invalid time limit {}", secs)))?,
        None => default_limit,
    };
    let offerings = to_preferences(input.offerings);
    let students = to_preferences(input.requests);
    let partial = input.schedule.into_schedule().map_err(bad_request)?;

    let completion = complete_schedule(
        &offerings,
        &students,
        &partial,
        &HighsOptimizer::default(),
        time_limit,
    )
    .map_err(|e| {
        warn!("Solve failed: {}", e);
        (status_for(&e), e.to_string())
    })?;

    Ok(SolveOutput {
        report: conflict_report(&students, &completion.schedule),
        schedule: ScheduleDocument::from(&completion.schedule),
        conflicts: completion.objective,
    })
}

async fn solve_handler(
    State(config): State<Config>,
    Json(input): Json<SolveInput>,
) -> Result<Json<SolveOutput>, ApiError> {
    let default_limit = config.time_limit;
    tokio::task::spawn_blocking(move || solve(input, default_limit))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map(Json)
}

async fn check_handler(Json(input): Json<CheckInput>) -> Result<Json<CheckOutput>, ApiError> {
    let students = to_preferences(input.requests);
    let schedule = input.schedule.into_schedule().map_err(bad_request)?;
    let output = if input.by_person {
        CheckOutput::ByPerson(person_report(&students, &schedule))
    } else {
        CheckOutput::ByConflict(conflict_report(&students, &schedule))
    };
    Ok(Json(output))
}

pub fn router(config: Config) -> Router {
    Router::new()
        .route("/v1/schedule/solve", post(solve_handler))
        .route("/v1/schedule/check", post(check_handler))
        .with_state(config)
}

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);
    axum::serve(listener, router(config)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
        let response = router(Config::default())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ));
        (status, value)
    }

    fn two_students() -> Value {
        json!([
            { "name": "Ann Lee", "courses": [{ "course": "Math" }, { "course": "Art" }] },
            { "name": "Bob Ray", "courses": [{ "course": "Art" }, { "course": "Science", "comment": "maybe" }] }
        ])
    }

    #[tokio::test]
    async fn check_groups_conflicts_and_missing_courses() {
        let (status, body) = post_json(
            "/v1/schedule/check",
            json!({
                "requests": two_students(),
                "schedule": {
                    "slots": ["9am", "10am"],
                    "placements": [
                        { "teacher": "Smith", "course": "Math", "slot": "9am" },
                        { "teacher": "Jones", "course": "Art", "slot": "9am" }
                    ]
                }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "conflicts": [{ "people": ["Ann Lee"], "courses": ["Math", "Art"], "slot": "9am" }],
                "missing": [{ "people": ["Bob Ray"], "course": "Science" }]
            })
        );
    }

    #[tokio::test]
    async fn check_by_person_lists_each_student() {
        let (status, body) = post_json(
            "/v1/schedule/check",
            json!({
                "requests": two_students(),
                "schedule": { "placements": [{ "teacher": "Smith", "course": "Math", "slot": "9am" }] },
                "byPerson": true
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Bob Ray", "Ann Lee"]);
        assert_eq!(body[0]["missing"], json!(["Art", "Science"]));
    }

    #[tokio::test]
    async fn check_rejects_course_in_two_slots() {
        let (status, _) = post_json(
            "/v1/schedule/check",
            json!({
                "requests": [],
                "schedule": {
                    "placements": [
                        { "teacher": "Smith", "course": "Math", "slot": "9am" },
                        { "teacher": "Smith", "course": "Math", "slot": "10am" }
                    ]
                }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn solve_completes_partial_schedule() {
        let (status, body) = post_json(
            "/v1/schedule/solve",
            json!({
                "offerings": [
                    { "name": "Smith", "courses": [{ "course": "Math" }, { "course": "Science" }] },
                    { "name": "Jones", "courses": [{ "course": "Art" }] }
                ],
                "requests": two_students(),
                "schedule": {
                    "slots": ["9am", "10am"],
                    "placements": [{ "teacher": "Smith", "course": "Math", "slot": "9am" }],
                    "blackouts": [{ "teacher": "Jones", "slot": "9am" }]
                },
                "timeLimitSecs": 30.0
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{body}");
        let placements = body["schedule"]["placements"].as_array().unwrap();
        assert_eq!(placements.len(), 3);
        assert!(placements.contains(&json!({ "teacher": "Smith", "course": "Math", "slot": "9am" })));
        assert!(placements.contains(&json!({ "teacher": "Jones", "course": "Art", "slot": "10am" })));
        assert!(placements.contains(&json!({ "teacher": "Smith", "course": "Science", "slot": "10am" })));
        // Bob's Art and Science cannot be split: Jones is away at 9am and Smith has Math then.
        assert_eq!(body["conflicts"].as_f64(), Some(1.0));
        assert_eq!(body["schedule"]["blackouts"], json!([{ "teacher": "Jones", "slot": "9am" }]));
    }

    #[tokio::test]
    async fn solve_reports_infeasible_as_unprocessable() {
        let (status, _) = post_json(
            "/v1/schedule/solve",
            json!({
                "offerings": [{ "name": "Smith", "courses": [{ "course": "Math" }, { "course": "Art" }] }],
                "requests": [],
                "schedule": { "slots": ["9am"] },
                "timeLimitSecs": 30.0
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn solve_rejects_bad_time_limit() {
        let (status, body) = post_json(
            "/v1/schedule/solve",
            json!({
                "offerings": [{ "name": "Smith", "courses": [{ "course": "Math" }] }],
                "requests": [],
                "schedule": { "slots": ["9am"] },
                "timeLimitSecs": -1.0
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, Value::String("invalid time limit -1".to_string()));
    }

    #[tokio::test]
    async fn solve_rejects_time_limit_too_long_to_represent() {
        let (status, body) = post_json(
            "/v1/schedule/solve",
            json!({
                "offerings": [{ "name": "Smith", "courses": [{ "course": "Math" }] }],
                "requests": [],
                "schedule": { "slots": ["9am"] },
                "timeLimitSecs": 1e30
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.as_str().unwrap().starts_with("invalid time limit"));
    }
}
