use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskmatch_core::{
    parse_project_id, AssignError, AssignmentService, DirectoryError, DirectoryService,
    MilestoneOutcome, NewEmployee, PlanError, PlanService, Project, RepoError,
    SqliteAssignmentStore, SqliteDirectoryRepository, SqlitePlanRepository, TaskPlan,
};

// ── Shared application state ──────────────────────────────────────────

/// One connection per process; each request holds the lock for its whole
/// unit of work, so writes never interleave.
pub struct AppState {
    pub conn: Mutex<Connection>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub project_id: i64,
    pub project_name: String,
    pub project_description: String,
    pub deadline: Option<String>,
}

#[derive(Deserialize)]
pub struct RegisterEmployeeRequest {
    pub email: String,
    #[serde(default)]
    pub skills: String,
    #[serde(default)]
    pub domains: String,
}

#[derive(Deserialize)]
pub struct AddSkillsRequest {
    pub email: String,
    pub skills: String,
}

#[derive(Deserialize)]
pub struct JoinProjectRequest {
    pub employee_id: i64,
}

#[derive(Deserialize)]
pub struct ConfirmTasksRequest {
    pub project_id: i64,
    #[serde(flatten)]
    pub plan: TaskPlan,
}

#[derive(Deserialize)]
pub struct LogMilestoneRequest {
    pub employee_id: i64,
    pub milestone_id: i64,
    pub message: String,
}

#[derive(Serialize)]
pub struct MilestoneResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub outcome: MilestoneOutcome,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                log::error!("event=http_error module=api status=error error={msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<AssignError> for ApiError {
    fn from(value: AssignError) -> Self {
        // Everything but malformed input is a 500 on this endpoint.
        if value.is_client_error() {
            ApiError::BadRequest(value.reason())
        } else {
            ApiError::Internal(value.reason())
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(value: DirectoryError) -> Self {
        match value {
            DirectoryError::InvalidInput(msg) => ApiError::BadRequest(msg),
            err @ DirectoryError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DirectoryError::Conflict(msg) => ApiError::Conflict(msg),
            DirectoryError::Repo(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<PlanError> for ApiError {
    fn from(value: PlanError) -> Self {
        match value {
            PlanError::InvalidInput(msg) => ApiError::BadRequest(msg),
            err @ PlanError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            err @ PlanError::AlreadyPlanned(_) => ApiError::Conflict(err.to_string()),
            PlanError::Conflict(msg) => ApiError::Conflict(msg),
            PlanError::Repo(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        ApiError::Internal(value.to_string())
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/assign_tasks", post(assign_tasks))
        .route("/api/projects", post(create_project))
        .route(
            "/api/projects/{id}/members",
            get(list_members).post(join_project),
        )
        .route("/api/employees", post(register_employee))
        .route("/api/employees/unassigned", get(unassigned_employees))
        .route("/api/add-skills", post(add_skills))
        .route("/api/confirm-tasks", post(confirm_tasks))
        .route("/api/log-milestone", post(log_milestone))
        .route("/api/project_details/{id}", get(project_details))
        .route("/api/project-progress/{id}", get(project_progress))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Runs `work` on the blocking pool while holding the connection lock.
async fn with_conn<T, F>(state: &SharedState, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, ApiError> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || {
        let conn = state
            .conn
            .lock()
            .map_err(|_| ApiError::Internal("Lock poisoned".into()))?;
        work(&conn)
    })
    .await
    .map_err(|err| ApiError::Internal(format!("request worker failed: {err}")))?
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|err| ApiError::BadRequest(format!("Invalid request body: {err}")))
}

fn parse_path_id(raw: &str, name: &str) -> Result<i64, ApiError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::BadRequest(format!("Invalid {name}"))),
    }
}

/// `project_id` may arrive as a JSON number or a numeric string.
/// Falsy values (`null`, `0`, `false`, `""`) count as missing.
fn raw_project_id(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("project_id")? {
        Value::Null | Value::Bool(false) => None,
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": taskmatch_core::core_version(),
    }))
}

async fn assign_tasks(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = parse_project_id(raw_project_id(&body).as_deref())?;
    let report = with_conn(&state, move |conn| {
        let store = SqliteAssignmentStore::try_new(conn)?;
        Ok(AssignmentService::new(store).assign(project_id)?)
    })
    .await?;
    Ok(Json(report))
}

async fn create_project(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: CreateProjectRequest = parse_json(&body)?;
    let project = with_conn(&state, move |conn| {
        let service = DirectoryService::new(SqliteDirectoryRepository::try_new(conn)?);
        Ok(service.create_project(Project {
            project_id: req.project_id,
            project_name: req.project_name,
            project_description: req.project_description,
            deadline: req.deadline,
        })?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn register_employee(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: RegisterEmployeeRequest = parse_json(&body)?;
    let employee = with_conn(&state, move |conn| {
        let service = DirectoryService::new(SqliteDirectoryRepository::try_new(conn)?);
        Ok(service.register_employee(NewEmployee {
            email: req.email,
            skills: req.skills,
            domains: req.domains,
        })?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

async fn add_skills(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: AddSkillsRequest = parse_json(&body)?;
    let employee = with_conn(&state, move |conn| {
        let service = DirectoryService::new(SqliteDirectoryRepository::try_new(conn)?);
        Ok(service.add_skills(&req.email, &req.skills)?)
    })
    .await?;
    Ok(Json(serde_json::json!({
        "message": "Skills updated successfully",
        "employee": employee,
    })))
}

async fn join_project(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = parse_path_id(&id, "project_id")?;
    let JoinProjectRequest { employee_id } = parse_json(&body)?;
    let joined = with_conn(&state, move |conn| {
        let service = DirectoryService::new(SqliteDirectoryRepository::try_new(conn)?);
        Ok(service.join_project(employee_id, project_id)?)
    })
    .await?;
    Ok(Json(serde_json::json!({
        "project_id": project_id,
        "employee_id": employee_id,
        "joined": joined,
    })))
}

async fn list_members(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = parse_path_id(&id, "project_id")?;
    let members = with_conn(&state, move |conn| {
        let service = DirectoryService::new(SqliteDirectoryRepository::try_new(conn)?);
        Ok(service.project_members(project_id)?)
    })
    .await?;
    Ok(Json(members))
}

async fn unassigned_employees(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, ApiError> {
    let employees = with_conn(&state, |conn| {
        let service = DirectoryService::new(SqliteDirectoryRepository::try_new(conn)?);
        Ok(service.unaffiliated_employees()?)
    })
    .await?;
    Ok(Json(employees))
}

async fn confirm_tasks(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: ConfirmTasksRequest = parse_json(&body)?;
    let summary = with_conn(&state, move |conn| {
        let service = PlanService::new(SqlitePlanRepository::try_new(conn)?);
        Ok(service.import_plan(req.project_id, &req.plan)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn log_milestone(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: LogMilestoneRequest = parse_json(&body)?;
    let outcome = with_conn(&state, move |conn| {
        let service = PlanService::new(SqlitePlanRepository::try_new(conn)?);
        Ok(service.complete_milestone(req.employee_id, req.milestone_id, &req.message)?)
    })
    .await?;

    let message = match (outcome.subtask_completed, outcome.follow_up.is_some()) {
        (false, _) => "Milestone logged successfully.",
        (true, true) => "Subtask completed, new subtask assigned.",
        (true, false) => "Subtask completed. No new subtask available based on skills and domains.",
    };
    Ok(Json(MilestoneResponse { message, outcome }))
}

async fn project_details(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = parse_path_id(&id, "project_id")?;
    let overview = with_conn(&state, move |conn| {
        let service = PlanService::new(SqlitePlanRepository::try_new(conn)?);
        Ok(service.project_overview(project_id)?)
    })
    .await?;
    Ok(Json(overview))
}

async fn project_progress(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = parse_path_id(&id, "project_id")?;
    let progress = with_conn(&state, move |conn| {
        let service = PlanService::new(SqlitePlanRepository::try_new(conn)?);
        Ok(service.project_progress(project_id)?)
    })
    .await?;
    Ok(Json(progress))
}

#[cfg(test)]
mod tests {
    use super::{parse_path_id, raw_project_id, ApiError};

    #[test]
    fn project_id_accepts_numbers_and_strings() {
        assert_eq!(raw_project_id(br#"{"project_id": 7}"#).as_deref(), Some("7"));
        assert_eq!(raw_project_id(br#"{"project_id": " 7 "}"#).as_deref(), Some(" 7 "));
        assert_eq!(raw_project_id(br#"{"project_id": 1.5}"#).as_deref(), Some("1.5"));
        assert_eq!(raw_project_id(br#"{"project_id": null}"#), None);
        assert_eq!(raw_project_id(br#"{}"#), None);
        assert_eq!(raw_project_id(b"not json"), None);
    }

    #[test]
    fn falsy_project_ids_count_as_missing() {
        assert_eq!(raw_project_id(br#"{"project_id": 0}"#), None);
        assert_eq!(raw_project_id(br#"{"project_id": 0.0}"#), None);
        assert_eq!(raw_project_id(br#"{"project_id": false}"#), None);
        assert_eq!(raw_project_id(br#"{"project_id": "0"}"#).as_deref(), Some("0"));
    }

    #[test]
    fn path_ids_must_be_positive_integers() {
        assert_eq!(parse_path_id("12", "project_id").unwrap(), 12);
        for raw in ["0", "-3", "abc", ""] {
            assert!(matches!(
                parse_path_id(raw, "project_id"),
                Err(ApiError::BadRequest(_))
            ));
        }
    }
}
