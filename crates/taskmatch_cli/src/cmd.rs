//! Subcommand implementations. Each returns the JSON document to print, or
//! the reason that goes into the `{"error": ...}` envelope.

use std::path::Path;

use rusqlite::Connection;
use serde_json::{json, Value};
use taskmatch_core::{
    AssignmentService, DirectoryService, NewEmployee, PlanService, Project,
    SqliteAssignmentStore, SqliteDirectoryRepository, SqlitePlanRepository, TaskPlan,
};

pub type CmdResult = Result<Value, String>;

fn to_value<T: serde::Serialize>(value: T) -> CmdResult {
    serde_json::to_value(value).map_err(|err| err.to_string())
}

fn directory(conn: &Connection) -> Result<DirectoryService<SqliteDirectoryRepository<'_>>, String> {
    SqliteDirectoryRepository::try_new(conn)
        .map(DirectoryService::new)
        .map_err(|err| err.to_string())
}

fn plans(conn: &Connection) -> Result<PlanService<SqlitePlanRepository<'_>>, String> {
    SqlitePlanRepository::try_new(conn)
        .map(PlanService::new)
        .map_err(|err| err.to_string())
}

pub fn cmd_assign(conn: &Connection, project_id: i64) -> CmdResult {
    let store = SqliteAssignmentStore::try_new(conn).map_err(|err| err.to_string())?;
    let report = AssignmentService::new(store)
        .assign(project_id)
        .map_err(|err| err.reason())?;
    to_value(report)
}

pub fn cmd_project_add(
    conn: &Connection,
    project_id: i64,
    name: &str,
    description: &str,
    deadline: Option<&str>,
) -> CmdResult {
    let project = directory(conn)?
        .create_project(Project {
            project_id,
            project_name: name.to_string(),
            project_description: description.to_string(),
            deadline: deadline.map(str::to_string),
        })
        .map_err(|err| err.to_string())?;
    to_value(project)
}

pub fn cmd_project_join(conn: &Connection, project_id: i64, employee_id: i64) -> CmdResult {
    let joined = directory(conn)?
        .join_project(employee_id, project_id)
        .map_err(|err| err.to_string())?;
    Ok(json!({
        "project_id": project_id,
        "employee_id": employee_id,
        "joined": joined,
    }))
}

pub fn cmd_project_members(conn: &Connection, project_id: i64) -> CmdResult {
    let members = directory(conn)?
        .project_members(project_id)
        .map_err(|err| err.to_string())?;
    to_value(members)
}

pub fn cmd_project_show(conn: &Connection, project_id: i64) -> CmdResult {
    let overview = plans(conn)?
        .project_overview(project_id)
        .map_err(|err| err.to_string())?;
    to_value(overview)
}

pub fn cmd_project_progress(conn: &Connection, project_id: i64) -> CmdResult {
    let progress = plans(conn)?
        .project_progress(project_id)
        .map_err(|err| err.to_string())?;
    to_value(progress)
}

pub fn cmd_employee_add(conn: &Connection, email: &str, skills: &str, domains: &str) -> CmdResult {
    let employee = directory(conn)?
        .register_employee(NewEmployee {
            email: email.to_string(),
            skills: skills.to_string(),
            domains: domains.to_string(),
        })
        .map_err(|err| err.to_string())?;
    to_value(employee)
}

pub fn cmd_employee_add_skills(conn: &Connection, email: &str, skills: &str) -> CmdResult {
    let employee = directory(conn)?
        .add_skills(email, skills)
        .map_err(|err| err.to_string())?;
    to_value(employee)
}

pub fn cmd_employee_unassigned(conn: &Connection) -> CmdResult {
    let employees = directory(conn)?
        .unaffiliated_employees()
        .map_err(|err| err.to_string())?;
    to_value(employees)
}

pub fn cmd_plan_import(conn: &Connection, project_id: i64, file: &Path) -> CmdResult {
    let raw = std::fs::read_to_string(file)
        .map_err(|err| format!("failed to read {}: {err}", file.display()))?;
    let plan: TaskPlan = serde_json::from_str(&raw)
        .map_err(|err| format!("invalid plan file {}: {err}", file.display()))?;
    let summary = plans(conn)?
        .import_plan(project_id, &plan)
        .map_err(|err| err.to_string())?;
    to_value(summary)
}

pub fn cmd_milestone_complete(
    conn: &Connection,
    employee_id: i64,
    milestone_id: i64,
    message: &str,
) -> CmdResult {
    let outcome = plans(conn)?
        .complete_milestone(employee_id, milestone_id, message)
        .map_err(|err| err.to_string())?;
    to_value(outcome)
}
