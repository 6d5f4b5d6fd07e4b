//! Directory use-case service: projects, employees and memberships.
//!
//! # Responsibility
//! - Validate and normalize directory input before it reaches storage.
//! - Translate repository failures into caller-facing error kinds.
//!
//! # Invariants
//! - Emails are trimmed and lowercased before lookup or insert.
//! - Joining a project twice is a no-op.

use crate::model::directory::{Candidate, CandidateId, Project, ProjectId};
use crate::repo::directory_repo::DirectoryRepository;
use crate::repo::RepoError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}$"));

/// Service error for directory use-cases.
#[derive(Debug)]
pub enum DirectoryError {
    /// Caller input failed validation.
    InvalidInput(String),
    /// Referenced project or employee does not exist.
    NotFound { entity: &'static str, key: String },
    /// Duplicate project id or email.
    Conflict(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl DirectoryError {
    fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "{message}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Conflict(message) => write!(f, "{message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for DirectoryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, key } => Self::NotFound { entity, key },
            RepoError::Conflict(message) => Self::Conflict(message),
            other => Self::Repo(other),
        }
    }
}

/// Input for registering one employee.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEmployee {
    pub email: String,
    pub skills: String,
    pub domains: String,
}

/// Normalizes an email address, rejecting anything that is not `local@host.tld`.
pub fn normalize_email(raw: &str) -> Result<String, DirectoryError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(DirectoryError::InvalidInput("email is required".to_string()));
    }
    let pattern = EMAIL_RE.as_ref().map_err(|err| {
        DirectoryError::InvalidInput(format!("email validation unavailable: {err}"))
    })?;
    if !pattern.is_match(&email) {
        return Err(DirectoryError::InvalidInput(format!(
            "invalid email address: `{}`",
            raw.trim()
        )));
    }
    Ok(email)
}

/// Directory service facade over repository implementations.
pub struct DirectoryService<R: DirectoryRepository> {
    repo: R,
}

impl<R: DirectoryRepository> DirectoryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a project header. The id is caller-chosen.
    pub fn create_project(&self, project: Project) -> Result<Project, DirectoryError> {
        if project.project_id <= 0 {
            return Err(DirectoryError::InvalidInput(
                "project_id must be a positive integer".to_string(),
            ));
        }
        let name = project.project_name.trim();
        let description = project.project_description.trim();
        if name.is_empty() || description.is_empty() {
            return Err(DirectoryError::InvalidInput(
                "project_name and project_description are required".to_string(),
            ));
        }
        let project = Project {
            project_name: name.to_string(),
            project_description: description.to_string(),
            deadline: project
                .deadline
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            ..project
        };
        self.repo.create_project(&project)?;
        log::info!(
            "event=project_create module=directory status=ok project_id={}",
            project.project_id
        );
        Ok(project)
    }

    pub fn get_project(&self, project_id: ProjectId) -> Result<Project, DirectoryError> {
        self.repo
            .get_project(project_id)?
            .ok_or_else(|| DirectoryError::not_found("project", project_id))
    }

    /// Registers an employee and returns the stored record.
    pub fn register_employee(&self, input: NewEmployee) -> Result<Candidate, DirectoryError> {
        let email = normalize_email(&input.email)?;
        let employee_id =
            self.repo
                .create_employee(&email, input.skills.trim(), input.domains.trim())?;
        log::info!(
            "event=employee_register module=directory status=ok employee_id={employee_id}"
        );
        self.employee(employee_id)
    }

    pub fn employee(&self, employee_id: CandidateId) -> Result<Candidate, DirectoryError> {
        self.repo
            .get_employee(employee_id)?
            .ok_or_else(|| DirectoryError::not_found("employee", employee_id))
    }

    pub fn employee_by_email(&self, email: &str) -> Result<Candidate, DirectoryError> {
        let email = normalize_email(email)?;
        self.repo
            .employee_by_email(&email)?
            .ok_or_else(|| DirectoryError::not_found("employee", email))
    }

    /// Appends skills to an existing employee, returning the updated record.
    pub fn add_skills(&self, email: &str, skills: &str) -> Result<Candidate, DirectoryError> {
        let email = normalize_email(email)?;
        let skills = skills.trim();
        if skills.is_empty() {
            return Err(DirectoryError::InvalidInput("skills are required".to_string()));
        }
        self.repo.append_skills(&email, skills)?;
        self.employee_by_email(&email)
    }

    /// Adds the employee to the project. Returns `false` when already a member.
    pub fn join_project(
        &self,
        employee_id: CandidateId,
        project_id: ProjectId,
    ) -> Result<bool, DirectoryError> {
        self.get_project(project_id)?;
        self.employee(employee_id)?;
        let inserted = self.repo.add_membership(employee_id, project_id)?;
        log::info!(
            "event=project_join module=directory status=ok project_id={project_id} employee_id={employee_id} inserted={inserted}"
        );
        Ok(inserted)
    }

    pub fn project_members(&self, project_id: ProjectId) -> Result<Vec<Candidate>, DirectoryError> {
        self.get_project(project_id)?;
        Ok(self.repo.list_members(project_id)?)
    }

    pub fn unaffiliated_employees(&self) -> Result<Vec<Candidate>, DirectoryError> {
        Ok(self.repo.list_unaffiliated()?)
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_email, DirectoryError, EMAIL_RE};

    #[test]
    fn email_pattern_compiles() {
        assert!(EMAIL_RE.is_ok());
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(
            normalize_email("  Dev.Ops@Example.COM ").unwrap(),
            "dev.ops@example.com"
        );
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for raw in ["", "   ", "no-at-sign", "a@b", "two@@example.com", "sp ace@example.com"] {
            assert!(
                matches!(normalize_email(raw), Err(DirectoryError::InvalidInput(_))),
                "{raw:?} should be rejected"
            );
        }
    }
}
