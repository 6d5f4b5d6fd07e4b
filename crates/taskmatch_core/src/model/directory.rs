//! Personnel directory records.
//!
//! # Invariants
//! - `Candidate.email` is stored lowercase and is unique.
//! - `skills`/`domains` keep the raw comma-separated text; tokenization is
//!   the job of `matching::score`.

use serde::{Deserialize, Serialize};

/// Stable identifier of an employee row (`employee_details.employee_id`).
pub type CandidateId = i64;

/// Stable identifier of a project row (`projects.project_id`).
pub type ProjectId = i64;

/// A person eligible for work-item assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "employee_id")]
    pub id: CandidateId,
    pub email: String,
    /// Comma-separated skill tags, e.g. `rust,api,authentication`.
    pub skills: String,
    /// Comma-separated domain tags, e.g. `backend,security`.
    pub domains: String,
}

impl Candidate {
    pub fn new(
        id: CandidateId,
        email: impl Into<String>,
        skills: impl Into<String>,
        domains: impl Into<String>,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            skills: skills.into(),
            domains: domains.into(),
        }
    }
}

/// Project header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: ProjectId,
    pub project_name: String,
    pub project_description: String,
    /// Free-form deadline text (ISO date in practice). Not interpreted.
    pub deadline: Option<String>,
}

/// Records that a candidate belongs to a project independent of subtasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectMembership {
    pub employee_id: CandidateId,
    pub project_id: ProjectId,
}
