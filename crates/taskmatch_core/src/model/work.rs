//! Work breakdown records: tasks, subtasks (work items), milestones and
//! assignments.
//!
//! # Invariants
//! - A work item belongs to exactly one task, a task to exactly one project.
//! - A work item carries at most one assignment row.
//! - An assignment counts as open until its status is `Done`.

use crate::model::directory::{CandidateId, ProjectId};
use serde::{Deserialize, Serialize};

pub type TaskId = i64;
pub type WorkItemId = i64;
pub type MilestoneId = i64;

/// Assignment lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Created by an assignment run, not started yet.
    Open,
    /// Work has started.
    InProgress,
    /// Finished; frees the employee for new work.
    Done,
}

impl AssignmentStatus {
    /// Value stored in `assignments.status`.
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

/// Completion flag shared by subtasks and milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Open,
    Done,
}

impl ProgressStatus {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Done => "done",
        }
    }

    pub fn parse_db(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// A subtask: the unit of assignment. `name` is the only matching signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub name: String,
    pub task_id: TaskId,
}

impl WorkItem {
    pub fn new(id: WorkItemId, task_id: TaskId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            task_id,
        }
    }
}

/// One pairing produced by an assignment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pairing {
    pub subtask_id: WorkItemId,
    pub employee_id: CandidateId,
}

/// Milestone read model used by project overviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,
    pub name: String,
    pub status: ProgressStatus,
}

/// Subtask read model with its milestones and current assignee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskView {
    pub id: WorkItemId,
    pub name: String,
    pub status: ProgressStatus,
    pub assignee: Option<CandidateId>,
    pub milestones: Vec<Milestone>,
}

/// Task read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: TaskId,
    pub name: String,
    pub category: Option<String>,
    pub subtasks: Vec<SubtaskView>,
}

/// Tree of a project's work breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectOverview {
    pub project_id: ProjectId,
    pub tasks: Vec<TaskView>,
}

/// Aggregated counters for a project dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectProgress {
    pub project_name: String,
    pub deadline: Option<String>,
    pub tasks_count: u32,
    pub total_subtasks: u32,
    pub completed_subtasks: u32,
    pub remaining_subtasks: u32,
    pub available_subtasks: u32,
    pub employees_working: u32,
    pub employees_assigned: u32,
    pub free_employees: u32,
}

#[cfg(test)]
mod tests {
    use super::{AssignmentStatus, ProgressStatus};

    #[test]
    fn progress_status_round_trips_through_db_text() {
        for status in [ProgressStatus::Open, ProgressStatus::Done] {
            assert_eq!(ProgressStatus::parse_db(status.as_db_str()), Some(status));
        }
        assert_eq!(ProgressStatus::parse_db("in_progress"), None);
    }

    #[test]
    fn assignment_status_db_text_matches_schema_values() {
        assert_eq!(AssignmentStatus::Open.as_db_str(), "open");
        assert_eq!(AssignmentStatus::InProgress.as_db_str(), "in_progress");
        assert_eq!(AssignmentStatus::Done.as_db_str(), "done");
    }
}
