//! Task plan use-case service.
//!
//! # Responsibility
//! - Import a task plan into an empty project.
//! - Record milestone progress and hand finished employees their next
//!   subtask.
//! - Serve project overview and progress read models.

use crate::matching::score::{keyword_set, TagProfile};
use crate::model::directory::{Candidate, CandidateId, ProjectId};
use crate::model::plan::{MilestoneOutcome, PlanImportSummary, TaskPlan};
use crate::model::work::{MilestoneId, ProjectOverview, ProjectProgress, WorkItem, WorkItemId};
use crate::repo::plan_repo::{MilestoneReport, PlanRepository};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for plan use-cases.
#[derive(Debug)]
pub enum PlanError {
    /// Caller input failed validation.
    InvalidInput(String),
    /// Referenced project, milestone or employee does not exist.
    NotFound { entity: &'static str, key: String },
    /// The project already has a stored plan.
    AlreadyPlanned(ProjectId),
    /// The write contradicts current assignment state.
    Conflict(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for PlanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "{message}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::AlreadyPlanned(project_id) => {
                write!(f, "project {project_id} already has tasks")
            }
            Self::Conflict(message) => write!(f, "{message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PlanError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PlanError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, key } => Self::NotFound { entity, key },
            RepoError::Conflict(message) => Self::Conflict(message),
            other => Self::Repo(other),
        }
    }
}

/// Picks the open subtask whose name best matches the candidate's tags.
///
/// Only positive scores qualify; ties go to the earliest item in `items`.
pub fn best_follow_up(candidate: &Candidate, items: &[WorkItem]) -> Option<WorkItemId> {
    let profile = TagProfile::of(candidate);
    let mut best: Option<(WorkItemId, u32)> = None;
    for item in items {
        let score = profile.score_keywords(&keyword_set(&item.name));
        if score > 0 && best.map_or(true, |(_, top)| score > top) {
            best = Some((item.id, score));
        }
    }
    best.map(|(id, _)| id)
}

/// Plan service facade over repository implementations.
pub struct PlanService<R: PlanRepository> {
    repo: R,
}

impl<R: PlanRepository> PlanService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Stores `plan` under an existing project that has no tasks yet.
    pub fn import_plan(
        &self,
        project_id: ProjectId,
        plan: &TaskPlan,
    ) -> Result<PlanImportSummary, PlanError> {
        if plan.task_count() == 0 {
            return Err(PlanError::InvalidInput("plan contains no tasks".to_string()));
        }
        if !self.repo.project_exists(project_id)? {
            return Err(PlanError::NotFound {
                entity: "project",
                key: project_id.to_string(),
            });
        }
        if self.repo.task_count(project_id)? > 0 {
            log::warn!(
                "event=plan_import module=plan status=error project_id={project_id} reason=already_planned"
            );
            return Err(PlanError::AlreadyPlanned(project_id));
        }

        let tasks = plan.normalize();
        let summary = self.repo.insert_plan(project_id, &tasks)?;
        log::info!(
            "event=plan_import module=plan status=ok project_id={} tasks={} subtasks={} milestones={}",
            project_id,
            summary.tasks,
            summary.subtasks,
            summary.milestones
        );
        Ok(summary)
    }

    /// Marks a milestone done on behalf of the employee holding its subtask.
    pub fn complete_milestone(
        &self,
        employee_id: CandidateId,
        milestone_id: MilestoneId,
        message: &str,
    ) -> Result<MilestoneOutcome, PlanError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(PlanError::InvalidInput("message is required".to_string()));
        }

        let report = MilestoneReport {
            employee_id,
            milestone_id,
            message,
        };
        let outcome = self
            .repo
            .complete_milestone(report, &best_follow_up)
            .inspect_err(|err| {
                log::warn!(
                    "event=milestone_complete module=plan status=error milestone_id={milestone_id} employee_id={employee_id} error={err}"
                );
            })?;

        log::info!(
            "event=milestone_complete module=plan status=ok milestone_id={} employee_id={} subtask_completed={} follow_up={}",
            milestone_id,
            employee_id,
            outcome.subtask_completed,
            outcome
                .follow_up
                .as_ref()
                .map_or_else(|| "none".to_string(), |item| item.id.to_string())
        );
        Ok(outcome)
    }

    pub fn project_overview(&self, project_id: ProjectId) -> Result<ProjectOverview, PlanError> {
        Ok(self.repo.project_overview(project_id)?)
    }

    pub fn project_progress(&self, project_id: ProjectId) -> Result<ProjectProgress, PlanError> {
        Ok(self.repo.project_progress(project_id)?)
    }
}
