//! Greedy skill-matched assignment of open subtasks.
//!
//! # Responsibility
//! - Pair every open work item of a project with the best-scoring free
//!   candidate, one work item at a time.
//! - Stage memberships for outsiders pulled in by the pool top-up.
//! - Commit one run through a single storage transaction.
//!
//! # Invariants
//! - A candidate wins at most one work item per run.
//! - Work items are visited by ascending id; ties go to the earliest
//!   candidate in pool order.
//! - A zero score never assigns; the work item is skipped and no candidate
//!   is consumed.
//! - `NoCandidates`/`NoWorkItems` are reported before any write.

use crate::matching::pool::build_pool;
use crate::matching::score::{keyword_set, TagProfile};
use crate::model::directory::{Candidate, ProjectId, ProjectMembership};
use crate::model::work::Pairing;
use crate::repo::assignment_repo::{AssignmentBatch, AssignmentStore};
use crate::repo::RepoError;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

pub const ASSIGN_SUCCESS_MESSAGE: &str = "Tasks assigned successfully";

/// Failure of one assignment invocation.
#[derive(Debug)]
pub enum AssignError {
    /// Missing or malformed project id; persistence was not touched.
    InvalidInput(String),
    /// Project id does not exist.
    ProjectNotFound(ProjectId),
    /// Candidate pool is empty.
    NoCandidates,
    /// Project has no unassigned work item.
    NoWorkItems,
    /// Storage read or transaction failure; nothing was written.
    Persistence(RepoError),
}

impl AssignError {
    /// Stable, caller-facing reason used in `{"error": ...}` envelopes.
    pub fn reason(&self) -> String {
        match self {
            Self::InvalidInput(message) => message.clone(),
            Self::ProjectNotFound(_) => "Project not found".to_string(),
            Self::NoCandidates => "No available employees for assignment".to_string(),
            Self::NoWorkItems => "No available subtasks for assignment".to_string(),
            Self::Persistence(err) => err.to_string(),
        }
    }

    /// Short machine code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::ProjectNotFound(_) => "project_not_found",
            Self::NoCandidates => "no_candidates",
            Self::NoWorkItems => "no_work_items",
            Self::Persistence(_) => "persistence_failure",
        }
    }

    /// Whether the caller got the input wrong, as opposed to a server-side
    /// condition.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl Display for AssignError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectNotFound(project_id) => write!(f, "project not found: {project_id}"),
            other => write!(f, "{}", other.reason()),
        }
    }
}

impl Error for AssignError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AssignError {
    fn from(value: RepoError) -> Self {
        Self::Persistence(value)
    }
}

/// Parses caller-supplied project id text.
///
/// Blank or absent input is `Missing project_id`; anything that is not a
/// positive integer is `Invalid project_id`.
pub fn parse_project_id(raw: Option<&str>) -> Result<ProjectId, AssignError> {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(AssignError::InvalidInput("Missing project_id".to_string()));
    }
    match trimmed.parse::<ProjectId>() {
        Ok(project_id) if project_id > 0 => Ok(project_id),
        _ => Err(AssignError::InvalidInput("Invalid project_id".to_string())),
    }
}

/// Successful run envelope: `{"message": ..., "assignments": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentReport {
    pub message: String,
    pub assignments: Vec<Pairing>,
}

impl AssignmentReport {
    fn from_pairings(assignments: Vec<Pairing>) -> Self {
        Self {
            message: ASSIGN_SUCCESS_MESSAGE.to_string(),
            assignments,
        }
    }
}

/// Greedy assignment use-case over any `AssignmentStore`.
pub struct AssignmentService<S: AssignmentStore> {
    store: S,
}

impl<S: AssignmentStore> AssignmentService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Runs matching and commits the result.
    pub fn assign(&self, project_id: ProjectId) -> Result<AssignmentReport, AssignError> {
        let run_id = Uuid::new_v4();
        let started_at = Instant::now();
        info!("event=assign_run module=assign status=start run_id={run_id} project_id={project_id}");

        let result = self.plan(project_id).and_then(|batch| {
            self.store.commit_assignments(&batch)?;
            Ok(batch)
        });

        match result {
            Ok(batch) => {
                info!(
                    "event=assign_run module=assign status=ok run_id={run_id} project_id={project_id} duration_ms={} assigned={} new_memberships={}",
                    started_at.elapsed().as_millis(),
                    batch.pairings.len(),
                    batch.new_memberships.len()
                );
                Ok(AssignmentReport::from_pairings(batch.pairings))
            }
            Err(err) => {
                error!(
                    "event=assign_run module=assign status=error run_id={run_id} project_id={project_id} duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Computes the pairings and memberships a run would write, without
    /// writing them.
    pub fn plan(&self, project_id: ProjectId) -> Result<AssignmentBatch, AssignError> {
        if project_id <= 0 {
            return Err(AssignError::InvalidInput("Invalid project_id".to_string()));
        }
        if !self.store.project_exists(project_id)? {
            return Err(AssignError::ProjectNotFound(project_id));
        }

        let pool = build_pool(&self.store, project_id)?;
        let work_items = self.store.open_work_items_for_project(project_id)?;
        if pool.is_empty() {
            return Err(AssignError::NoCandidates);
        }
        if work_items.is_empty() {
            return Err(AssignError::NoWorkItems);
        }
        debug!(
            "event=assign_pool module=assign project_id={project_id} pool_size={} work_items={}",
            pool.len(),
            work_items.len()
        );

        let mut remaining: Vec<(Candidate, TagProfile)> = pool
            .into_iter()
            .map(|candidate| {
                let profile = TagProfile::of(&candidate);
                (candidate, profile)
            })
            .collect();
        let mut batch = AssignmentBatch::new(project_id);

        for item in &work_items {
            if remaining.is_empty() {
                break;
            }

            let keywords = keyword_set(&item.name);
            let mut best: Option<(usize, u32)> = None;
            for (index, (_, profile)) in remaining.iter().enumerate() {
                let score = profile.score_keywords(&keywords);
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((index, score));
                }
            }

            let Some((index, score)) = best.filter(|(_, score)| *score > 0) else {
                debug!(
                    "event=assign_skip module=assign project_id={project_id} subtask_id={} reason=no_match",
                    item.id
                );
                continue;
            };

            let (winner, _) = remaining.remove(index);
            debug!(
                "event=assign_pick module=assign project_id={project_id} subtask_id={} employee_id={} score={score}",
                item.id, winner.id
            );
            if !self.store.is_project_member(winner.id, project_id)? {
                batch.new_memberships.push(ProjectMembership {
                    employee_id: winner.id,
                    project_id,
                });
            }
            batch.pairings.push(Pairing {
                subtask_id: item.id,
                employee_id: winner.id,
            });
        }

        Ok(batch)
    }
}
