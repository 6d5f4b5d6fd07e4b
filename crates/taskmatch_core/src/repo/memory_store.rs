//! In-memory `AssignmentStore` used to exercise the matching core without
//! SQLite.
//!
//! Mirrors the SQLite store's ordering and exclusivity rules. A commit can be
//! forced to fail to observe rollback behavior.

use crate::model::directory::{Candidate, CandidateId, ProjectId, ProjectMembership};
use crate::model::work::{AssignmentStatus, Pairing, WorkItem, WorkItemId};
use crate::repo::assignment_repo::{AssignmentBatch, AssignmentStore};
use crate::repo::{RepoError, RepoResult};
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StoredAssignment {
    subtask_id: WorkItemId,
    employee_id: CandidateId,
    status: AssignmentStatus,
}

#[derive(Debug, Default)]
pub struct InMemoryAssignmentStore {
    projects: BTreeSet<ProjectId>,
    candidates: Vec<Candidate>,
    work_items: Vec<(ProjectId, WorkItem)>,
    memberships: RefCell<BTreeSet<(CandidateId, ProjectId)>>,
    assignments: RefCell<Vec<StoredAssignment>>,
    fail_commit: Cell<bool>,
    commit_calls: Cell<usize>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.projects.insert(project_id);
        self
    }

    pub fn with_candidate(mut self, candidate: Candidate) -> Self {
        self.candidates.push(candidate);
        self.candidates.sort_by_key(|candidate| candidate.id);
        self
    }

    pub fn with_member(self, candidate_id: CandidateId, project_id: ProjectId) -> Self {
        self.memberships
            .borrow_mut()
            .insert((candidate_id, project_id));
        self
    }

    pub fn with_work_item(mut self, project_id: ProjectId, item: WorkItem) -> Self {
        self.work_items.push((project_id, item));
        self.work_items.sort_by_key(|(_, item)| item.id);
        self
    }

    pub fn with_assignment(
        self,
        subtask_id: WorkItemId,
        employee_id: CandidateId,
        status: AssignmentStatus,
    ) -> Self {
        self.assignments.borrow_mut().push(StoredAssignment {
            subtask_id,
            employee_id,
            status,
        });
        self
    }

    /// Makes every following non-empty commit fail without applying writes.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commit.set(fail);
    }

    /// Number of `commit_assignments` calls that reached the store.
    pub fn commit_calls(&self) -> usize {
        self.commit_calls.get()
    }

    /// Stored pairings in insertion order.
    pub fn pairings(&self) -> Vec<Pairing> {
        self.assignments
            .borrow()
            .iter()
            .map(|stored| Pairing {
                subtask_id: stored.subtask_id,
                employee_id: stored.employee_id,
            })
            .collect()
    }

    pub fn memberships(&self) -> Vec<ProjectMembership> {
        self.memberships
            .borrow()
            .iter()
            .map(|(employee_id, project_id)| ProjectMembership {
                employee_id: *employee_id,
                project_id: *project_id,
            })
            .collect()
    }

    fn is_free(&self, candidate_id: CandidateId) -> bool {
        !self
            .assignments
            .borrow()
            .iter()
            .any(|stored| {
                stored.employee_id == candidate_id && stored.status != AssignmentStatus::Done
            })
    }

    fn is_assigned(&self, subtask_id: WorkItemId) -> bool {
        self.assignments
            .borrow()
            .iter()
            .any(|stored| stored.subtask_id == subtask_id)
    }
}

impl AssignmentStore for InMemoryAssignmentStore {
    fn project_exists(&self, project_id: ProjectId) -> RepoResult<bool> {
        Ok(self.projects.contains(&project_id))
    }

    fn free_candidates_for_project(&self, project_id: ProjectId) -> RepoResult<Vec<Candidate>> {
        let memberships = self.memberships.borrow();
        Ok(self
            .candidates
            .iter()
            .filter(|candidate| memberships.contains(&(candidate.id, project_id)))
            .filter(|candidate| self.is_free(candidate.id))
            .cloned()
            .collect())
    }

    fn free_candidates_global(&self) -> RepoResult<Vec<Candidate>> {
        Ok(self
            .candidates
            .iter()
            .filter(|candidate| self.is_free(candidate.id))
            .cloned()
            .collect())
    }

    fn open_work_items_for_project(&self, project_id: ProjectId) -> RepoResult<Vec<WorkItem>> {
        Ok(self
            .work_items
            .iter()
            .filter(|(owner, item)| *owner == project_id && !self.is_assigned(item.id))
            .map(|(_, item)| item.clone())
            .collect())
    }

    fn is_project_member(
        &self,
        candidate_id: CandidateId,
        project_id: ProjectId,
    ) -> RepoResult<bool> {
        Ok(self
            .memberships
            .borrow()
            .contains(&(candidate_id, project_id)))
    }

    fn commit_assignments(&self, batch: &AssignmentBatch) -> RepoResult<()> {
        self.commit_calls.set(self.commit_calls.get() + 1);
        if batch.is_empty() {
            return Ok(());
        }
        if self.fail_commit.get() {
            return Err(RepoError::Conflict("injected commit failure".to_string()));
        }

        // Validate the whole batch first so a rejected pairing leaves no trace.
        let mut taken_employees = BTreeSet::new();
        let mut taken_items = BTreeSet::new();
        for pairing in &batch.pairings {
            let in_project = self
                .work_items
                .iter()
                .any(|(owner, item)| *owner == batch.project_id && item.id == pairing.subtask_id);
            if !in_project
                || self.is_assigned(pairing.subtask_id)
                || !self.is_free(pairing.employee_id)
                || !taken_employees.insert(pairing.employee_id)
                || !taken_items.insert(pairing.subtask_id)
            {
                return Err(RepoError::Conflict(format!(
                    "employee {} cannot take subtask {} in project {}",
                    pairing.employee_id, pairing.subtask_id, batch.project_id
                )));
            }
        }

        let mut memberships = self.memberships.borrow_mut();
        for membership in &batch.new_memberships {
            memberships.insert((membership.employee_id, membership.project_id));
        }
        let mut assignments = self.assignments.borrow_mut();
        for pairing in &batch.pairings {
            assignments.push(StoredAssignment {
                subtask_id: pairing.subtask_id,
                employee_id: pairing.employee_id,
                status: AssignmentStatus::Open,
            });
        }
        Ok(())
    }
}
