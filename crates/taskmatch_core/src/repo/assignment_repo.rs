//! Storage contract for the assignment core and its SQLite implementation.
//!
//! # Responsibility
//! - Expose exactly the queries the pool builder and greedy loop need.
//! - Commit one run's pairings and memberships atomically.
//!
//! # Invariants
//! - Candidate and work-item listings are ordered by ascending id.
//! - "Free" means no assignment with status `open` or `in_progress`.
//! - "Open work item" means a not-done subtask with no assignment row.
//! - `commit_assignments` writes everything or nothing.

use crate::model::directory::{Candidate, CandidateId, ProjectId, ProjectMembership};
use crate::model::work::{AssignmentStatus, Pairing, WorkItem};
use crate::repo::{ensure_connection_ready, map_constraint, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const FREE_PROJECT_CANDIDATES_SQL: &str = "SELECT
    e.employee_id AS employee_id,
    e.email AS email,
    e.skills AS skills,
    e.domains AS domains
FROM employee_details e
INNER JOIN project_assignment pa ON pa.employee_id = e.employee_id
WHERE pa.project_id = ?1
  AND NOT EXISTS (
    SELECT 1
    FROM assignments a
    WHERE a.employee_id = e.employee_id
      AND a.status != 'done'
  )
ORDER BY e.employee_id ASC;";

const FREE_CANDIDATES_SQL: &str = "SELECT
    e.employee_id AS employee_id,
    e.email AS email,
    e.skills AS skills,
    e.domains AS domains
FROM employee_details e
WHERE NOT EXISTS (
    SELECT 1
    FROM assignments a
    WHERE a.employee_id = e.employee_id
      AND a.status != 'done'
)
ORDER BY e.employee_id ASC;";

const OPEN_WORK_ITEMS_SQL: &str = "SELECT
    s.id AS id,
    s.name AS name,
    s.task_id AS task_id
FROM subtasks s
INNER JOIN tasks t ON t.id = s.task_id
WHERE t.project_id = ?1
  AND s.status = 'open'
  AND NOT EXISTS (
    SELECT 1
    FROM assignments a
    WHERE a.subtask_id = s.id
  )
ORDER BY s.id ASC;";

/// Writes staged by one assignment run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentBatch {
    pub project_id: ProjectId,
    pub pairings: Vec<Pairing>,
    pub new_memberships: Vec<ProjectMembership>,
}

impl AssignmentBatch {
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairings.is_empty() && self.new_memberships.is_empty()
    }
}

/// Narrow data-access interface used by the assignment core.
pub trait AssignmentStore {
    fn project_exists(&self, project_id: ProjectId) -> RepoResult<bool>;
    /// Project members with no open assignment, ascending id.
    fn free_candidates_for_project(&self, project_id: ProjectId) -> RepoResult<Vec<Candidate>>;
    /// Every candidate with no open assignment, ascending id.
    fn free_candidates_global(&self) -> RepoResult<Vec<Candidate>>;
    /// Unassigned, not-done work items under the project, ascending id.
    fn open_work_items_for_project(&self, project_id: ProjectId) -> RepoResult<Vec<WorkItem>>;
    fn is_project_member(
        &self,
        candidate_id: CandidateId,
        project_id: ProjectId,
    ) -> RepoResult<bool>;
    /// Persists the batch in a single transaction.
    fn commit_assignments(&self, batch: &AssignmentBatch) -> RepoResult<()>;
}

impl<T: AssignmentStore + ?Sized> AssignmentStore for &T {
    fn project_exists(&self, project_id: ProjectId) -> RepoResult<bool> {
        (**self).project_exists(project_id)
    }

    fn free_candidates_for_project(&self, project_id: ProjectId) -> RepoResult<Vec<Candidate>> {
        (**self).free_candidates_for_project(project_id)
    }

    fn free_candidates_global(&self) -> RepoResult<Vec<Candidate>> {
        (**self).free_candidates_global()
    }

    fn open_work_items_for_project(&self, project_id: ProjectId) -> RepoResult<Vec<WorkItem>> {
        (**self).open_work_items_for_project(project_id)
    }

    fn is_project_member(
        &self,
        candidate_id: CandidateId,
        project_id: ProjectId,
    ) -> RepoResult<bool> {
        (**self).is_project_member(candidate_id, project_id)
    }

    fn commit_assignments(&self, batch: &AssignmentBatch) -> RepoResult<()> {
        (**self).commit_assignments(batch)
    }
}

/// SQLite-backed assignment store.
pub struct SqliteAssignmentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssignmentStore<'conn> {
    /// Creates the store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AssignmentStore for SqliteAssignmentStore<'_> {
    fn project_exists(&self, project_id: ProjectId) -> RepoResult<bool> {
        project_exists(self.conn, project_id)
    }

    fn free_candidates_for_project(&self, project_id: ProjectId) -> RepoResult<Vec<Candidate>> {
        let mut stmt = self.conn.prepare(FREE_PROJECT_CANDIDATES_SQL)?;
        let mut rows = stmt.query([project_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_candidate_row(row)?);
        }
        Ok(items)
    }

    fn free_candidates_global(&self) -> RepoResult<Vec<Candidate>> {
        let mut stmt = self.conn.prepare(FREE_CANDIDATES_SQL)?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_candidate_row(row)?);
        }
        Ok(items)
    }

    fn open_work_items_for_project(&self, project_id: ProjectId) -> RepoResult<Vec<WorkItem>> {
        open_work_items(self.conn, project_id)
    }

    fn is_project_member(
        &self,
        candidate_id: CandidateId,
        project_id: ProjectId,
    ) -> RepoResult<bool> {
        is_project_member(self.conn, candidate_id, project_id)
    }

    fn commit_assignments(&self, batch: &AssignmentBatch) -> RepoResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        for membership in &batch.new_memberships {
            tx.execute(
                "INSERT OR IGNORE INTO project_assignment (employee_id, project_id)
                 VALUES (?1, ?2);",
                params![membership.employee_id, membership.project_id],
            )?;
        }

        for pairing in &batch.pairings {
            insert_open_assignment(&tx, batch.project_id, pairing)?;
        }

        tx.commit()?;
        Ok(())
    }
}

pub(crate) fn project_exists(conn: &Connection, project_id: ProjectId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM projects WHERE project_id = ?1);",
        [project_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Unassigned, not-done subtasks of the project, ascending id.
pub(crate) fn open_work_items(conn: &Connection, project_id: ProjectId) -> RepoResult<Vec<WorkItem>> {
    let mut stmt = conn.prepare(OPEN_WORK_ITEMS_SQL)?;
    let mut rows = stmt.query([project_id])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(WorkItem {
            id: row.get("id")?,
            name: row.get("name")?,
            task_id: row.get("task_id")?,
        });
    }
    Ok(items)
}

pub(crate) fn is_project_member(
    conn: &Connection,
    candidate_id: CandidateId,
    project_id: ProjectId,
) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM project_assignment
            WHERE employee_id = ?1 AND project_id = ?2
        );",
        params![candidate_id, project_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Inserts one `open` assignment, re-checking the exclusivity invariants
/// inside the caller's transaction.
///
/// Fails with `Conflict` when the employee already holds an open assignment,
/// the subtask is already assigned, or the subtask is outside the project.
pub(crate) fn insert_open_assignment(
    conn: &Connection,
    project_id: ProjectId,
    pairing: &Pairing,
) -> RepoResult<()> {
    let changed = conn
        .execute(
            "INSERT INTO assignments (subtask_id, employee_id, status)
             SELECT ?1, ?2, ?4
             WHERE EXISTS (
                 SELECT 1
                 FROM subtasks s
                 INNER JOIN tasks t ON t.id = s.task_id
                 WHERE s.id = ?1 AND t.project_id = ?3
             )
               AND NOT EXISTS (
                 SELECT 1
                 FROM assignments a
                 WHERE a.employee_id = ?2 AND a.status != ?5
             );",
            params![
                pairing.subtask_id,
                pairing.employee_id,
                project_id,
                AssignmentStatus::Open.as_db_str(),
                AssignmentStatus::Done.as_db_str(),
            ],
        )
        .map_err(|err| {
            map_constraint(err, || {
                format!("subtask {} is already assigned", pairing.subtask_id)
            })
        })?;

    if changed == 0 {
        return Err(RepoError::Conflict(format!(
            "employee {} cannot take subtask {} in project {}",
            pairing.employee_id, pairing.subtask_id, project_id
        )));
    }
    Ok(())
}

pub(crate) fn parse_candidate_row(row: &Row<'_>) -> RepoResult<Candidate> {
    Ok(Candidate {
        id: row.get("employee_id")?,
        email: row.get("email")?,
        skills: row.get("skills")?,
        domains: row.get("domains")?,
    })
}
