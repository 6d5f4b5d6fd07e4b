//! Work breakdown persistence: plan import, milestone progress and
//! project read models.
//!
//! # Invariants
//! - A plan import writes all rows or none.
//! - Logging a milestone, closing its subtask and staging the follow-up
//!   assignment happen in one transaction.
//! - Overview rows are ordered by ascending id at every level.

use crate::model::directory::{Candidate, CandidateId, ProjectId};
use crate::model::plan::{MilestoneOutcome, NewTask, PlanImportSummary};
use crate::model::work::{
    AssignmentStatus, Milestone, MilestoneId, Pairing, ProgressStatus, ProjectOverview, ProjectProgress,
    SubtaskView, TaskView, WorkItem, WorkItemId,
};
use crate::repo::assignment_repo::{
    insert_open_assignment, open_work_items, parse_candidate_row, project_exists,
};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::BTreeMap;

const NOW_MS_SQL: &str = "CAST(strftime('%s', 'now') AS INTEGER) * 1000";

/// Chooses the follow-up subtask for an employee who just finished one.
pub type FollowUpPicker<'a> = &'a dyn Fn(&Candidate, &[WorkItem]) -> Option<WorkItemId>;

/// One milestone report from an employee.
#[derive(Debug, Clone, Copy)]
pub struct MilestoneReport<'a> {
    pub employee_id: CandidateId,
    pub milestone_id: MilestoneId,
    pub message: &'a str,
}

/// Repository interface for task plans and their progress.
pub trait PlanRepository {
    fn project_exists(&self, project_id: ProjectId) -> RepoResult<bool>;
    fn task_count(&self, project_id: ProjectId) -> RepoResult<u32>;
    /// Inserts normalized tasks, subtasks and milestones atomically.
    fn insert_plan(&self, project_id: ProjectId, tasks: &[NewTask])
        -> RepoResult<PlanImportSummary>;
    fn complete_milestone(
        &self,
        report: MilestoneReport<'_>,
        pick_follow_up: FollowUpPicker<'_>,
    ) -> RepoResult<MilestoneOutcome>;
    fn project_overview(&self, project_id: ProjectId) -> RepoResult<ProjectOverview>;
    fn project_progress(&self, project_id: ProjectId) -> RepoResult<ProjectProgress>;
}

/// SQLite-backed plan repository.
pub struct SqlitePlanRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePlanRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_tasks(&self, project_id: ProjectId) -> RepoResult<Vec<TaskView>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, category
             FROM tasks
             WHERE project_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([project_id])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(TaskView {
                id: row.get(0)?,
                name: row.get(1)?,
                category: row.get(2)?,
                subtasks: Vec::new(),
            });
        }
        Ok(tasks)
    }

    fn load_subtasks(
        &self,
        project_id: ProjectId,
    ) -> RepoResult<Vec<(i64, SubtaskView)>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.name, s.status, s.task_id, a.employee_id
             FROM subtasks s
             INNER JOIN tasks t ON t.id = s.task_id
             LEFT JOIN assignments a ON a.subtask_id = s.id
             WHERE t.project_id = ?1
             ORDER BY s.id ASC;",
        )?;
        let mut rows = stmt.query([project_id])?;
        let mut subtasks = Vec::new();
        while let Some(row) = rows.next()? {
            let status: String = row.get(2)?;
            subtasks.push((
                row.get(3)?,
                SubtaskView {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    status: parse_progress(&status)?,
                    assignee: row.get(4)?,
                    milestones: Vec::new(),
                },
            ));
        }
        Ok(subtasks)
    }

    fn load_milestones(
        &self,
        project_id: ProjectId,
    ) -> RepoResult<Vec<(WorkItemId, Milestone)>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.id, m.name, m.status, m.subtask_id
             FROM milestones m
             INNER JOIN subtasks s ON s.id = m.subtask_id
             INNER JOIN tasks t ON t.id = s.task_id
             WHERE t.project_id = ?1
             ORDER BY m.id ASC;",
        )?;
        let mut rows = stmt.query([project_id])?;
        let mut milestones = Vec::new();
        while let Some(row) = rows.next()? {
            let status: String = row.get(2)?;
            milestones.push((
                row.get(3)?,
                Milestone {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    status: parse_progress(&status)?,
                },
            ));
        }
        Ok(milestones)
    }

    fn count(&self, sql: &str, project_id: ProjectId) -> RepoResult<u32> {
        let value: u32 = self.conn.query_row(sql, [project_id], |row| row.get(0))?;
        Ok(value)
    }
}

impl PlanRepository for SqlitePlanRepository<'_> {
    fn project_exists(&self, project_id: ProjectId) -> RepoResult<bool> {
        project_exists(self.conn, project_id)
    }

    fn task_count(&self, project_id: ProjectId) -> RepoResult<u32> {
        self.count(
            "SELECT COUNT(*) FROM tasks WHERE project_id = ?1;",
            project_id,
        )
    }

    fn insert_plan(
        &self,
        project_id: ProjectId,
        tasks: &[NewTask],
    ) -> RepoResult<PlanImportSummary> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !project_exists(&tx, project_id)? {
            return Err(RepoError::not_found("project", project_id));
        }

        let mut summary = PlanImportSummary {
            project_id,
            ..PlanImportSummary::default()
        };
        for task in tasks {
            tx.execute(
                "INSERT INTO tasks (name, project_id, category) VALUES (?1, ?2, ?3);",
                params![task.name.as_str(), project_id, task.category.as_deref()],
            )?;
            let task_id = tx.last_insert_rowid();
            summary.tasks += 1;

            for subtask in &task.subtasks {
                tx.execute(
                    "INSERT INTO subtasks (name, task_id) VALUES (?1, ?2);",
                    params![subtask.name.as_str(), task_id],
                )?;
                let subtask_id = tx.last_insert_rowid();
                summary.subtasks += 1;

                for milestone in &subtask.milestones {
                    tx.execute(
                        "INSERT INTO milestones (name, subtask_id) VALUES (?1, ?2);",
                        params![milestone.as_str(), subtask_id],
                    )?;
                    summary.milestones += 1;
                }
            }
        }

        tx.commit()?;
        Ok(summary)
    }

    fn complete_milestone(
        &self,
        report: MilestoneReport<'_>,
        pick_follow_up: FollowUpPicker<'_>,
    ) -> RepoResult<MilestoneOutcome> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let (subtask_id, subtask_status, project_id) = tx
            .query_row(
                "SELECT s.id, s.status, t.project_id
                 FROM milestones m
                 INNER JOIN subtasks s ON s.id = m.subtask_id
                 INNER JOIN tasks t ON t.id = s.task_id
                 WHERE m.id = ?1;",
                [report.milestone_id],
                |row| {
                    Ok((
                        row.get::<_, WorkItemId>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, ProjectId>(2)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| RepoError::not_found("milestone", report.milestone_id))?;

        let employee = load_candidate(&tx, report.employee_id)?
            .ok_or_else(|| RepoError::not_found("employee", report.employee_id))?;

        let assignee: Option<CandidateId> = tx
            .query_row(
                "SELECT employee_id FROM assignments WHERE subtask_id = ?1;",
                [subtask_id],
                |row| row.get(0),
            )
            .optional()?;
        if assignee != Some(employee.id) {
            return Err(RepoError::Conflict(format!(
                "subtask {subtask_id} is not assigned to employee {}",
                employee.id
            )));
        }

        tx.execute(
            "INSERT INTO assignment_logs (employee_id, milestone_id, message) VALUES (?1, ?2, ?3);",
            params![employee.id, report.milestone_id, report.message],
        )?;
        tx.execute(
            &format!(
                "UPDATE milestones SET status = ?2, updated_at = {NOW_MS_SQL}
                 WHERE id = ?1 AND status != ?2;"
            ),
            params![report.milestone_id, ProgressStatus::Done.as_db_str()],
        )?;

        let mut outcome = MilestoneOutcome {
            milestone_id: report.milestone_id,
            subtask_id,
            subtask_completed: false,
            follow_up: None,
        };

        let pending: u32 = tx.query_row(
            "SELECT COUNT(*) FROM milestones WHERE subtask_id = ?1 AND status != ?2;",
            params![subtask_id, ProgressStatus::Done.as_db_str()],
            |row| row.get(0),
        )?;
        if pending > 0 || parse_progress(&subtask_status)? == ProgressStatus::Done {
            tx.commit()?;
            return Ok(outcome);
        }

        tx.execute(
            &format!(
                "UPDATE subtasks SET status = ?2, updated_at = {NOW_MS_SQL} WHERE id = ?1;"
            ),
            params![subtask_id, ProgressStatus::Done.as_db_str()],
        )?;
        tx.execute(
            &format!(
                "UPDATE assignments SET status = ?3, updated_at = {NOW_MS_SQL}
                 WHERE subtask_id = ?1 AND employee_id = ?2;"
            ),
            params![subtask_id, employee.id, AssignmentStatus::Done.as_db_str()],
        )?;
        outcome.subtask_completed = true;

        let still_busy: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM assignments WHERE employee_id = ?1 AND status != ?2
            );",
            params![employee.id, AssignmentStatus::Done.as_db_str()],
            |row| row.get(0),
        )?;
        if still_busy == 0 {
            let open_items = open_work_items(&tx, project_id)?;
            if let Some(chosen) = pick_follow_up(&employee, &open_items) {
                let item = open_items
                    .into_iter()
                    .find(|item| item.id == chosen)
                    .ok_or_else(|| {
                        RepoError::InvalidData(format!(
                            "follow-up subtask {chosen} is not open in project {project_id}"
                        ))
                    })?;
                insert_open_assignment(
                    &tx,
                    project_id,
                    &Pairing {
                        subtask_id: item.id,
                        employee_id: employee.id,
                    },
                )?;
                outcome.follow_up = Some(item);
            }
        }

        tx.commit()?;
        Ok(outcome)
    }

    fn project_overview(&self, project_id: ProjectId) -> RepoResult<ProjectOverview> {
        if !project_exists(self.conn, project_id)? {
            return Err(RepoError::not_found("project", project_id));
        }

        let mut milestones_by_subtask: BTreeMap<WorkItemId, Vec<Milestone>> = BTreeMap::new();
        for (subtask_id, milestone) in self.load_milestones(project_id)? {
            milestones_by_subtask
                .entry(subtask_id)
                .or_default()
                .push(milestone);
        }

        let mut subtasks_by_task: BTreeMap<i64, Vec<SubtaskView>> = BTreeMap::new();
        for (task_id, mut subtask) in self.load_subtasks(project_id)? {
            subtask.milestones = milestones_by_subtask
                .remove(&subtask.id)
                .unwrap_or_default();
            subtasks_by_task.entry(task_id).or_default().push(subtask);
        }

        let mut tasks = self.load_tasks(project_id)?;
        for task in &mut tasks {
            task.subtasks = subtasks_by_task.remove(&task.id).unwrap_or_default();
        }

        Ok(ProjectOverview { project_id, tasks })
    }

    fn project_progress(&self, project_id: ProjectId) -> RepoResult<ProjectProgress> {
        let (project_name, deadline) = self
            .conn
            .query_row(
                "SELECT project_name, deadline FROM projects WHERE project_id = ?1;",
                [project_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?
            .ok_or_else(|| RepoError::not_found("project", project_id))?;

        let tasks_count = self.task_count(project_id)?;
        let total_subtasks = self.count(
            "SELECT COUNT(*)
             FROM subtasks s
             INNER JOIN tasks t ON t.id = s.task_id
             WHERE t.project_id = ?1;",
            project_id,
        )?;
        let completed_subtasks = self.count(
            "SELECT COUNT(*)
             FROM subtasks s
             INNER JOIN tasks t ON t.id = s.task_id
             WHERE t.project_id = ?1 AND s.status = 'done';",
            project_id,
        )?;
        let available_subtasks = open_work_items(self.conn, project_id)?.len() as u32;
        let employees_working = self.count(
            "SELECT COUNT(DISTINCT employee_id) FROM project_assignment WHERE project_id = ?1;",
            project_id,
        )?;
        let employees_assigned = self.count(
            "SELECT COUNT(DISTINCT a.employee_id)
             FROM assignments a
             INNER JOIN subtasks s ON s.id = a.subtask_id
             INNER JOIN tasks t ON t.id = s.task_id
             WHERE t.project_id = ?1;",
            project_id,
        )?;

        Ok(ProjectProgress {
            project_name,
            deadline,
            tasks_count,
            total_subtasks,
            completed_subtasks,
            remaining_subtasks: total_subtasks.saturating_sub(completed_subtasks),
            available_subtasks,
            employees_working,
            employees_assigned,
            free_employees: employees_working.saturating_sub(employees_assigned),
        })
    }
}

fn load_candidate(conn: &Connection, employee_id: CandidateId) -> RepoResult<Option<Candidate>> {
    let mut stmt = conn.prepare(
        "SELECT employee_id, email, skills, domains
         FROM employee_details
         WHERE employee_id = ?1;",
    )?;
    let mut rows = stmt.query([employee_id])?;
    let candidate = match rows.next()? {
        Some(row) => Some(parse_candidate_row(row)?),
        None => None,
    };
    Ok(candidate)
}

fn parse_progress(value: &str) -> RepoResult<ProgressStatus> {
    ProgressStatus::parse_db(value)
        .ok_or_else(|| RepoError::InvalidData(format!("unknown progress status `{value}`")))
}
