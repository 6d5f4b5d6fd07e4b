//! Directory repository: projects, employees and project memberships.
//!
//! # Invariants
//! - Employee emails are unique; uniqueness violations surface as `Conflict`.
//! - Listings are ordered by ascending id.
//! - Membership inserts are idempotent.

use crate::model::directory::{Candidate, CandidateId, Project, ProjectId};
use crate::repo::assignment_repo::parse_candidate_row;
use crate::repo::{ensure_connection_ready, map_constraint, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

const EMPLOYEE_SELECT_SQL: &str = "SELECT
    e.employee_id AS employee_id,
    e.email AS email,
    e.skills AS skills,
    e.domains AS domains
FROM employee_details e";

/// Repository interface for the personnel/project directory.
pub trait DirectoryRepository {
    fn create_project(&self, project: &Project) -> RepoResult<()>;
    fn get_project(&self, project_id: ProjectId) -> RepoResult<Option<Project>>;
    fn create_employee(&self, email: &str, skills: &str, domains: &str)
        -> RepoResult<CandidateId>;
    fn get_employee(&self, employee_id: CandidateId) -> RepoResult<Option<Candidate>>;
    fn employee_by_email(&self, email: &str) -> RepoResult<Option<Candidate>>;
    /// Appends comma-separated skills to an employee's skill text.
    fn append_skills(&self, email: &str, skills: &str) -> RepoResult<()>;
    /// Returns `false` when the membership already existed.
    fn add_membership(&self, employee_id: CandidateId, project_id: ProjectId)
        -> RepoResult<bool>;
    fn list_members(&self, project_id: ProjectId) -> RepoResult<Vec<Candidate>>;
    /// Employees with no membership in any project.
    fn list_unaffiliated(&self) -> RepoResult<Vec<Candidate>>;
}

/// SQLite-backed directory repository.
pub struct SqliteDirectoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDirectoryRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_employees(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<Candidate>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_candidate_row(row)?);
        }
        Ok(items)
    }
}

impl DirectoryRepository for SqliteDirectoryRepository<'_> {
    fn create_project(&self, project: &Project) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO projects (
                    project_id,
                    project_name,
                    project_description,
                    deadline
                ) VALUES (?1, ?2, ?3, ?4);",
                params![
                    project.project_id,
                    project.project_name.as_str(),
                    project.project_description.as_str(),
                    project.deadline.as_deref(),
                ],
            )
            .map_err(|err| {
                map_constraint(err, || {
                    format!("project {} already exists", project.project_id)
                })
            })?;
        Ok(())
    }

    fn get_project(&self, project_id: ProjectId) -> RepoResult<Option<Project>> {
        let project = self
            .conn
            .query_row(
                "SELECT project_id, project_name, project_description, deadline
                 FROM projects
                 WHERE project_id = ?1;",
                [project_id],
                |row| {
                    Ok(Project {
                        project_id: row.get(0)?,
                        project_name: row.get(1)?,
                        project_description: row.get(2)?,
                        deadline: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(project)
    }

    fn create_employee(
        &self,
        email: &str,
        skills: &str,
        domains: &str,
    ) -> RepoResult<CandidateId> {
        self.conn
            .execute(
                "INSERT INTO employee_details (email, skills, domains) VALUES (?1, ?2, ?3);",
                params![email, skills, domains],
            )
            .map_err(|err| map_constraint(err, || format!("email {email} is already registered")))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_employee(&self, employee_id: CandidateId) -> RepoResult<Option<Candidate>> {
        let mut items = self.query_employees(
            &format!("{EMPLOYEE_SELECT_SQL} WHERE e.employee_id = ?1;"),
            [employee_id],
        )?;
        Ok(items.pop())
    }

    fn employee_by_email(&self, email: &str) -> RepoResult<Option<Candidate>> {
        let mut items = self.query_employees(
            &format!("{EMPLOYEE_SELECT_SQL} WHERE e.email = ?1;"),
            [email],
        )?;
        Ok(items.pop())
    }

    fn append_skills(&self, email: &str, skills: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE employee_details
             SET skills = CASE
                 WHEN trim(skills) = '' THEN ?2
                 ELSE skills || ',' || ?2
             END
             WHERE email = ?1;",
            params![email, skills],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("employee", email));
        }
        Ok(())
    }

    fn add_membership(
        &self,
        employee_id: CandidateId,
        project_id: ProjectId,
    ) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO project_assignment (employee_id, project_id)
                 VALUES (?1, ?2);",
                params![employee_id, project_id],
            )
            .map_err(|err| {
                map_constraint(err, || {
                    format!("employee {employee_id} or project {project_id} does not exist")
                })
            })?;
        Ok(changed == 1)
    }

    fn list_members(&self, project_id: ProjectId) -> RepoResult<Vec<Candidate>> {
        self.query_employees(
            &format!(
                "{EMPLOYEE_SELECT_SQL}
                 INNER JOIN project_assignment pa ON pa.employee_id = e.employee_id
                 WHERE pa.project_id = ?1
                 ORDER BY e.employee_id ASC;"
            ),
            [project_id],
        )
    }

    fn list_unaffiliated(&self) -> RepoResult<Vec<Candidate>> {
        self.query_employees(
            &format!(
                "{EMPLOYEE_SELECT_SQL}
                 WHERE NOT EXISTS (
                     SELECT 1 FROM project_assignment pa WHERE pa.employee_id = e.employee_id
                 )
                 ORDER BY e.employee_id ASC;"
            ),
            [],
        )
    }
}
