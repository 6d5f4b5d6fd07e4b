//! Core domain logic for taskmatch.
//! Skill-based assignment of project work items to employees, plus the
//! directory and plan bookkeeping around it.

pub mod config;
pub mod db;
pub mod logging;
pub mod matching;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, schema_version, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use matching::pool::{build_pool, MIN_POOL_SIZE};
pub use matching::score::score;
pub use model::directory::{Candidate, CandidateId, Project, ProjectId, ProjectMembership};
pub use model::plan::{MilestoneOutcome, PlanImportSummary, TaskPlan};
pub use model::work::{
    AssignmentStatus, Pairing, ProjectOverview, ProjectProgress, WorkItem, WorkItemId,
};
pub use repo::assignment_repo::{AssignmentBatch, AssignmentStore, SqliteAssignmentStore};
pub use repo::directory_repo::{DirectoryRepository, SqliteDirectoryRepository};
pub use repo::plan_repo::{PlanRepository, SqlitePlanRepository};
pub use repo::{RepoError, RepoResult};
pub use service::assignment_service::{
    parse_project_id, AssignError, AssignmentReport, AssignmentService, ASSIGN_SUCCESS_MESSAGE,
};
pub use service::directory_service::{DirectoryError, DirectoryService, NewEmployee};
pub use service::plan_service::{PlanError, PlanService};

/// Version reported by `/health` and `--version`.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
