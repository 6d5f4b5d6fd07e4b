//! `taskmatch` command-line entry point.
//!
//! Every data command prints one JSON document on stdout. Failures print
//! `{"error": "<reason>"}` and exit with status 1; logs go to stderr or the
//! configured log directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use taskmatch_core::{init_logging, open_db, AppConfig};

mod cmd;

#[derive(Parser)]
#[command(name = "taskmatch")]
#[command(version, about = "Skill-based assignment of project work to employees")]
pub struct Cli {
    /// SQLite database file (overrides TASKMATCH_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// trace|debug|info|warn|error (overrides TASKMATCH_LOG_LEVEL)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Absolute directory for rotating log files (overrides TASKMATCH_LOG_DIR)
    #[arg(long, global = true)]
    pub log_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assign open subtasks of a project to the best-matching free employees
    Assign { project_id: i64 },
    /// Serve the HTTP API until Ctrl+C
    Serve {
        /// Listen address (overrides TASKMATCH_BIND_ADDR)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage employees
    Employee {
        #[command(subcommand)]
        command: EmployeeCommands,
    },
    /// Import task plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Report milestone progress
    Milestone {
        #[command(subcommand)]
        command: MilestoneCommands,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a project with a caller-chosen id
    Add {
        project_id: i64,
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        deadline: Option<String>,
    },
    /// Add an employee to a project
    Join { project_id: i64, employee_id: i64 },
    /// List project members
    Members { project_id: i64 },
    /// Print tasks, subtasks and milestones with assignees
    Show { project_id: i64 },
    /// Print progress counters
    Progress { project_id: i64 },
}

#[derive(Subcommand)]
pub enum EmployeeCommands {
    /// Register an employee
    Add {
        email: String,
        /// Comma-separated skills
        #[arg(long, default_value = "")]
        skills: String,
        /// Comma-separated domains
        #[arg(long, default_value = "")]
        domains: String,
    },
    /// Append comma-separated skills to an employee
    AddSkills { email: String, skills: String },
    /// List employees that belong to no project
    Unassigned,
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Store a JSON task plan under an empty project
    Import { project_id: i64, file: PathBuf },
}

#[derive(Subcommand)]
pub enum MilestoneCommands {
    /// Mark a milestone done for the employee holding its subtask
    Complete {
        employee_id: i64,
        milestone_id: i64,
        #[arg(short, long)]
        message: String,
    },
}

fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::from_env().context("Invalid environment configuration")?;
    if let Some(db) = &cli.db {
        config = config.with_db_path(db)?;
    }
    if let Some(level) = &cli.log_level {
        config = config.with_log_level(level)?;
    }
    if let Some(dir) = &cli.log_dir {
        config = config.with_log_dir(dir)?;
    }
    if let Commands::Serve { bind: Some(bind) } = &cli.command {
        config = config.with_bind_addr(bind)?;
    }
    Ok(config)
}

fn print_outcome(outcome: cmd::CmdResult) -> ExitCode {
    match outcome {
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(reason) => {
            println!("{}", serde_json::json!({ "error": reason }));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = resolve_config(&cli)?;
    init_logging(config.log_level, config.log_dir_str().as_deref())
        .map_err(anyhow::Error::msg)
        .context("Failed to initialize logging")?;
    info!(
        "event=cli_start module=cli status=ok db_path={}",
        config.db_path.display()
    );

    match cli.command {
        Commands::Serve { .. } => {
            taskmatch_api::start_server(config.bind_addr, &config.db_path)
                .await
                .context("Server error")?;
            Ok(ExitCode::SUCCESS)
        }
        command => Ok(print_outcome(execute(&config.db_path, command))),
    }
}

fn execute(db_path: &Path, command: Commands) -> cmd::CmdResult {
    let conn = open_db(db_path).map_err(|err| err.to_string())?;

    match command {
        Commands::Assign { project_id } => cmd::cmd_assign(&conn, project_id),
        Commands::Project { command } => match command {
            ProjectCommands::Add {
                project_id,
                name,
                description,
                deadline,
            } => cmd::cmd_project_add(&conn, project_id, &name, &description, deadline.as_deref()),
            ProjectCommands::Join {
                project_id,
                employee_id,
            } => cmd::cmd_project_join(&conn, project_id, employee_id),
            ProjectCommands::Members { project_id } => cmd::cmd_project_members(&conn, project_id),
            ProjectCommands::Show { project_id } => cmd::cmd_project_show(&conn, project_id),
            ProjectCommands::Progress { project_id } => {
                cmd::cmd_project_progress(&conn, project_id)
            }
        },
        Commands::Employee { command } => match command {
            EmployeeCommands::Add {
                email,
                skills,
                domains,
            } => cmd::cmd_employee_add(&conn, &email, &skills, &domains),
            EmployeeCommands::AddSkills { email, skills } => {
                cmd::cmd_employee_add_skills(&conn, &email, &skills)
            }
            EmployeeCommands::Unassigned => cmd::cmd_employee_unassigned(&conn),
        },
        Commands::Plan {
            command: PlanCommands::Import { project_id, file },
        } => cmd::cmd_plan_import(&conn, project_id, &file),
        Commands::Milestone {
            command:
                MilestoneCommands::Complete {
                    employee_id,
                    milestone_id,
                    message,
                },
        } => cmd::cmd_milestone_complete(&conn, employee_id, milestone_id, &message),
        Commands::Serve { .. } => Err("serve does not produce a JSON result".to_string()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
