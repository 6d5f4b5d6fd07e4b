//! Task plan documents and their normalized write model.
//!
//! A plan arrives as loosely-shaped JSON (category -> task -> subtask ->
//! milestone). `TaskPlan::normalize` fills every gap with a placeholder so
//! storage only ever sees complete rows.

use crate::model::work::{MilestoneId, WorkItem, WorkItemId};
use crate::model::directory::ProjectId;
use serde::{Deserialize, Serialize};

/// Every stored subtask carries exactly this many milestones.
pub const MILESTONES_PER_SUBTASK: usize = 5;

const UNNAMED_TASK: &str = "Unnamed Task";
const DEFAULT_SUBTASK: &str = "Default Subtask";
const UNNAMED_SUBTASK: &str = "Unnamed Subtask";
const UNNAMED_MILESTONE: &str = "Unnamed Milestone";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlan {
    #[serde(default)]
    pub tasks: Vec<PlanCategory>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCategory {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tasks: Vec<PlanTask>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTask {
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub subtasks: Option<Vec<PlanSubtask>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSubtask {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub milestones: Option<Vec<PlanMilestone>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMilestone {
    #[serde(default)]
    pub name: Option<String>,
}

/// Task row ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub name: String,
    pub category: Option<String>,
    pub subtasks: Vec<NewSubtask>,
}

/// Subtask row ready for insertion, with exactly `MILESTONES_PER_SUBTASK`
/// milestone names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubtask {
    pub name: String,
    pub milestones: Vec<String>,
}

/// Row counts written by one plan import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanImportSummary {
    pub project_id: ProjectId,
    pub tasks: u32,
    pub subtasks: u32,
    pub milestones: u32,
}

/// Result of logging one milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneOutcome {
    pub milestone_id: MilestoneId,
    pub subtask_id: WorkItemId,
    /// True when this milestone finished its subtask.
    pub subtask_completed: bool,
    /// Subtask newly assigned to the same employee, if any.
    pub follow_up: Option<WorkItem>,
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

impl TaskPlan {
    /// Number of task entries across all categories.
    pub fn task_count(&self) -> usize {
        self.tasks.iter().map(|category| category.tasks.len()).sum()
    }

    /// Flattens the plan into insertable rows, in document order.
    pub fn normalize(&self) -> Vec<NewTask> {
        self.tasks
            .iter()
            .flat_map(|category| {
                let category_name = non_blank(category.category.as_ref());
                category.tasks.iter().map(move |task| NewTask {
                    name: non_blank(task.task.as_ref()).unwrap_or_else(|| UNNAMED_TASK.to_string()),
                    category: category_name.clone(),
                    subtasks: normalize_subtasks(task.subtasks.as_deref()),
                })
            })
            .collect()
    }
}

fn normalize_subtasks(subtasks: Option<&[PlanSubtask]>) -> Vec<NewSubtask> {
    match subtasks {
        Some(items) if !items.is_empty() => items
            .iter()
            .map(|subtask| NewSubtask {
                name: non_blank(subtask.name.as_ref())
                    .unwrap_or_else(|| UNNAMED_SUBTASK.to_string()),
                milestones: normalize_milestones(subtask.milestones.as_deref()),
            })
            .collect(),
        _ => vec![NewSubtask {
            name: DEFAULT_SUBTASK.to_string(),
            milestones: default_milestones(),
        }],
    }
}

fn normalize_milestones(milestones: Option<&[PlanMilestone]>) -> Vec<String> {
    match milestones {
        Some(items) if items.len() == MILESTONES_PER_SUBTASK => items
            .iter()
            .map(|milestone| {
                non_blank(milestone.name.as_ref())
                    .unwrap_or_else(|| UNNAMED_MILESTONE.to_string())
            })
            .collect(),
        _ => default_milestones(),
    }
}

fn default_milestones() -> Vec<String> {
    (1..=MILESTONES_PER_SUBTASK)
        .map(|index| format!("Default Milestone {index}"))
        .collect()
}
