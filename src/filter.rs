//! Task list filtering for the task view.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::models::{Priority, Task};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl StatusFilter {
    pub fn matches(self, completed: bool) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Completed => completed,
            StatusFilter::Pending => !completed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityFilter {
    #[default]
    All,
    Low,
    Medium,
    High,
}

impl PriorityFilter {
    pub fn matches(self, priority: Priority) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Low => priority == Priority::Low,
            PriorityFilter::Medium => priority == Priority::Medium,
            PriorityFilter::High => priority == Priority::High,
        }
    }
}

/// `"all"` or a project id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ProjectFilter {
    #[default]
    All,
    Project(String),
}

impl From<String> for ProjectFilter {
    fn from(value: String) -> Self {
        if value.is_empty() || value == "all" {
            ProjectFilter::All
        } else {
            ProjectFilter::Project(value)
        }
    }
}

impl ProjectFilter {
    pub fn matches(&self, project_id: Option<&str>) -> bool {
        match self {
            ProjectFilter::All => true,
            ProjectFilter::Project(id) => project_id == Some(id.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskFilter {
    /// Case-insensitive match against title or description.
    #[serde(default)]
    pub search: String,
    /// `all`, `completed` or `pending`.
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub status: StatusFilter,
    /// `all`, `low`, `medium` or `high`.
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub priority: PriorityFilter,
    /// `all` or a project id.
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub project: ProjectFilter,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.matches_search(task)
            && self.status.matches(task.completed)
            && self.priority.matches(task.priority)
            && self.project.matches(task.project_id.as_deref())
    }

    fn matches_search(&self, task: &Task) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        task.title.to_lowercase().contains(&needle)
            || task
                .description
                .as_deref()
                .is_some_and(|description| description.to_lowercase().contains(&needle))
    }
}

/// Keeps the tasks matching every criterion of `filter`, in their original order.
pub fn filter_tasks<'a>(tasks: &'a [Task], filter: &TaskFilter) -> Vec<&'a Task> {
    tasks.iter().filter(|task| filter.matches(task)).collect()
}
