//! Dashboard figures derived from the fetched task and project lists.

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Priority, Project, Task};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardMetrics {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub high_priority_pending: usize,
    pub overdue: usize,
    /// Whole percent, rounded to nearest. Zero when there are no tasks.
    pub completion_rate: u32,
    pub total_projects: usize,
}

impl DashboardMetrics {
    pub fn compute(tasks: &[Task], projects: &[Project], now: DateTime<Utc>) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|task| task.completed).count();
        let high_priority_pending = tasks
            .iter()
            .filter(|task| task.priority == Priority::High && !task.completed)
            .count();
        let overdue = tasks.iter().filter(|task| is_overdue(task, now)).count();

        Self {
            total,
            completed,
            pending: total - completed,
            high_priority_pending,
            overdue,
            completion_rate: completion_rate(completed, total),
            total_projects: projects.len(),
        }
    }
}

/// A due date counts from the start of that day, UTC.
pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    match task.due_date {
        Some(due) if !task.completed => due.and_time(NaiveTime::MIN).and_utc() < now,
        _ => false,
    }
}

pub fn completion_rate(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}
