use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    metrics::DashboardMetrics,
    middleware::CurrentSession,
    models::{Project, Task},
    repository::{ProjectRepository, TaskRepository},
};

const RECENT_TASKS: usize = 5;
const PROJECT_PREVIEW: usize = 3;

#[derive(Debug, Serialize, ToSchema)]
pub struct Dashboard {
    pub metrics: DashboardMetrics,
    pub recent_tasks: Vec<Task>,
    pub projects: Vec<Project>,
}

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Overview of the caller's tasks and projects", body = Dashboard),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "A list could not be fetched")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "views"
)]
pub async fn dashboard(
    State(pool): State<SqlitePool>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Dashboard>, AppError> {
    let tasks_repo = TaskRepository::new(pool.clone());
    let projects_repo = ProjectRepository::new(pool);

    let (tasks, projects) = tokio::join!(
        tasks_repo.try_list(Some(&session)),
        projects_repo.try_list(Some(&session))
    );
    let (tasks, projects) = (tasks?, projects?);

    let metrics = DashboardMetrics::compute(&tasks, &projects, Utc::now());

    Ok(Json(Dashboard {
        metrics,
        recent_tasks: tasks.into_iter().take(RECENT_TASKS).collect(),
        projects: projects.into_iter().take(PROJECT_PREVIEW).collect(),
    }))
}
