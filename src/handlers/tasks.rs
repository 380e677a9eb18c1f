use axum::{
    extract::{Path, Query, State},
    Json,
};
use sqlx::SqlitePool;

use super::written;
use crate::{
    error::AppError,
    filter::{filter_tasks, TaskFilter},
    middleware::CurrentSession,
    models::{NewTask, Task, TaskPatch},
    repository::TaskRepository,
};

#[utoipa::path(
    get,
    path = "/tasks",
    params(TaskFilter),
    responses(
        (status = 200, description = "Tasks matching the filter, newest first", body = Vec<Task>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "The list could not be fetched")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "tasks"
)]
pub async fn list_tasks(
    State(pool): State<SqlitePool>,
    CurrentSession(session): CurrentSession,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<Vec<Task>>, AppError> {
    let repo = TaskRepository::new(pool);
    let tasks = repo.try_list(Some(&session)).await?;

    let visible = filter_tasks(&tasks, &filter).into_iter().cloned().collect();
    Ok(Json(visible))
}

#[utoipa::path(
    post,
    path = "/tasks",
    request_body = NewTask,
    responses(
        (status = 200, description = "Task created", body = Task),
        (status = 400, description = "Empty title or unknown project"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "tasks"
)]
pub async fn create_task(
    State(pool): State<SqlitePool>,
    CurrentSession(session): CurrentSession,
    Json(payload): Json<NewTask>,
) -> Result<Json<Task>, AppError> {
    let repo = TaskRepository::new(pool);
    written(repo.create(Some(&session), payload).await?)
}

#[utoipa::path(
    patch,
    path = "/tasks/{id}",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    request_body = TaskPatch,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "tasks"
)]
pub async fn update_task(
    State(pool): State<SqlitePool>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
    Json(payload): Json<TaskPatch>,
) -> Result<Json<Task>, AppError> {
    let repo = TaskRepository::new(pool);
    written(repo.update(Some(&session), &id, payload).await?)
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task deleted"),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "tasks"
)]
pub async fn delete_task(
    State(pool): State<SqlitePool>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let repo = TaskRepository::new(pool);
    repo.delete(Some(&session), &id).await?;

    Ok(Json(serde_json::json!({ "ok": true })))
}
