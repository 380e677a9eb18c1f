use axum::{
    extract::{Path, State},
    Json,
};
use sqlx::SqlitePool;

use super::written;
use crate::{
    error::AppError,
    middleware::CurrentSession,
    models::{NewProject, Project, ProjectPatch},
    repository::ProjectRepository,
};

#[utoipa::path(
    get,
    path = "/projects",
    responses(
        (status = 200, description = "Projects, newest first", body = Vec<Project>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "The list could not be fetched")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "projects"
)]
pub async fn list_projects(
    State(pool): State<SqlitePool>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Vec<Project>>, AppError> {
    let repo = ProjectRepository::new(pool);
    Ok(Json(repo.try_list(Some(&session)).await?))
}

#[utoipa::path(
    post,
    path = "/projects",
    request_body = NewProject,
    responses(
        (status = 200, description = "Project created", body = Project),
        (status = 400, description = "Empty name or color"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "projects"
)]
pub async fn create_project(
    State(pool): State<SqlitePool>,
    CurrentSession(session): CurrentSession,
    Json(payload): Json<NewProject>,
) -> Result<Json<Project>, AppError> {
    let repo = ProjectRepository::new(pool);
    written(repo.create(Some(&session), payload).await?)
}

#[utoipa::path(
    patch,
    path = "/projects/{id}",
    params(
        ("id" = String, Path, description = "Project ID")
    ),
    request_body = ProjectPatch,
    responses(
        (status = 200, description = "Project updated", body = Project),
        (status = 404, description = "Project not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "projects"
)]
pub async fn update_project(
    State(pool): State<SqlitePool>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
    Json(payload): Json<ProjectPatch>,
) -> Result<Json<Project>, AppError> {
    let repo = ProjectRepository::new(pool);
    written(repo.update(Some(&session), &id, payload).await?)
}

#[utoipa::path(
    delete,
    path = "/projects/{id}",
    params(
        ("id" = String, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Project deleted; its tasks keep their project_id"),
        (status = 404, description = "Project not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "projects"
)]
pub async fn delete_project(
    State(pool): State<SqlitePool>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let repo = ProjectRepository::new(pool);
    repo.delete(Some(&session), &id).await?;

    Ok(Json(serde_json::json!({ "ok": true })))
}
