use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    middleware::CurrentSession,
    models::{Project, Task, User},
    repository::{ProjectRepository, TaskRepository},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Profile {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
            last_sign_in_at: user.last_sign_in_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Export {
    pub exported_at: DateTime<Utc>,
    pub profile: Profile,
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
}

#[utoipa::path(
    get,
    path = "/settings",
    responses(
        (status = 200, description = "Account details of the signed-in user", body = Profile),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "views"
)]
pub async fn profile(CurrentSession(session): CurrentSession) -> Json<Profile> {
    Json(Profile::from(session.user))
}

#[utoipa::path(
    get,
    path = "/settings/export",
    responses(
        (status = 200, description = "Everything the signed-in user owns", body = Export),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "A list could not be fetched")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "views"
)]
pub async fn export(
    State(pool): State<SqlitePool>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Export>, AppError> {
    let tasks_repo = TaskRepository::new(pool.clone());
    let projects_repo = ProjectRepository::new(pool);

    let (tasks, projects) = tokio::join!(
        tasks_repo.try_list(Some(&session)),
        projects_repo.try_list(Some(&session))
    );
    let (tasks, projects) = (tasks?, projects?);

    Ok(Json(Export {
        exported_at: Utc::now(),
        profile: Profile::from(session.user),
        projects,
        tasks,
    }))
}
