use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{reload, require_text, Snapshot};
use crate::{
    error::{AppError, Result},
    models::{NewProject, Project, ProjectPatch, Session},
};

/// Projects owned by the session's user, newest first.
///
/// Deleting a project leaves the `project_id` of its tasks in place; those
/// tasks simply lose their joined projection on the next task list.
#[derive(Clone)]
pub struct ProjectRepository {
    pool: SqlitePool,
    state: Arc<RwLock<Snapshot<Project>>>,
}

impl ProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            state: Arc::new(RwLock::new(Snapshot::default())),
        }
    }

    pub async fn snapshot(&self) -> Snapshot<Project> {
        self.state.read().await.clone()
    }

    pub async fn projects(&self) -> Vec<Project> {
        self.state.read().await.items.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn get(&self, id: &str) -> Option<Project> {
        self.state
            .read()
            .await
            .items
            .iter()
            .find(|project| project.id == id)
            .cloned()
    }

    pub async fn list(&self, session: Option<&Session>) -> Vec<Project> {
        match self.try_list(session).await {
            Ok(projects) => projects,
            Err(_) => self.projects().await,
        }
    }

    /// Refreshes the snapshot and reports a failed fetch to the caller.
    pub async fn try_list(&self, session: Option<&Session>) -> Result<Vec<Project>> {
        let Some(session) = session else {
            return Ok(self.projects().await);
        };

        reload(
            &self.state,
            "projects",
            fetch_projects(&self.pool, session.user_id()),
        )
        .await
    }

    pub async fn create(
        &self,
        session: Option<&Session>,
        fields: NewProject,
    ) -> Result<Option<Project>> {
        let Some(session) = session else {
            return Ok(None);
        };

        require_text("name", &fields.name)?;
        require_text("color", &fields.color)?;

        let created = sqlx::query_as::<_, Project>(
            "INSERT INTO projects (id, name, description, color, user_id)
             VALUES (?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.color)
        .bind(session.user_id())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(project_id = %created.id, user_id = %session.user_id(), "project created");

        self.list(Some(session)).await;
        Ok(Some(created))
    }

    pub async fn update(
        &self,
        session: Option<&Session>,
        id: &str,
        patch: ProjectPatch,
    ) -> Result<Option<Project>> {
        let Some(session) = session else {
            return Ok(None);
        };

        if let Some(name) = &patch.name {
            require_text("name", name)?;
        }
        if let Some(color) = &patch.color {
            require_text("color", color)?;
        }

        let updated = sqlx::query_as::<_, Project>(
            "UPDATE projects SET
                name = COALESCE(?, name),
                description = CASE WHEN ? THEN ? ELSE description END,
                color = COALESCE(?, color)
            WHERE id = ? AND user_id = ?
            RETURNING *",
        )
        .bind(&patch.name)
        .bind(patch.description.is_some())
        .bind(patch.description.clone().flatten())
        .bind(&patch.color)
        .bind(id)
        .bind(session.user_id())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Project not found".to_string()))?;

        tracing::debug!(project_id = %id, user_id = %session.user_id(), "project updated");

        // A failed reload leaves the pre-write row in the snapshot.
        match self.try_list(Some(session)).await {
            Ok(_) => Ok(Some(self.get(id).await.unwrap_or(updated))),
            Err(_) => Ok(Some(updated)),
        }
    }

    pub async fn delete(&self, session: Option<&Session>, id: &str) -> Result<()> {
        let Some(session) = session else {
            return Ok(());
        };

        let result = sqlx::query("DELETE FROM projects WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(session.user_id())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Project not found".to_string()));
        }
        tracing::debug!(project_id = %id, user_id = %session.user_id(), "project deleted");

        self.list(Some(session)).await;
        Ok(())
    }
}

async fn fetch_projects(pool: &SqlitePool, user_id: &str) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "SELECT * FROM projects WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn project_owned_by(
    pool: &SqlitePool,
    user_id: &str,
    project_id: &str,
) -> Result<bool, sqlx::Error> {
    let found = sqlx::query("SELECT 1 FROM projects WHERE id = ? AND user_id = ?")
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(found.is_some())
}
