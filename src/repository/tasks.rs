use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{projects::project_owned_by, reload, require_text, Snapshot};
use crate::{
    db,
    error::{AppError, Result},
    models::{NewTask, Session, Task, TaskPatch, TaskRow},
};

// The join is scoped to the same owner so a foreign project never leaks its name.
const SELECT_TASKS: &str = "SELECT t.*, p.name AS project_name, p.color AS project_color
     FROM tasks t
     LEFT JOIN projects p ON p.id = t.project_id AND p.user_id = t.user_id
     WHERE t.user_id = ?
     ORDER BY t.created_at DESC, t.rowid DESC";

/// Tasks owned by the session's user, newest first, each joined with its
/// project's name and color.
#[derive(Clone)]
pub struct TaskRepository {
    pool: SqlitePool,
    state: Arc<RwLock<Snapshot<Task>>>,
}

impl TaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            state: Arc::new(RwLock::new(Snapshot::default())),
        }
    }

    pub async fn snapshot(&self) -> Snapshot<Task> {
        self.state.read().await.clone()
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.state.read().await.items.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    /// Looks a task up in the current snapshot.
    pub async fn get(&self, id: &str) -> Option<Task> {
        self.state
            .read()
            .await
            .items
            .iter()
            .find(|task| task.id == id)
            .cloned()
    }

    /// Refreshes the snapshot. A failed fetch is logged and the previous
    /// list is returned unchanged.
    pub async fn list(&self, session: Option<&Session>) -> Vec<Task> {
        match self.try_list(session).await {
            Ok(tasks) => tasks,
            Err(_) => self.tasks().await,
        }
    }

    /// Like [`list`](Self::list), but reports a failed fetch instead of
    /// falling back to the previous list.
    pub async fn try_list(&self, session: Option<&Session>) -> Result<Vec<Task>> {
        let Some(session) = session else {
            return Ok(self.tasks().await);
        };

        reload(
            &self.state,
            "tasks",
            fetch_tasks(&self.pool, session.user_id()),
        )
        .await
    }

    pub async fn create(&self, session: Option<&Session>, fields: NewTask) -> Result<Option<Task>> {
        let Some(session) = session else {
            return Ok(None);
        };

        require_text("title", &fields.title)?;
        if let Some(project_id) = &fields.project_id {
            self.ensure_project(session, project_id).await?;
        }

        let row = sqlx::query_as::<_, TaskRow>(
            "INSERT INTO tasks (id, title, description, completed, priority, due_date, project_id, user_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *, NULL AS project_name, NULL AS project_color",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.completed)
        .bind(fields.priority)
        .bind(fields.due_date)
        .bind(&fields.project_id)
        .bind(session.user_id())
        .fetch_one(&self.pool)
        .await?;

        let created = Task::from(row);
        tracing::debug!(task_id = %created.id, user_id = %session.user_id(), "task created");

        self.list(Some(session)).await;
        Ok(Some(self.get(&created.id).await.unwrap_or(created)))
    }

    /// Applies `patch` and returns the task as stored. The returned task comes
    /// from the reloaded list when that succeeds, with its project projection.
    pub async fn update(
        &self,
        session: Option<&Session>,
        id: &str,
        patch: TaskPatch,
    ) -> Result<Option<Task>> {
        let Some(session) = session else {
            return Ok(None);
        };

        if let Some(title) = &patch.title {
            require_text("title", title)?;
        }
        if let Some(Some(project_id)) = &patch.project_id {
            self.ensure_project(session, project_id).await?;
        }

        // COALESCE keeps untouched columns; the nullable ones take an explicit
        // "was sent" flag so they can be cleared.
        // updated_at always moves forward, even within one millisecond.
        let now = db::timestamp(Utc::now());
        let row = sqlx::query_as::<_, TaskRow>(
            "UPDATE tasks SET
                title = COALESCE(?, title),
                description = CASE WHEN ? THEN ? ELSE description END,
                completed = COALESCE(?, completed),
                priority = COALESCE(?, priority),
                due_date = CASE WHEN ? THEN ? ELSE due_date END,
                project_id = CASE WHEN ? THEN ? ELSE project_id END,
                updated_at = CASE WHEN ? > updated_at THEN ?
                    ELSE strftime('%Y-%m-%dT%H:%M:%fZ', updated_at, '+0.001 seconds') END
            WHERE id = ? AND user_id = ?
            RETURNING *, NULL AS project_name, NULL AS project_color",
        )
        .bind(&patch.title)
        .bind(patch.description.is_some())
        .bind(patch.description.clone().flatten())
        .bind(patch.completed)
        .bind(patch.priority)
        .bind(patch.due_date.is_some())
        .bind(patch.due_date.flatten())
        .bind(patch.project_id.is_some())
        .bind(patch.project_id.clone().flatten())
        .bind(&now)
        .bind(&now)
        .bind(id)
        .bind(session.user_id())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Task not found".to_string()))?;

        let updated = Task::from(row);
        tracing::debug!(task_id = %id, user_id = %session.user_id(), "task updated");

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

        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(session.user_id())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Task not found".to_string()));
        }
        tracing::debug!(task_id = %id, user_id = %session.user_id(), "task deleted");

        self.list(Some(session)).await;
        Ok(())
    }

    async fn ensure_project(&self, session: &Session, project_id: &str) -> Result<()> {
        if !project_owned_by(&self.pool, session.user_id(), project_id).await? {
            return Err(AppError::ValidationError(format!(
                "Project {project_id} does not exist"
            )));
        }
        Ok(())
    }
}

async fn fetch_tasks(pool: &SqlitePool, user_id: &str) -> Result<Vec<Task>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TaskRow>(SELECT_TASKS)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Task::from).collect())
}
