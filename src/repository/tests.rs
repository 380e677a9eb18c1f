use std::time::Duration;

use sqlx::SqlitePool;
use uuid::Uuid;

use super::{ProjectRepository, TaskRepository};
use crate::{
    db::memory_pool,
    error::AppError,
    models::{NewProject, NewTask, Priority, ProjectPatch, Session, TaskPatch, User},
};

async fn session_for(pool: &SqlitePool, email: &str) -> Session {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, hashed_password) VALUES (?, ?, 'unused') RETURNING *",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(email)
    .fetch_one(pool)
    .await
    .expect("Failed to insert user");

    Session {
        id: Uuid::new_v4().to_string(),
        user,
    }
}

fn new_task(title: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        ..Default::default()
    }
}

fn new_project(name: &str) -> NewProject {
    NewProject {
        name: name.to_string(),
        description: None,
        color: "#ef4444".to_string(),
    }
}

#[tokio::test]
async fn list_is_newest_first() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let repo = TaskRepository::new(pool);

    let mut created = Vec::new();
    for title in ["first", "second", "third"] {
        let task = repo.create(Some(&ada), new_task(title)).await.unwrap().unwrap();
        created.push(task.id);
    }

    let tasks = repo.list(Some(&ada)).await;
    let ids: Vec<_> = tasks.iter().map(|t| t.id.clone()).collect();
    created.reverse();
    assert_eq!(ids, created);
    assert!(tasks.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}

#[tokio::test]
async fn create_assigns_server_fields_and_owner() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let bob = session_for(&pool, "bob@example.com").await;
    let repo = TaskRepository::new(pool.clone());

    let due = chrono::NaiveDate::from_ymd_opt(2030, 1, 31);
    let fields = NewTask {
        title: "Ship release".to_string(),
        description: Some("v1.0".to_string()),
        completed: false,
        priority: Priority::High,
        due_date: due,
        project_id: None,
    };
    let created = repo.create(Some(&ada), fields).await.unwrap().unwrap();

    let tasks = repo.list(Some(&ada)).await;
    assert_eq!(tasks.len(), 1);
    let task = &tasks[0];
    assert_eq!(task.id, created.id);
    assert!(!task.id.is_empty());
    assert_eq!(task.title, "Ship release");
    assert_eq!(task.description.as_deref(), Some("v1.0"));
    assert!(!task.completed);
    assert_eq!(task.priority, Priority::High);
    assert_eq!(task.due_date, due);
    assert_eq!(task.user_id, ada.user.id);
    assert_eq!(task.created_at, task.updated_at);

    let other = TaskRepository::new(pool);
    assert!(other.list(Some(&bob)).await.is_empty());
}

#[tokio::test]
async fn mutations_reload_the_snapshot() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let repo = TaskRepository::new(pool.clone());
    assert!(repo.is_loading().await);

    let task = repo.create(Some(&ada), new_task("Buy milk")).await.unwrap().unwrap();
    let snapshot = repo.snapshot().await;
    assert!(!snapshot.loading);
    assert_eq!(snapshot.items.len(), 1);

    // A write through another handle only shows up here after a list.
    let elsewhere = TaskRepository::new(pool);
    elsewhere.create(Some(&ada), new_task("Walk dog")).await.unwrap();
    assert_eq!(repo.tasks().await.len(), 1);

    repo.update(
        Some(&ada),
        &task.id,
        TaskPatch {
            completed: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(repo.tasks().await.len(), 2);
}

#[tokio::test]
async fn update_marks_completed_and_moves_updated_at() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let repo = TaskRepository::new(pool);

    let before = repo.create(Some(&ada), new_task("Buy milk")).await.unwrap().unwrap();

    repo.update(
        Some(&ada),
        &before.id,
        TaskPatch {
            completed: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let after = repo.get(&before.id).await.unwrap();
    assert!(after.completed);
    assert!(after.updated_at > before.updated_at);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.title, "Buy milk");
}

#[tokio::test]
async fn update_clears_only_fields_sent_as_null() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let repo = TaskRepository::new(pool);

    let fields = NewTask {
        title: "Plan trip".to_string(),
        description: Some("flights".to_string()),
        due_date: chrono::NaiveDate::from_ymd_opt(2030, 5, 1),
        ..Default::default()
    };
    let task = repo.create(Some(&ada), fields).await.unwrap().unwrap();

    repo.update(
        Some(&ada),
        &task.id,
        TaskPatch {
            description: Some(None),
            priority: Some(Priority::Low),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let task = repo.get(&task.id).await.unwrap();
    assert_eq!(task.description, None);
    assert_eq!(task.priority, Priority::Low);
    assert!(task.due_date.is_some());
}

#[tokio::test]
async fn delete_removes_and_then_reports_missing() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let repo = TaskRepository::new(pool);

    let task = repo.create(Some(&ada), new_task("Buy milk")).await.unwrap().unwrap();
    repo.delete(Some(&ada), &task.id).await.unwrap();

    assert!(repo.list(Some(&ada)).await.iter().all(|t| t.id != task.id));

    let err = repo.delete(Some(&ada), &task.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn other_users_rows_are_out_of_reach() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let bob = session_for(&pool, "bob@example.com").await;
    let ada_repo = TaskRepository::new(pool.clone());
    let bob_repo = TaskRepository::new(pool);

    let task = ada_repo.create(Some(&ada), new_task("Private")).await.unwrap().unwrap();

    let err = bob_repo
        .update(
            Some(&bob),
            &task.id,
            TaskPatch {
                title: Some("Mine now".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = bob_repo.delete(Some(&bob), &task.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let tasks = ada_repo.list(Some(&ada)).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Private");
}

#[tokio::test]
async fn no_session_is_a_silent_no_op() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let repo = TaskRepository::new(pool.clone());
    let task = TaskRepository::new(pool.clone())
        .create(Some(&ada), new_task("Existing"))
        .await
        .unwrap()
        .unwrap();

    assert!(repo.list(None).await.is_empty());
    assert!(repo.create(None, new_task("Ghost")).await.unwrap().is_none());
    let skipped = repo
        .update(
            None,
            &task.id,
            TaskPatch {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(skipped.is_none());
    repo.delete(None, &task.id).await.unwrap();

    let snapshot = repo.snapshot().await;
    assert!(snapshot.items.is_empty());
    assert!(snapshot.loading);

    let stored = repo.list(Some(&ada)).await;
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].completed);

    let projects = ProjectRepository::new(pool);
    assert!(projects.create(None, new_project("Ghost")).await.unwrap().is_none());
    assert!(projects.list(None).await.is_empty());
}

#[tokio::test]
async fn failed_fetch_keeps_previous_list() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let repo = TaskRepository::new(pool.clone());
    repo.create(Some(&ada), new_task("Buy milk")).await.unwrap();

    pool.close().await;

    let tasks = repo.list(Some(&ada)).await;
    assert_eq!(tasks.len(), 1);
    assert!(!repo.is_loading().await);

    let err = repo.create(Some(&ada), new_task("Walk dog")).await.unwrap_err();
    assert!(matches!(err, AppError::SqlxError(_)));
    assert_eq!(repo.tasks().await.len(), 1);
}

#[tokio::test]
async fn try_list_reports_a_failed_fetch() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let repo = TaskRepository::new(pool.clone());
    repo.create(Some(&ada), new_task("Buy milk")).await.unwrap();

    pool.close().await;

    let err = repo.try_list(Some(&ada)).await.unwrap_err();
    assert!(matches!(err, AppError::SqlxError(_)));
    assert_eq!(repo.tasks().await.len(), 1);
    assert!(!repo.is_loading().await);
}

#[tokio::test]
async fn update_returns_the_written_row_when_the_reload_fails() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let repo = TaskRepository::new(pool.clone());
    let task = repo
        .create(Some(&ada), new_task("Buy milk"))
        .await
        .unwrap()
        .unwrap();

    // The task list joins on projects; the update itself does not.
    sqlx::query("ALTER TABLE projects RENAME TO projects_gone")
        .execute(&pool)
        .await
        .unwrap();

    let updated = repo
        .update(
            Some(&ada),
            &task.id,
            TaskPatch {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.id, task.id);
    assert!(updated.completed);
    assert!(updated.updated_at > task.updated_at);

    // The snapshot still holds the list from before the write.
    assert!(!repo.get(&task.id).await.unwrap().completed);
}

#[tokio::test]
async fn loading_is_raised_while_a_fetch_is_in_flight() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let repo = TaskRepository::new(pool.clone());
    repo.list(Some(&ada)).await;
    assert!(!repo.is_loading().await);

    // Hold the pool's only connection so the fetch has to wait for it.
    let conn = pool.acquire().await.unwrap();

    let pending = {
        let repo = repo.clone();
        let ada = ada.clone();
        tokio::spawn(async move { repo.list(Some(&ada)).await })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while !repo.is_loading().await {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("loading was never raised");
    assert!(!pending.is_finished());

    drop(conn);
    let tasks = pending.await.unwrap();
    assert!(tasks.is_empty());
    assert!(!repo.is_loading().await);
}

#[tokio::test]
async fn empty_title_is_rejected_before_writing() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let repo = TaskRepository::new(pool);

    let err = repo.create(Some(&ada), new_task("   ")).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert!(repo.list(Some(&ada)).await.is_empty());
}

#[tokio::test]
async fn tasks_carry_project_projection() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let projects = ProjectRepository::new(pool.clone());
    let tasks = TaskRepository::new(pool);

    let project = projects.create(Some(&ada), new_project("Home")).await.unwrap().unwrap();
    let fields = NewTask {
        project_id: Some(project.id.clone()),
        ..new_task("Fix sink")
    };
    let task = tasks.create(Some(&ada), fields).await.unwrap().unwrap();

    let joined = task.project.expect("project projection");
    assert_eq!(joined.name, "Home");
    assert_eq!(joined.color, "#ef4444");
}

#[tokio::test]
async fn deleting_a_project_leaves_task_reference_dangling() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let projects = ProjectRepository::new(pool.clone());
    let tasks = TaskRepository::new(pool);

    let project = projects.create(Some(&ada), new_project("Home")).await.unwrap().unwrap();
    let fields = NewTask {
        project_id: Some(project.id.clone()),
        ..new_task("Fix sink")
    };
    let task = tasks.create(Some(&ada), fields).await.unwrap().unwrap();

    projects.delete(Some(&ada), &project.id).await.unwrap();
    assert!(projects.projects().await.is_empty());

    tasks.list(Some(&ada)).await;
    let task = tasks.get(&task.id).await.unwrap();
    assert_eq!(task.project_id.as_deref(), Some(project.id.as_str()));
    assert!(task.project.is_none());
}

#[tokio::test]
async fn foreign_project_reference_is_rejected() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let bob = session_for(&pool, "bob@example.com").await;
    let projects = ProjectRepository::new(pool.clone());
    let tasks = TaskRepository::new(pool);

    let bobs = projects.create(Some(&bob), new_project("Bob's")).await.unwrap().unwrap();

    let fields = NewTask {
        project_id: Some(bobs.id.clone()),
        ..new_task("Sneaky")
    };
    let err = tasks.create(Some(&ada), fields).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let mine = tasks.create(Some(&ada), new_task("Mine")).await.unwrap().unwrap();
    let err = tasks
        .update(
            Some(&ada),
            &mine.id,
            TaskPatch {
                project_id: Some(Some(bobs.id.clone())),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn project_crud_round() {
    let pool = memory_pool().await;
    let ada = session_for(&pool, "ada@example.com").await;
    let repo = ProjectRepository::new(pool);

    let home = repo.create(Some(&ada), new_project("Home")).await.unwrap().unwrap();
    let work = repo.create(Some(&ada), new_project("Work")).await.unwrap().unwrap();

    let names: Vec<_> = repo.projects().await.into_iter().map(|p| p.name).collect();
    assert_eq!(names, ["Work", "Home"]);

    repo.update(
        Some(&ada),
        &home.id,
        ProjectPatch {
            color: Some("#22c55e".to_string()),
            description: Some(Some("chores".to_string())),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let updated = repo.get(&home.id).await.unwrap();
    assert_eq!(updated.color, "#22c55e");
    assert_eq!(updated.description.as_deref(), Some("chores"));
    assert_eq!(updated.name, "Home");

    let err = repo
        .update(
            Some(&ada),
            &work.id,
            ProjectPatch {
                name: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    repo.delete(Some(&ada), &work.id).await.unwrap();
    assert_eq!(repo.projects().await.len(), 1);
}
