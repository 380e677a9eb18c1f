use axum::{
    extract::FromRef,
    routing::{get, patch, post},
    Router,
};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod session;


use session::SessionProvider;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::sign_up,
        handlers::auth::sign_in,
        handlers::auth::sign_out,
        handlers::dashboard::dashboard,
        handlers::tasks::list_tasks,
        handlers::tasks::create_task,
        handlers::tasks::update_task,
        handlers::tasks::delete_task,
        handlers::projects::list_projects,
        handlers::projects::create_project,
        handlers::projects::update_project,
        handlers::projects::delete_project,
        handlers::settings::profile,
        handlers::settings::export
    ),
    components(
        schemas(
            models::User,
            models::CreateUser,
            models::LoginRequest,
            models::Token,
            models::Priority,
            models::Task,
            models::TaskProject,
            models::NewTask,
            models::TaskPatch,
            models::Project,
            models::NewProject,
            models::ProjectPatch,
            metrics::DashboardMetrics,
            handlers::dashboard::Dashboard,
            handlers::settings::Profile,
            handlers::settings::Export
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Sign up, sign in and sign out"),
        (name = "tasks", description = "Task list and task mutations"),
        (name = "projects", description = "Project list and project mutations"),
        (name = "views", description = "Dashboard and settings views")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}

/// Shared handles every view needs: the store and the session provider.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub sessions: SessionProvider,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for SessionProvider {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(|| async { "TaskFlow is running!" }))
        // Session
        .route("/auth/signup", post(handlers::auth::sign_up))
        .route("/auth/token", post(handlers::auth::sign_in))
        .route("/auth/logout", post(handlers::auth::sign_out))
        // Views
        .route("/dashboard", get(handlers::dashboard::dashboard))
        .route(
            "/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            patch(handlers::tasks::update_task).delete(handlers::tasks::delete_task),
        )
        .route(
            "/projects",
            get(handlers::projects::list_projects).post(handlers::projects::create_project),
        )
        .route(
            "/projects/:id",
            patch(handlers::projects::update_project).delete(handlers::projects::delete_project),
        )
        .route("/settings", get(handlers::settings::profile))
        .route("/settings/export", get(handlers::settings::export))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
