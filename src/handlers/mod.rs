use axum::Json;

use crate::error::AppError;

pub mod auth;
pub mod dashboard;
pub mod projects;
pub mod settings;
pub mod tasks;

// Repositories hand back `None` only when called without a session, and
// `CurrentSession` has already rejected those requests.
fn written<T>(record: Option<T>) -> Result<Json<T>, AppError> {
    record
        .map(Json)
        .ok_or_else(|| AppError::InternalError("write skipped without a session".to_string()))
}
