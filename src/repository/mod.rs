//! Per-user repositories over the remote store.
//!
//! Each repository keeps the latest fetched list as a snapshot. Mutations
//! never patch the snapshot locally: a successful write is always followed by
//! a full re-list (write-then-reload), and the snapshot is replaced wholesale.
//! Concurrent calls are not ordered, so the last response to land wins.
//!
//! Every operation takes the caller's session explicitly. Without one the
//! operation is skipped: nothing is fetched or written and no state changes.

use std::future::Future;

use tokio::sync::RwLock;

use crate::error::AppError;

pub mod projects;
pub mod tasks;

#[cfg(test)]
mod tests;

pub use projects::ProjectRepository;
pub use tasks::TaskRepository;

#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    pub loading: bool,
}

impl<T> Default for Snapshot<T> {
    // Nothing has been fetched yet, which reads as loading.
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: true,
        }
    }
}

/// Runs `fetch` with the loading flag raised and swaps in its result.
///
/// A failed fetch is logged and the previous items are kept; the error is
/// still handed back so callers can tell "failed" from "empty".
async fn reload<T, Fut>(
    state: &RwLock<Snapshot<T>>,
    entity: &'static str,
    fetch: Fut,
) -> Result<Vec<T>, AppError>
where
    T: Clone,
    Fut: Future<Output = Result<Vec<T>, sqlx::Error>>,
{
    state.write().await.loading = true;

    let result = fetch.await;

    let mut snapshot = state.write().await;
    snapshot.loading = false;
    match result {
        Ok(items) => {
            tracing::debug!(entity, count = items.len(), "list refreshed");
            snapshot.items = items;
            Ok(snapshot.items.clone())
        }
        Err(e) => {
            tracing::error!(entity, error = %e, "Error fetching {}", entity);
            Err(AppError::SqlxError(e))
        }
    }
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!(
            "{field} cannot be empty"
        )));
    }
    Ok(())
}
