pub mod auth;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod notes;
pub mod routes;
pub mod service;

pub use auth::{AppState, AppStateInner};
pub use error::{ApiError, NoteError};
pub use routes::router;
pub use service::NoteService;

use tracing::error;

/// Run blocking work (SQLite, Argon2) off the async runtime.
pub(crate) async fn blocking<F, T, E>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal("blocking task failed")
        })?
        .map_err(Into::into)
}
