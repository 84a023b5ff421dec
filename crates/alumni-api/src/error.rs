use axum::http::StatusCode;
use tracing::error;

use alumni_db::DbError;
use alumni_gateway::RelayError;

pub fn db_status(err: &DbError) -> StatusCode {
    match err {
        DbError::EmptyMessage => StatusCode::BAD_REQUEST,
        DbError::Duplicate(_) => StatusCode::CONFLICT,
        DbError::Sqlite(_) | DbError::LockPoisoned => {
            error!("Store error: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn relay_status(err: &RelayError) -> StatusCode {
    match err {
        RelayError::Rejected(inner) | RelayError::Store(inner) => db_status(inner),
        RelayError::Task(e) => {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Run a blocking store call off the async runtime.
pub async fn blocking<F, T>(f: F) -> Result<T, StatusCode>
where
    F: FnOnce() -> alumni_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| db_status(&e))
}
