use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use alumni_types::api::Claims;

use crate::auth::AppState;
use crate::error::blocking;

/// GET /directory: every registered member's name and roll number.
pub async fn list_directory(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let directory = state.directory.clone();
    let entries = blocking(move || directory.list_all()).await?;
    Ok(Json(entries))
}
