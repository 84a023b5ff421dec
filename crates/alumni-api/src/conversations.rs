use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use tracing::info;

use alumni_types::api::{Claims, SendMessageRequest};
use alumni_types::events::ChatPayload;

use crate::auth::AppState;
use crate::error::{blocking, relay_status};

/// GET /conversations/{username}: every message between the caller and
/// `username`, oldest first.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(other): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let history = state.history.clone();
    let messages = blocking(move || history.fetch_conversation(&claims.username, &other)).await?;
    Ok(Json(messages))
}

/// POST /conversations/{username}/messages
///
/// With a `room`, the message goes through the relay and is broadcast to the
/// room after it is stored. Without one it is only stored.
pub async fn send_message(
    State(state): State<AppState>,
    Path(receiver): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let message = match req.room {
        Some(room) => {
            let payload = ChatPayload {
                sender: claims.username,
                receiver,
                message: req.message.unwrap_or_default(),
                room: room.clone(),
            };
            let delivery = state.relay.send(payload).await.map_err(|e| relay_status(&e))?;
            info!(
                "Message {} from {} relayed to {} member(s) of {}",
                delivery.message.id, delivery.message.sender, delivery.recipients, room
            );
            delivery.message
        }
        None => {
            let history = state.history.clone();
            blocking(move || {
                history.append_message(&claims.username, &receiver, req.message.as_deref())
            })
            .await?
        }
    };

    Ok((StatusCode::CREATED, Json(message)))
}
