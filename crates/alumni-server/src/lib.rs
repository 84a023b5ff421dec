pub mod config;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, Request, State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use alumni_api::auth::{self, AppState, AppStateInner};
use alumni_api::middleware::{bearer_token, decode_token, require_auth};
use alumni_api::{conversations, directory};
use alumni_db::{ChatHistory, Database};
use alumni_gateway::connection;
use alumni_gateway::{Relay, RoomRegistry};

/// Wire the store, history service and relay into shared handler state.
pub fn build_state(db: Arc<Database>, jwt_secret: String) -> AppState {
    let relay = Relay::new(ChatHistory::new(db.clone()), RoomRegistry::new());
    Arc::new(AppStateInner::new(db, relay, jwt_secret))
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health))
        // Browsers cannot set headers on a WebSocket handshake, so the
        // gateway checks its own token.
        .route("/gateway", get(ws_upgrade));

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/directory", get(directory::list_directory))
        .route("/conversations/{username}", get(conversations::get_conversation))
        .route("/conversations/{username}/messages", post(conversations::send_message))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        // Path only: the gateway query string carries a token.
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request| {
            tracing::debug_span!("request", method = %req.method(), path = %req.uri().path())
        }))
        .with_state(state)
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

async fn ws_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let token = bearer_token(&headers)
        .or(query.token.as_deref())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let claims = decode_token(&state.jwt_secret, token)?;

    let relay = state.relay.clone();
    Ok(ws.on_upgrade(move |socket| connection::handle_connection(socket, relay, claims.username)))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
