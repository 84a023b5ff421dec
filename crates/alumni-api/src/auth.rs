use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info};

use alumni_db::{ChatHistory, Database, Directory};
use alumni_gateway::Relay;
use alumni_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use alumni_types::models::User;

use crate::error::blocking;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub history: ChatHistory,
    pub directory: Directory,
    pub relay: Relay,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, relay: Relay, jwt_secret: String) -> Self {
        Self {
            history: relay.history().clone(),
            directory: Directory::new(db.clone()),
            db,
            relay,
            jwt_secret,
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let rollno = req.rollno.trim().to_string();
    let username = req.username.trim().to_string();
    let fullname = req.fullname.trim().to_string();

    if rollno.is_empty() || username.is_empty() || fullname.is_empty() || req.password.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .to_string();

    // Duplicate rollno/username is caught by the table constraints
    let db = state.db.clone();
    let (r, u) = (rollno.clone(), username.clone());
    blocking(move || db.create_user(&r, &fullname, &u, &password_hash)).await?;

    info!("Registered {} ({})", username, rollno);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { rollno, username }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let username = req.username.clone();
    let user = blocking(move || db.get_user_by_username(&username))
        .await?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // Verify password
    let parsed_hash =
        PasswordHash::new(&user.password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let profile = User {
        rollno: user.rollno,
        fullname: user.fullname,
        username: user.username,
    };

    let token = create_token(&state.jwt_secret, &profile).map_err(|e| {
        error!("Token signing failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(LoginResponse { user: profile, token }))
}

/// GET /me: the signed-in member's profile.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let rollno = claims.sub.clone();
    let user = blocking(move || db.get_user_by_rollno(&rollno))
        .await?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(User {
        rollno: user.rollno,
        fullname: user.fullname,
        username: user.username,
    }))
}

pub fn create_token(secret: &str, user: &User) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.rollno.clone(),
        username: user.username.clone(),
        fullname: user.fullname.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
