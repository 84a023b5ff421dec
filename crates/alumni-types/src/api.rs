use serde::{Deserialize, Serialize};

use crate::models::User;

// -- JWT Claims --

/// JWT claims shared by alumni-api (REST middleware) and the gateway upgrade.
/// `sub` is the member's roll number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub fullname: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub rollno: String,
    pub fullname: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub rollno: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

// -- Messages --

/// Body of `POST /conversations/{username}/messages`.
///
/// `message` is optional so a missing field reaches the validation path and
/// is rejected the same way as an empty one. When `room` is set the message
/// is also relayed to that room's live members.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
}
