use serde::{Deserialize, Serialize};

use crate::auth::records::PublicUser;

/// Body for `action=login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub fingerprint: Option<String>,
}

/// Body for `action=register`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub invitation_code: Option<String>,
    pub fingerprint: Option<String>,
}

/// Body for `action=logout`.
#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    pub token: Option<String>,
}

/// Response for successful login and register.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: PublicUser,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub success: bool,
    pub user: PublicUser,
}
