use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure taxonomy for the auth operations.
///
/// Credential failures deliberately share one message so callers cannot tell
/// "no such user" from "wrong password".
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("username already taken")]
    DuplicateUser,
    #[error("invitation code already used")]
    CodeAlreadyUsed,
    #[error("invalid invitation code")]
    InvalidCode,
    #[error("no authentication token provided")]
    MissingToken,
    #[error("invalid authentication token")]
    InvalidToken,
    #[error("user not found")]
    UnknownUser,
    #[error("storage write failed")]
    Storage,
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_)
            | AuthError::DuplicateUser
            | AuthError::CodeAlreadyUsed
            | AuthError::InvalidCode => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::UnknownUser => StatusCode::UNAUTHORIZED,
            AuthError::Storage | AuthError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match &self {
            AuthError::Unexpected(e) => {
                error!(error = %e, "unexpected failure");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}
