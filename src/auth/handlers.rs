use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;

use crate::auth::dto::{LoginRequest, LogoutRequest, RegisterRequest};
use crate::auth::services::ClientContext;
use crate::error::AuthError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ActionQuery {
    pub action: Option<String>,
}

/// Single action-dispatch endpoint: `POST /api/auth?action=...`.
///
/// login/register/logout carry a JSON body; check reads the Authorization
/// header. Non-POST methods are rejected by the method router with 405.
#[instrument(skip_all, fields(action = query.action.as_deref().unwrap_or("-")))]
pub async fn dispatch(
    State(state): State<AppState>,
    Query(query): Query<ActionQuery>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, AuthError> {
    match query.action.as_deref() {
        Some("login") => {
            let req: LoginRequest = parse_body(&body)?;
            let ctx = client_context(&headers);
            Ok(Json(state.auth.login(req, &ctx).await?).into_response())
        }
        Some("register") => {
            let req: RegisterRequest = parse_body(&body)?;
            Ok(Json(state.auth.register(req).await?).into_response())
        }
        Some("logout") => {
            let req: LogoutRequest = parse_body(&body)?;
            Ok(Json(state.auth.logout(req.token.as_deref()).await).into_response())
        }
        Some("check") => {
            let bearer = headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());
            Ok(Json(state.auth.check(bearer).await?).into_response())
        }
        _ => Err(AuthError::Validation("unknown action".into())),
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, AuthError> {
    let body = if body.trim().is_empty() { "{}" } else { body };
    serde_json::from_str(body)
        .map_err(|e| AuthError::Validation(format!("invalid request body: {e}")))
}

fn client_context(headers: &HeaderMap) -> ClientContext {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    ClientContext { ip, user_agent }
}
