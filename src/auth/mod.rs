use axum::routing::post;
use axum::Router;

use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod password;
pub mod records;
pub mod services;
pub mod token;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/auth", post(handlers::dispatch))
}
