use axum::{http::StatusCode, response::IntoResponse};
use tracing::info;

use super::error_responses::AppError;

pub async fn not_found() -> impl IntoResponse {
    info!("backend router: not_found handler invoked");
    AppError::RouteNotFound
}

pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}
