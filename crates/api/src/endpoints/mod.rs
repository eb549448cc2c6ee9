//! API endpoints.

mod admin;
mod auth;
mod comments;
mod poll;
mod upload;

use axum::{Router, http::Uri, middleware, routing::get};
use pollhub_common::AppError;

use crate::middleware::{AppState, session_middleware};

/// Build the application router with its state.
pub fn router(state: AppState) -> Router {
    let max_upload = state.upload_service.max_bytes();

    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(poll::router())
        .merge(comments::router())
        .merge(upload::router(max_upload))
        .merge(admin::router())
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn fallback(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
