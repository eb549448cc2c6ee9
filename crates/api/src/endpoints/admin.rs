//! Admin panel endpoints.
//!
//! Every route here sits behind [`require_admin`].

use axum::{
    Json, Router,
    extract::{Path, State},
    middleware,
    response::Redirect,
    routing::{get, post},
};
use pollhub_common::AppResult;
use pollhub_core::{AdminDashboard, UserDeletion};

use crate::{
    extractors::AuthUser,
    middleware::{AppState, require_admin},
};

async fn dashboard(State(state): State<AppState>) -> AppResult<Json<AdminDashboard>> {
    Ok(Json(state.admin_service.dashboard().await?))
}

async fn delete_user(
    State(state): State<AppState>,
    AuthUser(admin): AuthUser,
    Path(user_id): Path<String>,
) -> AppResult<Redirect> {
    let outcome = state.admin_service.delete_user(&admin.id, &user_id).await?;
    if outcome == UserDeletion::NotFound {
        tracing::debug!(user_id = %user_id, "Admin delete: no such user");
    }
    Ok(Redirect::to("/admin"))
}

async fn delete_poll(
    State(state): State<AppState>,
    AuthUser(admin): AuthUser,
    Path(poll_id): Path<String>,
) -> AppResult<Redirect> {
    state.admin_service.delete_poll(&admin.id, &poll_id).await?;
    Ok(Redirect::to("/admin"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/delete_user/{user_id}", post(delete_user))
        .route("/admin/delete_poll/{poll_id}", post(delete_poll))
        .route_layer(middleware::from_fn(require_admin))
}
