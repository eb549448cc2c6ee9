//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{SignedCookieJar, cookie::Key};
use pollhub_common::{AppResult, Config, StorageBackend};
use pollhub_core::{AdminService, CommentService, PollService, UploadService, UserService};
use pollhub_db::{
    entities::user,
    repositories::{CommentRepository, PollRepository, PollVoteRepository, UserRepository},
};
use sea_orm::DatabaseConnection;

use crate::session::SessionSettings;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub poll_service: PollService,
    pub comment_service: CommentService,
    pub admin_service: AdminService,
    pub upload_service: UploadService,
    pub session: SessionSettings,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    pub fn new(
        db: Arc<DatabaseConnection>,
        storage: Arc<dyn StorageBackend>,
        config: &Config,
    ) -> AppResult<Self> {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let poll_repo = PollRepository::new(Arc::clone(&db));
        let vote_repo = PollVoteRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(db);

        Ok(Self {
            user_service: UserService::new(user_repo.clone()),
            poll_service: PollService::new(poll_repo.clone(), vote_repo, comment_repo.clone()),
            comment_service: CommentService::new(comment_repo, poll_repo.clone()),
            admin_service: AdminService::new(user_repo, poll_repo),
            upload_service: UploadService::new(storage, config.storage.max_upload_bytes),
            session: SessionSettings::from_config(&config.session)?,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.session.key().clone()
    }
}

/// Session middleware.
///
/// Resolves the signed session cookie to a fresh user row on every request.
/// A cookie naming a user that no longer exists is treated as no session.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(state.session.cookie_name()) {
        match state.user_service.find(cookie.value()).await {
            Ok(Some(user)) => {
                req.extensions_mut().insert(user);
            }
            Ok(None) => {
                tracing::debug!(user_id = %cookie.value(), "Session names an unknown user");
            }
            Err(e) => return e.into_response(),
        }
    }

    next.run(req).await
}

/// Admin gate for the `/admin` routes.
///
/// Runs after [`session_middleware`], so the admin flag comes from the row
/// loaded for this request.
pub async fn require_admin(req: Request, next: Next) -> Response {
    match req.extensions().get::<user::Model>() {
        None => Redirect::to("/login").into_response(),
        Some(user) if !user.is_admin => {
            tracing::warn!(user_id = %user.id, path = %req.uri().path(), "Refused admin access");
            Redirect::to("/").into_response()
        }
        Some(_) => next.run(req).await,
    }
}
