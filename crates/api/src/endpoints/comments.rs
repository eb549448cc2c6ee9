//! Comment and reply endpoints.

use axum::{
    Router,
    extract::{Path, State},
    response::Redirect,
    routing::post,
};
use axum_extra::extract::Form;
use pollhub_common::AppResult;
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState};

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplyForm {
    pub reply: String,
}

async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(poll_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> AppResult<Redirect> {
    state
        .comment_service
        .add_comment(&poll_id, &user.id, &form.comment)
        .await?;
    Ok(Redirect::to(&format!("/polls/{poll_id}")))
}

async fn add_reply(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((poll_id, parent_id)): Path<(String, String)>,
    Form(form): Form<ReplyForm>,
) -> AppResult<Redirect> {
    state
        .comment_service
        .add_reply(&poll_id, &parent_id, &user.id, &form.reply)
        .await?;
    Ok(Redirect::to(&format!("/polls/{poll_id}")))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add_comment/{poll_id}", post(add_comment))
        .route("/add_reply/{poll_id}/{parent_comment_id}", post(add_reply))
}
