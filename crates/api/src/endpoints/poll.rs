//! Poll endpoints: listing, detail, creation and voting.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
};
use axum_extra::extract::Form;
use pollhub_common::AppResult;
use pollhub_core::{CreatePollInput, PollDetail};
use pollhub_db::entities::poll;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
};

/// Home page view.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeView {
    pub polls: Vec<poll::Model>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_polls: Option<Vec<poll::Model>>,
}

/// Poll creation form. Options arrive as repeated `options[]` fields.
#[derive(Debug, Deserialize)]
pub struct CreatePollForm {
    pub poll: String,
    #[serde(rename = "options[]", alias = "options", default)]
    pub options: Vec<String>,
}

/// All polls, plus the caller's own when logged in.
async fn home(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
) -> AppResult<Json<HomeView>> {
    let polls = state.poll_service.list_all().await?;
    let my_polls = match user {
        Some(user) => Some(state.poll_service.list_by_creator(&user.id).await?),
        None => None,
    };

    Ok(Json(HomeView { polls, my_polls }))
}

/// Poll detail with counts, threaded comments and the caller's vote.
async fn show(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(poll_id): Path<String>,
) -> AppResult<Json<PollDetail>> {
    let viewer = user.as_ref().map(|u| u.id.as_str());
    let detail = state.poll_service.detail(&poll_id, viewer).await?;
    Ok(Json(detail))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Form(form): Form<CreatePollForm>,
) -> AppResult<Redirect> {
    let input = CreatePollInput::new(&form.poll, form.options);
    state.poll_service.create(&user.id, input).await?;
    Ok(Redirect::to("/"))
}

async fn my_polls(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<poll::Model>>> {
    Ok(Json(state.poll_service.list_by_creator(&user.id).await?))
}

async fn vote(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((poll_id, option_id)): Path<(String, String)>,
) -> AppResult<Redirect> {
    state.poll_service.vote(&poll_id, &option_id, &user.id).await?;
    Ok(Redirect::to(&format!("/polls/{poll_id}")))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/polls", post(create))
        .route("/polls/{poll_id}", get(show))
        .route("/my_polls", get(my_polls))
        .route("/vote/{poll_id}/{option_id}", post(vote))
}
