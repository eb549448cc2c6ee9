//! Registration, login and logout.

use axum::{
    Router,
    extract::State,
    response::Redirect,
    routing::{get, post},
};
use axum_extra::extract::{Form, SignedCookieJar};
use pollhub_common::AppResult;
use pollhub_core::RegisterInput;
use serde::Deserialize;

use crate::middleware::AppState;

/// Username/password form shared by register and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

/// Create a new account.
async fn register(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> AppResult<Redirect> {
    state
        .user_service
        .register(RegisterInput {
            username: form.username,
            password: form.password,
        })
        .await?;

    Ok(Redirect::to("/login"))
}

/// Sign in and start a session.
async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<CredentialsForm>,
) -> AppResult<(SignedCookieJar, Redirect)> {
    let user = state
        .user_service
        .authenticate(&form.username, &form.password)
        .await?;

    tracing::info!(user_id = %user.id, "Logged in");

    let target = if user.is_admin { "/admin" } else { "/" };
    let jar = jar.add(state.session.login_cookie(user.id));
    Ok((jar, Redirect::to(target)))
}

/// End the session.
async fn logout(State(state): State<AppState>, jar: SignedCookieJar) -> (SignedCookieJar, Redirect) {
    (
        jar.remove(state.session.logout_cookie()),
        Redirect::to("/login"),
    )
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout).post(logout))
}
