// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account registration and session routes.

use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::routes::extract::ApiJson;
use crate::models::User;
use crate::services::Registration;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

/// Login request: `login` is a username or an email address.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "username", alias = "email")]
    login: String,
    #[serde(default)]
    password: String,
}

/// Session issued after registration or login.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub token: String,
    pub user_id: String,
    pub username: String,
    pub referral_code: String,
    pub has_completed_matching: bool,
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build()
}

fn issue_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let token = create_jwt(&user.id, &state.config.jwt_signing_key).map_err(AppError::Internal)?;

    Ok((
        jar.add(session_cookie(token.clone())),
        Json(SessionResponse {
            token,
            user_id: user.id.clone(),
            username: user.username.clone(),
            referral_code: user.referral_code.clone(),
            has_completed_matching: user.has_completed_matching,
        }),
    ))
}

/// Create an account and start a session.
async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ApiJson(registration): ApiJson<Registration>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let user = state.accounts.register(registration).await?;
    issue_session(&state, jar, &user)
}

/// Check credentials and start a session.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    if request.login.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::Unauthorized);
    }
    let user = state
        .accounts
        .authenticate(&request.login, &request.password)
        .await?;
    issue_session(&state, jar, &user)
}

/// Clear the session cookie. Bearer tokens are dropped client-side.
async fn logout(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
