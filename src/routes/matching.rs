// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile matching and adaptive path routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::routes::extract::ApiJson;
use crate::models::{AdaptivePath, MatchingQuestion, Profile};
use crate::services::{ProfileScore, ResponseInput};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profiles", get(list_profiles))
        .route("/api/matching/questions", get(list_questions))
        .route("/api/matching/submit", post(submit_responses))
        .route("/api/matching/select-profile", post(select_profile))
        .route("/api/path", get(get_path))
        .route("/api/path/validate", post(validate_path))
}

async fn list_profiles(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Profile>>> {
    Ok(Json(state.db.list_profiles().await?))
}

// ─── Questions ───────────────────────────────────────────────

/// Matching question without answer weights.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct QuestionResponse {
    pub id: String,
    pub text: String,
    pub order: i32,
    pub answers: Vec<AnswerResponse>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AnswerResponse {
    pub id: String,
    pub text: String,
}

impl From<MatchingQuestion> for QuestionResponse {
    fn from(question: MatchingQuestion) -> Self {
        Self {
            id: question.id,
            text: question.text,
            order: question.order,
            answers: question
                .answers
                .into_iter()
                .map(|a| AnswerResponse {
                    id: a.id,
                    text: a.text,
                })
                .collect(),
        }
    }
}

async fn list_questions(State(state): State<Arc<AppState>>) -> Result<Json<Vec<QuestionResponse>>> {
    let questions = state.db.list_matching_questions().await?;
    Ok(Json(questions.into_iter().map(Into::into).collect()))
}

// ─── Submission ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SubmitResponsesRequest {
    #[serde(default)]
    responses: Vec<ResponseInput>,
}

#[derive(Serialize)]
pub struct MatchingResponse {
    pub recommended_profiles: Vec<Profile>,
    pub scores: Vec<ProfileScore>,
}

async fn submit_responses(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(request): ApiJson<SubmitResponsesRequest>,
) -> Result<Json<MatchingResponse>> {
    let outcome = state
        .matching
        .submit_responses(&user.user_id, &request.responses)
        .await?;

    Ok(Json(MatchingResponse {
        recommended_profiles: outcome.recommended,
        scores: outcome.scores,
    }))
}

#[derive(Deserialize)]
pub struct SelectProfileRequest {
    profile_id: String,
}

#[derive(Serialize)]
pub struct SelectProfileResponse {
    pub success: bool,
    pub profile: Profile,
}

async fn select_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(request): ApiJson<SelectProfileRequest>,
) -> Result<Json<SelectProfileResponse>> {
    let profile = state
        .matching
        .select_profile(&user.user_id, request.profile_id.trim())
        .await?;

    Ok(Json(SelectProfileResponse {
        success: true,
        profile,
    }))
}

// ─── Adaptive Path ───────────────────────────────────────────

async fn get_path(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AdaptivePath>> {
    Ok(Json(state.paths.path_for_user(&user.user_id).await?))
}

#[derive(Deserialize)]
pub struct ValidatePathRequest {
    #[serde(default)]
    path_id: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ValidatePathResponse {
    pub path_id: String,
    pub is_started: bool,
    pub started_at: Option<String>,
}

async fn validate_path(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(request): ApiJson<ValidatePathRequest>,
) -> Result<Json<ValidatePathResponse>> {
    let validation = state
        .paths
        .validate_path(&user.user_id, &request.path_id)
        .await?;

    Ok(Json(ValidatePathResponse {
        path_id: validation.path_id,
        is_started: validation.is_started,
        started_at: validation.started_at,
    }))
}
