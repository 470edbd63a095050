// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course pack, chapter progress, and quiz routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::routes::extract::ApiJson;
use crate::models::{ChapterStatus, CoursePack};
use crate::services::{BypassResult, QuizSubmission, QuizView};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/courses", get(list_courses))
        .route("/api/courses/mine", get(my_courses))
        .route("/api/courses/{pack_id}/purchase", post(purchase))
        .route("/api/chapters/{chapter_id}/progress", get(chapter_progress))
        .route("/api/chapters/{chapter_id}/quiz", get(get_quiz))
        .route("/api/chapters/{chapter_id}/quiz/submit", post(submit_quiz))
        .route(
            "/api/chapters/{chapter_id}/referral-bypass",
            post(referral_bypass),
        )
}

// ─── Catalog ─────────────────────────────────────────────────

async fn list_courses(State(state): State<Arc<AppState>>) -> Result<Json<Vec<CoursePack>>> {
    Ok(Json(state.db.list_course_packs().await?))
}

async fn my_courses(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<CoursePack>>> {
    Ok(Json(state.purchases.purchased_packs(&user.user_id).await?))
}

// ─── Purchase ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PurchaseRequest {
    #[serde(default)]
    payment_method: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PurchaseResponse {
    pub purchase_id: String,
    pub chapters_unlocked: usize,
}

async fn purchase(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(pack_id): Path<String>,
    ApiJson(request): ApiJson<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>> {
    let receipt = state
        .purchases
        .purchase_course_pack(&user.user_id, &pack_id, &request.payment_method)
        .await?;

    Ok(Json(PurchaseResponse {
        purchase_id: receipt.purchase_id,
        chapters_unlocked: receipt.chapters_unlocked,
    }))
}

// ─── Chapters ────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChapterProgressResponse {
    pub chapter_id: String,
    pub pack_id: String,
    pub status: ChapterStatus,
    pub last_accessed: String,
}

async fn chapter_progress(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(chapter_id): Path<String>,
) -> Result<Json<ChapterProgressResponse>> {
    let progress = state
        .progression
        .get_chapter_progress(&user.user_id, &chapter_id)
        .await?;

    Ok(Json(ChapterProgressResponse {
        chapter_id: progress.chapter_id,
        pack_id: progress.pack_id,
        status: progress.status,
        last_accessed: progress.last_accessed,
    }))
}

async fn get_quiz(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(chapter_id): Path<String>,
) -> Result<Json<QuizView>> {
    Ok(Json(state.quizzes.get_quiz(&user.user_id, &chapter_id).await?))
}

#[derive(Deserialize)]
pub struct SubmitQuizRequest {
    /// Question ID → chosen choice ID.
    #[serde(default)]
    answers: BTreeMap<String, serde_json::Value>,
}

async fn submit_quiz(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(chapter_id): Path<String>,
    ApiJson(request): ApiJson<SubmitQuizRequest>,
) -> Result<Json<QuizSubmission>> {
    Ok(Json(
        state
            .quizzes
            .submit_quiz(&user.user_id, &chapter_id, &request.answers)
            .await?,
    ))
}

async fn referral_bypass(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(chapter_id): Path<String>,
) -> Result<Json<BypassResult>> {
    Ok(Json(
        state
            .referrals
            .use_referral_bypass(&user.user_id, &chapter_id)
            .await?,
    ))
}
