// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Referral reward routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::ReferralReward;
use crate::services::Redemption;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/rewards", get(list_rewards))
        .route("/api/rewards/{reward_id}/redeem", post(redeem))
}

async fn list_rewards(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ReferralReward>>> {
    Ok(Json(state.db.list_rewards().await?))
}

async fn redeem(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(reward_id): Path<String>,
) -> Result<Json<Redemption>> {
    Ok(Json(
        state
            .referrals
            .redeem_reward(&user.user_id, &reward_id)
            .await?,
    ))
}
