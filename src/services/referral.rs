// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Referral economy.
//!
//! Two separate channels:
//! - points, earned when someone registers with a user's code and spent on
//!   rewards. The balance never goes negative.
//! - the referral count, which unlocks the chapter bypass once it reaches
//!   the configured threshold. The bypass never spends points.

use crate::config::EngineSettings;
use crate::db::{collections, Db, WriteBatch};
use crate::error::{AppError, Result};
use crate::models::{ChapterStatus, PublicUser, ReferralRedemption, RewardKind};
use crate::services::locks::LockRegistry;
use crate::services::onboarding::OnboardingInitializer;
use crate::services::progression::{Advance, ProgressionLedger};
use crate::services::purchase::REFERRAL_PAYMENT_METHOD;
use crate::time_utils::now_rfc3339;
use serde::Serialize;

/// New balance after a debit, or `None` if the balance cannot cover it.
pub fn debit(balance: i64, cost: i64) -> Option<i64> {
    if cost < 0 || balance < cost {
        None
    } else {
        Some(balance - cost)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Redemption {
    pub redemption_id: String,
    pub reward_id: String,
    pub points_spent: i64,
    pub remaining_points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granted_pack_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BypassResult {
    pub chapter_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_chapter_id: Option<String>,
    pub track_finished: bool,
    pub attempt_marked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferralStats {
    pub referral_code: String,
    pub referral_count: usize,
    pub referral_points: i64,
    pub referrals: Vec<PublicUser>,
}

#[derive(Clone)]
pub struct ReferralService {
    db: Db,
    locks: LockRegistry,
    ledger: ProgressionLedger,
    onboarding: OnboardingInitializer,
    settings: EngineSettings,
}

impl ReferralService {
    pub fn new(
        db: Db,
        locks: LockRegistry,
        ledger: ProgressionLedger,
        onboarding: OnboardingInitializer,
        settings: EngineSettings,
    ) -> Self {
        Self {
            db,
            locks,
            ledger,
            onboarding,
            settings,
        }
    }

    /// Spend points on a reward.
    ///
    /// The sufficiency check, the debit, the ledger entry, and any pack
    /// grant happen under the user's lock and commit as one batch.
    pub async fn redeem_reward(&self, user_id: &str, reward_id: &str) -> Result<Redemption> {
        let reward = self
            .db
            .get_reward(reward_id)
            .await?
            .filter(|r| r.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Reward {} not found", reward_id)))?;

        let _guard = self.locks.acquire_user(user_id).await;

        let mut user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let Some(remaining) = debit(user.referral_points, reward.points_required) else {
            tracing::warn!(
                user_id,
                reward_id,
                required = reward.points_required,
                current = user.referral_points,
                "Insufficient referral points"
            );
            return Err(AppError::insufficient(
                "Insufficient referral points",
                reward.points_required,
                user.referral_points,
            ));
        };

        let mut batch = WriteBatch::new();

        let granted_pack_id = match &reward.kind {
            RewardKind::CoursePack { pack_id } => {
                let pack = self.db.get_course_pack(pack_id).await?.ok_or_else(|| {
                    AppError::NotFound(format!("Course pack {} not found", pack_id))
                })?;
                self.onboarding
                    .stage_purchase(&mut batch, user_id, &pack, REFERRAL_PAYMENT_METHOD, 0)
                    .await?;
                Some(pack.id)
            }
            RewardKind::Scholarship { .. } => None,
        };

        user.referral_points = remaining;
        batch.set(collections::USERS, user.id.clone(), &user)?;

        let redemption = ReferralRedemption {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            reward_id: reward.id.clone(),
            points_spent: reward.points_required,
            redeemed_at: now_rfc3339(),
        };
        batch.set(
            collections::REFERRAL_REDEMPTIONS,
            redemption.id.clone(),
            &redemption,
        )?;

        self.db.commit(batch).await?;

        tracing::info!(
            user_id,
            reward_id,
            points_spent = reward.points_required,
            remaining_points = remaining,
            "Reward redeemed"
        );

        Ok(Redemption {
            redemption_id: redemption.id,
            reward_id: reward.id,
            points_spent: reward.points_required,
            remaining_points: remaining,
            granted_pack_id,
        })
    }

    /// Complete a chapter on the strength of the user's referral count.
    pub async fn use_referral_bypass(&self, user_id: &str, chapter_id: &str) -> Result<BypassResult> {
        let chapter = self.ledger.chapter(chapter_id).await?;

        let required = self.settings.referral_bypass_count;
        let current = self.db.list_referrals(user_id).await?.len();
        if current < required as usize {
            tracing::warn!(
                user_id,
                chapter_id,
                required,
                current,
                "Referral bypass refused"
            );
            return Err(AppError::insufficient(
                format!("You need to refer {} members", required),
                i64::from(required),
                current as i64,
            ));
        }

        self.ledger.require_purchase(user_id, &chapter).await?;

        let _guard = self.locks.acquire_user(user_id).await;

        let progress = self.ledger.resolve_progress(user_id, &chapter).await?;
        if progress.status == ChapterStatus::Locked {
            tracing::warn!(user_id, chapter_id, "Referral bypass on a locked chapter");
            return Err(AppError::access_denied(format!(
                "Chapter {} is locked",
                chapter_id
            )));
        }

        let mut batch = WriteBatch::new();
        let advance = self
            .ledger
            .stage_completion(&mut batch, user_id, &chapter)
            .await?;

        let mut attempt_marked = false;
        if let Some(quiz) = &chapter.quiz {
            let latest = self
                .db
                .list_quiz_attempts(user_id, &quiz.id)
                .await?
                .into_iter()
                .next();
            if let Some(mut attempt) = latest {
                attempt.referral_option_used = true;
                batch.set(collections::QUIZ_ATTEMPTS, attempt.id.clone(), &attempt)?;
                attempt_marked = true;
            }
        }

        self.db.commit(batch).await?;

        tracing::info!(
            user_id,
            chapter_id,
            referrals = current,
            attempt_marked,
            "Chapter completed by referral bypass"
        );

        Ok(BypassResult {
            chapter_id: chapter.id,
            next_chapter_id: advance.next_chapter_id().map(str::to_string),
            track_finished: advance == Advance::TrackFinished,
            attempt_marked,
        })
    }

    pub async fn referral_stats(&self, user_id: &str) -> Result<ReferralStats> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        let referrals = self.db.list_referrals(user_id).await?;

        Ok(ReferralStats {
            referral_code: user.referral_code,
            referral_count: referrals.len(),
            referral_points: user.referral_points,
            referrals: referrals.iter().map(PublicUser::from).collect(),
        })
    }
}
