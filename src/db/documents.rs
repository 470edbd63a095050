// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed operations on top of the document store.

use super::{collections, firestore::BATCH_SIZE, pair_id, Db, WriteBatch};
use crate::error::AppError;
use crate::models::{
    AcademicLevel, AdaptivePath, Chapter, ChapterProgress, CoursePack, MatchingQuestion, Profile,
    QuizAttempt, ReferralRedemption, ReferralReward, User, UserCoursePurchase,
    UserMatchingResponse, UserPathValidation,
};

impl Db {
    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get(collections::USERS, user_id).await
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .query::<User>(collections::USERS, &[("username", username)])
            .await?
            .into_iter()
            .next())
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .query::<User>(collections::USERS, &[("email", email)])
            .await?
            .into_iter()
            .next())
    }

    pub async fn find_user_by_referral_code(&self, code: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .query::<User>(collections::USERS, &[("referral_code", code)])
            .await?
            .into_iter()
            .next())
    }

    /// Users who registered with `user_id`'s referral code.
    pub async fn list_referrals(&self, user_id: &str) -> Result<Vec<User>, AppError> {
        let mut referrals: Vec<User> = self
            .query(collections::USERS, &[("referred_by", user_id)])
            .await?;
        referrals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(referrals)
    }

    // ─── Matching Operations ─────────────────────────────────────

    pub async fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>, AppError> {
        self.get(collections::PROFILES, profile_id).await
    }

    /// Active profiles sorted by name.
    pub async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        let mut profiles: Vec<Profile> = self.list(collections::PROFILES).await?;
        profiles.retain(|p| p.is_active);
        profiles.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(profiles)
    }

    pub async fn get_matching_question(
        &self,
        question_id: &str,
    ) -> Result<Option<MatchingQuestion>, AppError> {
        self.get(collections::MATCHING_QUESTIONS, question_id).await
    }

    /// Active matching questions in display order.
    pub async fn list_matching_questions(&self) -> Result<Vec<MatchingQuestion>, AppError> {
        let mut questions: Vec<MatchingQuestion> =
            self.list(collections::MATCHING_QUESTIONS).await?;
        questions.retain(|q| q.is_active);
        questions.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(questions)
    }

    pub async fn list_matching_responses(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserMatchingResponse>, AppError> {
        self.query(collections::MATCHING_RESPONSES, &[("user_id", user_id)])
            .await
    }

    // ─── Adaptive Path Operations ────────────────────────────────

    pub async fn get_adaptive_path(&self, path_id: &str) -> Result<Option<AdaptivePath>, AppError> {
        self.get(collections::ADAPTIVE_PATHS, path_id).await
    }

    pub async fn find_adaptive_path(
        &self,
        profile_id: &str,
        level: AcademicLevel,
    ) -> Result<Option<AdaptivePath>, AppError> {
        let paths: Vec<AdaptivePath> = self
            .query(collections::ADAPTIVE_PATHS, &[("profile_id", profile_id)])
            .await?;
        Ok(paths.into_iter().find(|p| p.academic_level == level))
    }

    pub async fn get_path_validation(
        &self,
        user_id: &str,
    ) -> Result<Option<UserPathValidation>, AppError> {
        self.get(collections::PATH_VALIDATIONS, user_id).await
    }

    // ─── Course Catalog Operations ───────────────────────────────

    pub async fn get_course_pack(&self, pack_id: &str) -> Result<Option<CoursePack>, AppError> {
        self.get(collections::COURSE_PACKS, pack_id).await
    }

    /// Active course packs sorted by title.
    pub async fn list_course_packs(&self) -> Result<Vec<CoursePack>, AppError> {
        let mut packs: Vec<CoursePack> = self.list(collections::COURSE_PACKS).await?;
        packs.retain(|p| p.is_active);
        packs.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(packs)
    }

    pub async fn get_chapter(&self, chapter_id: &str) -> Result<Option<Chapter>, AppError> {
        self.get(collections::CHAPTERS, chapter_id).await
    }

    /// Chapters of a pack in ascending `order`.
    pub async fn list_chapters_for_pack(&self, pack_id: &str) -> Result<Vec<Chapter>, AppError> {
        let mut chapters: Vec<Chapter> = self
            .query(collections::CHAPTERS, &[("pack_id", pack_id)])
            .await?;
        chapters.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(chapters)
    }

    // ─── Purchase & Progress Operations ──────────────────────────

    pub async fn get_purchase(
        &self,
        user_id: &str,
        pack_id: &str,
    ) -> Result<Option<UserCoursePurchase>, AppError> {
        self.get(collections::PURCHASES, &pair_id(user_id, pack_id))
            .await
    }

    pub async fn list_purchases_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserCoursePurchase>, AppError> {
        let mut purchases: Vec<UserCoursePurchase> = self
            .query(collections::PURCHASES, &[("user_id", user_id)])
            .await?;
        purchases.sort_by(|a, b| a.purchased_at.cmp(&b.purchased_at));
        Ok(purchases)
    }

    pub async fn get_progress(
        &self,
        user_id: &str,
        chapter_id: &str,
    ) -> Result<Option<ChapterProgress>, AppError> {
        self.get(collections::CHAPTER_PROGRESS, &pair_id(user_id, chapter_id))
            .await
    }

    pub async fn list_progress_for_pack(
        &self,
        user_id: &str,
        pack_id: &str,
    ) -> Result<Vec<ChapterProgress>, AppError> {
        self.query(
            collections::CHAPTER_PROGRESS,
            &[("user_id", user_id), ("pack_id", pack_id)],
        )
        .await
    }

    /// Attempts at a quiz, most recent first.
    pub async fn list_quiz_attempts(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> Result<Vec<QuizAttempt>, AppError> {
        let mut attempts: Vec<QuizAttempt> = self
            .query(
                collections::QUIZ_ATTEMPTS,
                &[("user_id", user_id), ("quiz_id", quiz_id)],
            )
            .await?;
        attempts.sort_by(|a, b| b.attempt_number.cmp(&a.attempt_number));
        Ok(attempts)
    }

    // ─── Referral Operations ─────────────────────────────────────

    pub async fn get_reward(&self, reward_id: &str) -> Result<Option<ReferralReward>, AppError> {
        self.get(collections::REFERRAL_REWARDS, reward_id).await
    }

    /// Active rewards, cheapest first.
    pub async fn list_rewards(&self) -> Result<Vec<ReferralReward>, AppError> {
        let mut rewards: Vec<ReferralReward> = self.list(collections::REFERRAL_REWARDS).await?;
        rewards.retain(|r| r.is_active);
        rewards.sort_by(|a, b| {
            a.points_required
                .cmp(&b.points_required)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(rewards)
    }

    pub async fn list_redemptions(
        &self,
        user_id: &str,
    ) -> Result<Vec<ReferralRedemption>, AppError> {
        let mut redemptions: Vec<ReferralRedemption> = self
            .query(collections::REFERRAL_REDEMPTIONS, &[("user_id", user_id)])
            .await?;
        redemptions.sort_by(|a, b| a.redeemed_at.cmp(&b.redeemed_at));
        Ok(redemptions)
    }

    // ─── User Data Deletion ──────────────────────────────────────

    /// Delete a user and every record that belongs to them.
    ///
    /// Users they referred keep a dangling `referred_by` ID; it is a weak
    /// reference and only counts toward the deleted user's referrals.
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_user_data(&self, user_id: &str) -> Result<usize, AppError> {
        let mut ids: Vec<(&'static str, String)> = Vec::new();

        let responses = self.list_matching_responses(user_id).await?;
        ids.extend(responses.iter().map(|r| {
            (
                collections::MATCHING_RESPONSES,
                pair_id(user_id, &r.question_id),
            )
        }));

        let purchases = self.list_purchases_for_user(user_id).await?;
        ids.extend(
            purchases
                .iter()
                .map(|p| (collections::PURCHASES, p.id.clone())),
        );

        let progress: Vec<ChapterProgress> = self
            .query(collections::CHAPTER_PROGRESS, &[("user_id", user_id)])
            .await?;
        ids.extend(progress.iter().map(|p| {
            (
                collections::CHAPTER_PROGRESS,
                pair_id(user_id, &p.chapter_id),
            )
        }));

        let attempts: Vec<QuizAttempt> = self
            .query(collections::QUIZ_ATTEMPTS, &[("user_id", user_id)])
            .await?;
        ids.extend(
            attempts
                .iter()
                .map(|a| (collections::QUIZ_ATTEMPTS, a.id.clone())),
        );

        let redemptions = self.list_redemptions(user_id).await?;
        ids.extend(
            redemptions
                .iter()
                .map(|r| (collections::REFERRAL_REDEMPTIONS, r.id.clone())),
        );

        if self.get_path_validation(user_id).await?.is_some() {
            ids.push((collections::PATH_VALIDATIONS, user_id.to_string()));
        }

        // The user document goes last so a partial failure can be retried.
        ids.push((collections::USERS, user_id.to_string()));

        let deleted_count = ids.len();
        for chunk in ids.chunks(BATCH_SIZE) {
            let mut batch = WriteBatch::new();
            for (collection, id) in chunk {
                batch.delete(collection, id.clone());
            }
            self.commit(batch).await?;
        }

        tracing::info!(user_id, deleted_count, "User data deletion complete");
        Ok(deleted_count)
    }
}
