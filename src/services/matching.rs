// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile matching: stores a user's answers and ranks profiles by the
//! summed weights of the answers currently selected.
//!
//! Ranking is by total score descending; equal scores are ordered by
//! ascending profile ID so results are deterministic.

use crate::db::{collections, pair_id, Db, WriteBatch};
use crate::error::{AppError, Result};
use crate::models::{MatchingQuestion, Profile, ProfileWeights, UserMatchingResponse};
use crate::services::locks::LockRegistry;
use crate::time_utils::now_rfc3339;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Number of profiles recommended after a submission.
pub const RECOMMENDATION_COUNT: usize = 3;

/// Total weight a user's answers give to one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileScore {
    pub profile_id: String,
    pub score: i64,
}

/// Sum the weights of the selected answers per profile and rank them.
pub fn score_profiles<'a, I>(selected: I) -> Vec<ProfileScore>
where
    I: IntoIterator<Item = &'a ProfileWeights>,
{
    let mut totals: BTreeMap<&'a str, i64> = BTreeMap::new();
    for weights in selected {
        for (profile_id, weight) in weights.iter() {
            let total = totals.entry(profile_id).or_insert(0);
            *total = total.saturating_add(weight);
        }
    }

    let mut scores: Vec<ProfileScore> = totals
        .into_iter()
        .map(|(profile_id, score)| ProfileScore {
            profile_id: profile_id.to_string(),
            score,
        })
        .collect();

    scores.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.profile_id.cmp(&b.profile_id))
    });
    scores
}

/// One (question, answer) pair of a submission.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseInput {
    #[serde(default)]
    pub question_id: String,
    #[serde(default)]
    pub answer_id: String,
}

/// Result of a matching submission.
#[derive(Debug, Clone)]
pub struct MatchingOutcome {
    pub scores: Vec<ProfileScore>,
    pub recommended: Vec<Profile>,
}

#[derive(Clone)]
pub struct MatchingService {
    db: Db,
    locks: LockRegistry,
}

impl MatchingService {
    pub fn new(db: Db, locks: LockRegistry) -> Self {
        Self { db, locks }
    }

    /// Store a batch of answers and return fresh recommendations.
    ///
    /// The whole batch is checked before anything is written: one missing
    /// or unknown ID rejects the batch and leaves stored answers untouched.
    /// Within a batch, a later pair for the same question wins.
    pub async fn submit_responses(
        &self,
        user_id: &str,
        responses: &[ResponseInput],
    ) -> Result<MatchingOutcome> {
        if responses.is_empty() {
            return Err(AppError::validation("responses", "No responses provided"));
        }

        let mut questions: HashMap<String, MatchingQuestion> = HashMap::new();
        let mut selections: BTreeMap<String, String> = BTreeMap::new();

        for (index, response) in responses.iter().enumerate() {
            let question_id = response.question_id.trim();
            let answer_id = response.answer_id.trim();

            if question_id.is_empty() {
                return Err(AppError::validation(
                    format!("responses[{}].question_id", index),
                    "question_id is required",
                ));
            }
            if answer_id.is_empty() {
                return Err(AppError::validation(
                    format!("responses[{}].answer_id", index),
                    "answer_id is required",
                ));
            }

            if !questions.contains_key(question_id) {
                let question = self
                    .db
                    .get_matching_question(question_id)
                    .await?
                    .filter(|q| q.is_active)
                    .ok_or_else(|| {
                        AppError::validation(
                            format!("responses[{}].question_id", index),
                            format!("Unknown question {}", question_id),
                        )
                    })?;
                questions.insert(question_id.to_string(), question);
            }

            let known_answer = questions
                .get(question_id)
                .is_some_and(|q| q.answer(answer_id).is_some());
            if !known_answer {
                return Err(AppError::validation(
                    format!("responses[{}].answer_id", index),
                    format!(
                        "Answer {} does not belong to question {}",
                        answer_id, question_id
                    ),
                ));
            }

            selections.insert(question_id.to_string(), answer_id.to_string());
        }

        {
            let _guard = self.locks.acquire_user(user_id).await;
            let now = now_rfc3339();
            let mut batch = WriteBatch::new();
            for (question_id, answer_id) in &selections {
                let response = UserMatchingResponse {
                    user_id: user_id.to_string(),
                    question_id: question_id.clone(),
                    answer_id: answer_id.clone(),
                    updated_at: now.clone(),
                };
                batch.set(
                    collections::MATCHING_RESPONSES,
                    pair_id(user_id, question_id),
                    &response,
                )?;
            }
            self.db.commit(batch).await?;
        }

        tracing::info!(
            user_id,
            answers = selections.len(),
            "Stored matching responses"
        );

        self.recommend(user_id).await
    }

    /// Rank profiles from the user's current answers.
    ///
    /// Answers to questions that no longer exist are ignored, and profile
    /// IDs without an active profile are skipped before taking the top
    /// [`RECOMMENDATION_COUNT`].
    pub async fn recommend(&self, user_id: &str) -> Result<MatchingOutcome> {
        let responses = self.db.list_matching_responses(user_id).await?;
        if responses.is_empty() {
            return Ok(MatchingOutcome {
                scores: Vec::new(),
                recommended: Vec::new(),
            });
        }

        let questions: HashMap<String, MatchingQuestion> = self
            .db
            .list::<MatchingQuestion>(collections::MATCHING_QUESTIONS)
            .await?
            .into_iter()
            .map(|q| (q.id.clone(), q))
            .collect();

        let selected: Vec<&ProfileWeights> = responses
            .iter()
            .filter_map(|r| {
                questions
                    .get(&r.question_id)
                    .and_then(|q| q.answer(&r.answer_id))
                    .map(|a| &a.profile_weights)
            })
            .collect();

        let scores = score_profiles(selected);

        let profiles: HashMap<String, Profile> = self
            .db
            .list_profiles()
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let recommended: Vec<Profile> = scores
            .iter()
            .filter_map(|s| profiles.get(&s.profile_id).cloned())
            .take(RECOMMENDATION_COUNT)
            .collect();

        tracing::debug!(
            user_id,
            scored = scores.len(),
            recommended = recommended.len(),
            "Computed profile recommendations"
        );

        Ok(MatchingOutcome {
            scores,
            recommended,
        })
    }

    /// Record the profile a user picked and mark matching as completed.
    pub async fn select_profile(&self, user_id: &str, profile_id: &str) -> Result<Profile> {
        let profile = self
            .db
            .get_profile(profile_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", profile_id)))?;

        let _guard = self.locks.acquire_user(user_id).await;
        let mut user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        user.selected_profile = Some(profile.id.clone());
        user.has_completed_matching = true;
        self.db.set(collections::USERS, &user.id, &user).await?;

        tracing::info!(user_id, profile_id, "Profile selected");
        Ok(profile)
    }
}
