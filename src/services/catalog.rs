// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Catalog seeding: profiles, matching questions, course packs with their
//! chapters and quizzes, rewards, and adaptive paths from a JSON file.

use crate::db::{collections, firestore::BATCH_SIZE, Db, WriteBatch};
use crate::models::{
    AdaptivePath, Chapter, CoursePack, MatchingQuestion, Profile, Quiz, ReferralReward, RewardKind,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// A chapter as written inside its pack in the catalog file.
#[derive(Debug, Clone, Deserialize)]
pub struct ChapterSeed {
    pub id: String,
    pub title: String,
    pub order: i32,
    #[serde(default)]
    pub content_text: String,
    #[serde(default)]
    pub video_url: String,
    pub quiz: Option<Quiz>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackSeed {
    #[serde(flatten)]
    pub pack: CoursePack,
    #[serde(default)]
    pub chapters: Vec<ChapterSeed>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub matching_questions: Vec<MatchingQuestion>,
    #[serde(default)]
    pub course_packs: Vec<PackSeed>,
    #[serde(default)]
    pub rewards: Vec<ReferralReward>,
    #[serde(default)]
    pub adaptive_paths: Vec<AdaptivePath>,
}

/// Documents written by [`CatalogSeed::seed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub profiles: usize,
    pub matching_questions: usize,
    pub course_packs: usize,
    pub chapters: usize,
    pub rewards: usize,
    pub adaptive_paths: usize,
}

impl CatalogSeed {
    /// Load and validate a catalog from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let json_data =
            fs::read_to_string(path.as_ref()).map_err(|e| CatalogError::IoError(e.to_string()))?;
        Self::load_from_json(&json_data)
    }

    /// Load and validate a catalog from a JSON string.
    pub fn load_from_json(json_data: &str) -> Result<Self, CatalogError> {
        let seed: CatalogSeed =
            serde_json::from_str(json_data).map_err(|e| CatalogError::ParseError(e.to_string()))?;
        seed.validate()?;
        Ok(seed)
    }

    /// Chapters with their owning pack ID filled in.
    pub fn chapters(&self) -> Vec<Chapter> {
        self.course_packs
            .iter()
            .flat_map(|p| {
                p.chapters.iter().map(|c| Chapter {
                    id: c.id.clone(),
                    pack_id: p.pack.id.clone(),
                    title: c.title.clone(),
                    order: c.order,
                    content_text: c.content_text.clone(),
                    video_url: c.video_url.clone(),
                    quiz: c.quiz.clone(),
                })
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        unique_ids("profiles", self.profiles.iter().map(|p| p.id.as_str()))?;
        unique_ids(
            "matching_questions",
            self.matching_questions.iter().map(|q| q.id.as_str()),
        )?;
        unique_ids(
            "course_packs",
            self.course_packs.iter().map(|p| p.pack.id.as_str()),
        )?;
        unique_ids(
            "chapters",
            self.course_packs
                .iter()
                .flat_map(|p| p.chapters.iter().map(|c| c.id.as_str())),
        )?;
        unique_ids("rewards", self.rewards.iter().map(|r| r.id.as_str()))?;
        unique_ids(
            "adaptive_paths",
            self.adaptive_paths.iter().map(|a| a.id.as_str()),
        )?;

        let profile_ids: HashSet<&str> = self.profiles.iter().map(|p| p.id.as_str()).collect();
        let pack_ids: HashSet<&str> = self
            .course_packs
            .iter()
            .map(|p| p.pack.id.as_str())
            .collect();

        for question in &self.matching_questions {
            unique_ids(
                &format!("answers of question {}", question.id),
                question.answers.iter().map(|a| a.id.as_str()),
            )?;
            for answer in &question.answers {
                for (profile_id, _) in answer.profile_weights.iter() {
                    if !profile_ids.contains(profile_id) {
                        tracing::warn!(
                            question_id = %question.id,
                            answer_id = %answer.id,
                            profile_id,
                            "Answer weight references an unknown profile"
                        );
                    }
                }
            }
        }

        for seed in &self.course_packs {
            if seed.pack.price < 0 {
                return Err(CatalogError::Invalid(format!(
                    "course pack {} has a negative price",
                    seed.pack.id
                )));
            }

            let mut orders = HashSet::new();
            for chapter in &seed.chapters {
                if !orders.insert(chapter.order) {
                    return Err(CatalogError::Invalid(format!(
                        "course pack {} has two chapters with order {}",
                        seed.pack.id, chapter.order
                    )));
                }
                if let Some(quiz) = &chapter.quiz {
                    validate_quiz(&chapter.id, quiz)?;
                }
            }
        }

        for reward in &self.rewards {
            if reward.points_required < 0 {
                return Err(CatalogError::Invalid(format!(
                    "reward {} has a negative cost",
                    reward.id
                )));
            }
            if let RewardKind::CoursePack { pack_id } = &reward.kind {
                if !pack_ids.contains(pack_id.as_str()) {
                    return Err(CatalogError::Invalid(format!(
                        "reward {} grants unknown course pack {}",
                        reward.id, pack_id
                    )));
                }
            }
        }

        for path in &self.adaptive_paths {
            if !profile_ids.contains(path.profile_id.as_str()) {
                return Err(CatalogError::Invalid(format!(
                    "adaptive path {} references unknown profile {}",
                    path.id, path.profile_id
                )));
            }
        }

        Ok(())
    }

    /// Write the whole catalog into the store, replacing documents with the
    /// same IDs.
    pub async fn seed(&self, db: &Db) -> Result<SeedSummary, CatalogError> {
        let mut batches: Vec<WriteBatch> = Vec::new();

        for profile in &self.profiles {
            stage(&mut batches, collections::PROFILES, &profile.id, profile)?;
        }
        for question in &self.matching_questions {
            stage(
                &mut batches,
                collections::MATCHING_QUESTIONS,
                &question.id,
                question,
            )?;
        }
        for seed in &self.course_packs {
            stage(
                &mut batches,
                collections::COURSE_PACKS,
                &seed.pack.id,
                &seed.pack,
            )?;
        }
        let chapters = self.chapters();
        for chapter in &chapters {
            stage(&mut batches, collections::CHAPTERS, &chapter.id, chapter)?;
        }
        for reward in &self.rewards {
            stage(
                &mut batches,
                collections::REFERRAL_REWARDS,
                &reward.id,
                reward,
            )?;
        }
        for path in &self.adaptive_paths {
            stage(&mut batches, collections::ADAPTIVE_PATHS, &path.id, path)?;
        }

        for batch in batches {
            db.commit(batch)
                .await
                .map_err(|e| CatalogError::StoreError(e.to_string()))?;
        }

        let summary = SeedSummary {
            profiles: self.profiles.len(),
            matching_questions: self.matching_questions.len(),
            course_packs: self.course_packs.len(),
            chapters: chapters.len(),
            rewards: self.rewards.len(),
            adaptive_paths: self.adaptive_paths.len(),
        };
        tracing::info!(?summary, "Catalog seeded");
        Ok(summary)
    }
}

/// Stage a document, starting a new batch when the current one is full.
fn stage<T: Serialize>(
    batches: &mut Vec<WriteBatch>,
    collection: &'static str,
    id: &str,
    doc: &T,
) -> Result<(), CatalogError> {
    let full = batches.last().map_or(true, |b| b.len() >= BATCH_SIZE);
    if full {
        batches.push(WriteBatch::new());
    }
    if let Some(batch) = batches.last_mut() {
        batch
            .set(collection, id, doc)
            .map_err(|e| CatalogError::ParseError(e.to_string()))?;
    }
    Ok(())
}

fn unique_ids<'a>(what: &str, ids: impl Iterator<Item = &'a str>) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(CatalogError::Invalid(format!("{} contains an empty ID", what)));
        }
        if !seen.insert(id) {
            return Err(CatalogError::Invalid(format!(
                "{} contains duplicate ID {}",
                what, id
            )));
        }
    }
    Ok(())
}

/// Each quiz question needs exactly one correct choice.
fn validate_quiz(chapter_id: &str, quiz: &Quiz) -> Result<(), CatalogError> {
    for question in &quiz.questions {
        let correct = question.choices.iter().filter(|c| c.is_correct).count();
        if correct != 1 {
            return Err(CatalogError::Invalid(format!(
                "question {} in the quiz of chapter {} has {} correct choices",
                question.id, chapter_id, correct
            )));
        }
    }
    Ok(())
}

/// Errors from catalog loading.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid catalog: {0}")]
    Invalid(String),

    #[error("Store error: {0}")]
    StoreError(String),
}
