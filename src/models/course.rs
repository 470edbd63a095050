// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course catalog, purchases, chapter progress and quiz attempts.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Paid bundle of ordered chapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoursePack {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub description: String,
    /// Price in the smallest currency unit
    pub price: i64,
    pub profile_id: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// One choice of a quiz question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizChoice {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default)]
    pub choices: Vec<QuizChoice>,
}

impl QuizQuestion {
    pub fn choice(&self, choice_id: &str) -> Option<&QuizChoice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }
}

/// End-of-chapter quiz, embedded in its chapter document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

/// Chapter of a course pack. `order` is unique within the pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub pack_id: String,
    pub title: String,
    pub order: i32,
    #[serde(default)]
    pub content_text: String,
    #[serde(default)]
    pub video_url: String,
    pub quiz: Option<Quiz>,
}

/// Record of a user owning a course pack.
///
/// Document ID is `{user_id}_{pack_id}`; there is never more than one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCoursePurchase {
    pub id: String,
    pub user_id: String,
    pub pack_id: String,
    pub payment_method: String,
    pub amount_paid: i64,
    pub purchased_at: String,
}

/// Gate state of a chapter for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChapterStatus {
    Locked,
    InProgress,
    Completed,
}

impl ChapterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChapterStatus::Locked => "LOCKED",
            ChapterStatus::InProgress => "IN_PROGRESS",
            ChapterStatus::Completed => "COMPLETED",
        }
    }
}

/// Progress row, document ID `{user_id}_{chapter_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterProgress {
    pub user_id: String,
    pub chapter_id: String,
    pub pack_id: String,
    pub status: ChapterStatus,
    pub last_accessed: String,
}

/// Append-only log entry for each quiz submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: String,
    pub user_id: String,
    pub quiz_id: String,
    pub chapter_id: String,
    /// 1-based position among this user's attempts at the quiz
    pub attempt_number: u32,
    /// Score on the 0-20 scale, rounded to two decimals
    pub score: f64,
    pub passed: bool,
    pub can_retake: bool,
    #[serde(default)]
    pub referral_option_used: bool,
    pub attempted_at: String,
}

fn default_true() -> bool {
    true
}

fn default_points() -> u32 {
    1
}
