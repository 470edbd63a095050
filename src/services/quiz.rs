// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Quiz grading and submission.
//!
//! Scores are on a 0–20 scale: `earned / total * 20`, or 0 when the quiz
//! has no points at all. Grading never fails; an unanswered question or an
//! unknown choice simply earns nothing.

use crate::config::EngineSettings;
use crate::db::{collections, Db, WriteBatch};
use crate::error::{AppError, Result};
use crate::models::{ChapterStatus, Quiz, QuizAttempt};
use crate::services::progression::{Advance, ProgressionLedger};
use crate::time_utils::now_rfc3339;
use serde::Serialize;
use std::collections::BTreeMap;

pub const MAX_SCORE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grade {
    pub earned_points: u64,
    pub total_points: u64,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizOutcome {
    Passed,
    ReferralEligible,
    Failed,
}

/// Convert raw answer values to choice IDs.
///
/// Clients send choice IDs as strings or bare numbers; anything else is
/// treated as unanswered.
pub fn normalize_answers(raw: &BTreeMap<String, serde_json::Value>) -> BTreeMap<String, String> {
    raw.iter()
        .filter_map(|(question_id, value)| {
            let choice_id = match value {
                serde_json::Value::String(s) => s.trim().to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => return None,
            };
            (!choice_id.is_empty()).then(|| (question_id.trim().to_string(), choice_id))
        })
        .collect()
}

/// Grade answers (question ID → choice ID) against a quiz.
pub fn grade(quiz: &Quiz, answers: &BTreeMap<String, String>) -> Grade {
    let mut earned_points: u64 = 0;
    let mut total_points: u64 = 0;

    for question in &quiz.questions {
        let points = u64::from(question.points);
        total_points += points;

        let correct = answers
            .get(&question.id)
            .and_then(|choice_id| question.choice(choice_id))
            .is_some_and(|choice| choice.is_correct);
        if correct {
            earned_points += points;
        }
    }

    let score = if total_points > 0 {
        earned_points as f64 / total_points as f64 * MAX_SCORE
    } else {
        0.0
    };

    Grade {
        earned_points,
        total_points,
        score,
    }
}

pub fn classify(score: f64, settings: &EngineSettings) -> QuizOutcome {
    if score >= settings.pass_threshold {
        QuizOutcome::Passed
    } else if score >= settings.referral_threshold {
        QuizOutcome::ReferralEligible
    } else {
        QuizOutcome::Failed
    }
}

/// Score as stored and reported, rounded to two decimals.
pub fn rounded_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

/// Stored score and the outcome it earns. The outcome always agrees with
/// the score the student is shown.
pub fn assess(raw_score: f64, settings: &EngineSettings) -> (f64, QuizOutcome) {
    let score = rounded_score(raw_score);
    (score, classify(score, settings))
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizSubmission {
    pub attempt_id: String,
    pub score: f64,
    pub passed: bool,
    pub outcome: QuizOutcome,
    pub can_use_referral_option: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_chapter_id: Option<String>,
    pub track_finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrals_needed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_referrals: Option<usize>,
}

/// Quiz as shown to a learner: no correctness flags.
#[derive(Debug, Clone, Serialize)]
pub struct QuizView {
    pub id: String,
    pub chapter_id: String,
    pub questions: Vec<QuizQuestionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizQuestionView {
    pub id: String,
    pub text: String,
    pub order: i32,
    pub points: u32,
    pub choices: Vec<QuizChoiceView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizChoiceView {
    pub id: String,
    pub text: String,
}

impl QuizView {
    fn new(chapter_id: &str, quiz: &Quiz) -> Self {
        let mut questions: Vec<QuizQuestionView> = quiz
            .questions
            .iter()
            .map(|q| QuizQuestionView {
                id: q.id.clone(),
                text: q.text.clone(),
                order: q.order,
                points: q.points,
                choices: q
                    .choices
                    .iter()
                    .map(|c| QuizChoiceView {
                        id: c.id.clone(),
                        text: c.text.clone(),
                    })
                    .collect(),
            })
            .collect();
        questions.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

        Self {
            id: quiz.id.clone(),
            chapter_id: chapter_id.to_string(),
            questions,
        }
    }
}

#[derive(Clone)]
pub struct QuizService {
    db: Db,
    ledger: ProgressionLedger,
    settings: EngineSettings,
}

impl QuizService {
    pub fn new(db: Db, ledger: ProgressionLedger, settings: EngineSettings) -> Self {
        Self {
            db,
            ledger,
            settings,
        }
    }

    pub async fn get_quiz(&self, user_id: &str, chapter_id: &str) -> Result<QuizView> {
        let chapter = self.ledger.chapter(chapter_id).await?;
        let quiz = chapter
            .quiz
            .as_ref()
            .ok_or_else(|| AppError::NotFound(format!("Quiz for chapter {} not found", chapter_id)))?;
        self.ledger.require_purchase(user_id, &chapter).await?;

        Ok(QuizView::new(&chapter.id, quiz))
    }

    /// Grade a submission, log the attempt, and complete the chapter on a pass.
    pub async fn submit_quiz(
        &self,
        user_id: &str,
        chapter_id: &str,
        answers: &BTreeMap<String, serde_json::Value>,
    ) -> Result<QuizSubmission> {
        let chapter = self.ledger.chapter(chapter_id).await?;
        let quiz = chapter
            .quiz
            .clone()
            .ok_or_else(|| AppError::NotFound(format!("Quiz for chapter {} not found", chapter_id)))?;
        self.ledger.require_purchase(user_id, &chapter).await?;

        let _guard = self.ledger.locks().acquire_user(user_id).await;

        let progress = self.ledger.resolve_progress(user_id, &chapter).await?;
        if progress.status == ChapterStatus::Locked {
            tracing::warn!(user_id, chapter_id, "Quiz submitted for a locked chapter");
            return Err(AppError::access_denied(format!(
                "Chapter {} is locked",
                chapter_id
            )));
        }

        let grade = grade(&quiz, &normalize_answers(answers));
        let (score, outcome) = assess(grade.score, &self.settings);
        let passed = outcome == QuizOutcome::Passed;

        let current_referrals = if outcome == QuizOutcome::ReferralEligible {
            Some(self.db.list_referrals(user_id).await?.len())
        } else {
            None
        };

        let previous = self.db.list_quiz_attempts(user_id, &quiz.id).await?;
        let attempt_number = previous
            .iter()
            .map(|a| a.attempt_number)
            .max()
            .unwrap_or(0)
            + 1;

        let attempt = QuizAttempt {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            quiz_id: quiz.id.clone(),
            chapter_id: chapter.id.clone(),
            attempt_number,
            score,
            passed,
            can_retake: !passed,
            referral_option_used: false,
            attempted_at: now_rfc3339(),
        };

        let mut batch = WriteBatch::new();
        batch.set(collections::QUIZ_ATTEMPTS, attempt.id.clone(), &attempt)?;
        let advance = if passed {
            Some(
                self.ledger
                    .stage_completion(&mut batch, user_id, &chapter)
                    .await?,
            )
        } else {
            None
        };
        self.db.commit(batch).await?;

        tracing::info!(
            user_id,
            chapter_id,
            attempt_number,
            score,
            earned = grade.earned_points,
            total = grade.total_points,
            outcome = ?outcome,
            "Quiz attempt recorded"
        );

        let mut submission = QuizSubmission {
            attempt_id: attempt.id,
            score,
            passed,
            outcome,
            can_use_referral_option: outcome == QuizOutcome::ReferralEligible,
            next_chapter_id: None,
            track_finished: false,
            message: None,
            referrals_needed: None,
            current_referrals: None,
        };

        match (outcome, advance) {
            (QuizOutcome::Passed, Some(Advance::NextChapter(next))) => {
                submission.next_chapter_id = Some(next);
            }
            (QuizOutcome::Passed, _) => {
                submission.track_finished = true;
                submission.message =
                    Some("Course completed! Visit your learning center.".to_string());
            }
            (QuizOutcome::ReferralEligible, _) => {
                let needed = self.settings.referral_bypass_count;
                submission.message = Some(format!(
                    "Refer {} members or retake the chapter",
                    needed
                ));
                submission.referrals_needed = Some(needed);
                submission.current_referrals = current_referrals;
            }
            (QuizOutcome::Failed, _) => {
                submission.message = Some("You must retake the chapter".to_string());
            }
        }

        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QuizChoice, QuizQuestion};

    fn question(id: &str, points: u32, correct: &str) -> QuizQuestion {
        QuizQuestion {
            id: id.to_string(),
            text: format!("Question {}", id),
            order: 0,
            points,
            choices: ["a", "b", "c"]
                .iter()
                .map(|c| QuizChoice {
                    id: format!("{}-{}", id, c),
                    text: c.to_string(),
                    is_correct: *c == correct,
                })
                .collect(),
        }
    }

    fn answers(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(q, c)| (q.to_string(), c.to_string()))
            .collect()
    }

    fn quiz() -> Quiz {
        Quiz {
            id: "quiz".to_string(),
            questions: vec![question("q1", 1, "a"), question("q2", 3, "b")],
        }
    }

    #[test]
    fn test_all_correct_scores_twenty() {
        let grade = grade(&quiz(), &answers(&[("q1", "q1-a"), ("q2", "q2-b")]));
        assert_eq!(grade.earned_points, 4);
        assert_eq!(grade.total_points, 4);
        assert_eq!(grade.score, 20.0);
    }

    #[test]
    fn test_all_wrong_scores_zero() {
        let grade = grade(&quiz(), &answers(&[("q1", "q1-b"), ("q2", "q2-c")]));
        assert_eq!(grade.earned_points, 0);
        assert_eq!(grade.score, 0.0);
    }

    #[test]
    fn test_points_are_weighted() {
        let grade = grade(&quiz(), &answers(&[("q2", "q2-b")]));
        assert_eq!(grade.earned_points, 3);
        assert_eq!(grade.score, 15.0);
    }

    #[test]
    fn test_unknown_and_foreign_choices_earn_nothing() {
        // q2-b is correct for q2 but not a choice of q1.
        let grade = grade(
            &quiz(),
            &answers(&[("q1", "q2-b"), ("q2", "missing"), ("q9", "q9-a")]),
        );
        assert_eq!(grade.earned_points, 0);
        assert_eq!(grade.total_points, 4);
    }

    #[test]
    fn test_zero_total_points_scores_zero() {
        let empty = Quiz {
            id: "empty".to_string(),
            questions: vec![question("q1", 0, "a")],
        };
        let grade = grade(&empty, &answers(&[("q1", "q1-a")]));
        assert_eq!(grade.total_points, 0);
        assert_eq!(grade.score, 0.0);

        let no_questions = Quiz {
            id: "none".to_string(),
            questions: Vec::new(),
        };
        assert_eq!(super::grade(&no_questions, &BTreeMap::new()).score, 0.0);
    }

    #[test]
    fn test_classification_boundaries() {
        let settings = EngineSettings::default();
        assert_eq!(classify(20.0, &settings), QuizOutcome::Passed);
        assert_eq!(classify(14.0, &settings), QuizOutcome::Passed);
        assert_eq!(classify(13.99, &settings), QuizOutcome::ReferralEligible);
        assert_eq!(classify(10.0, &settings), QuizOutcome::ReferralEligible);
        assert_eq!(classify(9.99, &settings), QuizOutcome::Failed);
        assert_eq!(classify(0.0, &settings), QuizOutcome::Failed);
    }

    #[test]
    fn test_normalize_accepts_strings_and_numbers() {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(
            r#"{"q1": " c1 ", "q2": 42, "q3": null, "q4": ["x"], "q5": ""}"#,
        )
        .unwrap();

        let normalized = normalize_answers(&raw);

        assert_eq!(normalized, answers(&[("q1", "c1"), ("q2", "42")]));
    }

    #[test]
    fn test_rounded_score() {
        assert_eq!(rounded_score(40.0 / 3.0), 13.33);
        assert_eq!(rounded_score(14.0), 14.0);
    }

    #[test]
    fn test_assess_classifies_the_reported_score() {
        let settings = EngineSettings::default();
        assert_eq!(assess(13.996, &settings), (14.0, QuizOutcome::Passed));
        assert_eq!(assess(13.994, &settings), (13.99, QuizOutcome::ReferralEligible));
        assert_eq!(assess(9.999, &settings), (10.0, QuizOutcome::ReferralEligible));
        assert_eq!(assess(40.0 / 3.0, &settings), (13.33, QuizOutcome::ReferralEligible));
    }
}
