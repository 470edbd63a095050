// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Purchase recording and initial chapter progress for a course pack.
//!
//! A purchase and the progress rows it seeds are staged into the same
//! [`WriteBatch`], so a purchase is never visible without its chapters.

use crate::db::{collections, pair_id, Db, WriteBatch};
use crate::error::{AppError, Result};
use crate::models::{Chapter, ChapterProgress, ChapterStatus, CoursePack, UserCoursePurchase};
use crate::services::progression::progress_row;
use crate::time_utils::now_rfc3339;
use std::collections::HashSet;

/// Progress rows to create for a newly purchased pack.
///
/// `chapters` must be sorted by `order`. The first chapter starts
/// IN_PROGRESS and every other chapter starts LOCKED. Chapters listed in
/// `existing` already have a row and are left alone.
pub fn initial_progress(
    user_id: &str,
    chapters: &[Chapter],
    existing: &HashSet<String>,
    now: &str,
) -> Vec<ChapterProgress> {
    chapters
        .iter()
        .enumerate()
        .filter(|(_, chapter)| !existing.contains(&chapter.id))
        .map(|(index, chapter)| {
            let status = if index == 0 {
                ChapterStatus::InProgress
            } else {
                ChapterStatus::Locked
            };
            progress_row(user_id, chapter, status, now)
        })
        .collect()
}

/// A purchase staged into a batch.
#[derive(Debug, Clone)]
pub struct StagedPurchase {
    pub purchase: UserCoursePurchase,
    /// Chapters of the pack covered by the purchase.
    pub chapters_unlocked: usize,
}

#[derive(Clone)]
pub struct OnboardingInitializer {
    db: Db,
}

impl OnboardingInitializer {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Stage a purchase record plus the pack's initial progress rows.
    ///
    /// Fails with Conflict if the user already owns the pack. The caller
    /// must hold the user's lock and commit `batch`.
    pub async fn stage_purchase(
        &self,
        batch: &mut WriteBatch,
        user_id: &str,
        pack: &CoursePack,
        payment_method: &str,
        amount_paid: i64,
    ) -> Result<StagedPurchase> {
        let purchase_id = pair_id(user_id, &pack.id);
        if self.db.get_purchase(user_id, &pack.id).await?.is_some() {
            tracing::warn!(user_id, pack_id = %pack.id, "Duplicate course pack purchase");
            return Err(AppError::Conflict(format!(
                "Course pack {} has already been purchased",
                pack.id
            )));
        }

        let chapters = self.db.list_chapters_for_pack(&pack.id).await?;
        let existing: HashSet<String> = self
            .db
            .list_progress_for_pack(user_id, &pack.id)
            .await?
            .into_iter()
            .map(|p| p.chapter_id)
            .collect();

        let now = now_rfc3339();
        let purchase = UserCoursePurchase {
            id: purchase_id.clone(),
            user_id: user_id.to_string(),
            pack_id: pack.id.clone(),
            payment_method: payment_method.to_string(),
            amount_paid,
            purchased_at: now.clone(),
        };
        batch.set(collections::PURCHASES, purchase_id, &purchase)?;

        let rows = initial_progress(user_id, &chapters, &existing, &now);
        for row in &rows {
            batch.set(
                collections::CHAPTER_PROGRESS,
                pair_id(user_id, &row.chapter_id),
                row,
            )?;
        }

        tracing::debug!(
            user_id,
            pack_id = %pack.id,
            chapters = chapters.len(),
            seeded = rows.len(),
            "Staged course pack purchase"
        );

        Ok(StagedPurchase {
            purchase,
            chapters_unlocked: chapters.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(id: &str, order: i32) -> Chapter {
        Chapter {
            id: id.to_string(),
            pack_id: "pack".to_string(),
            title: id.to_string(),
            order,
            content_text: String::new(),
            video_url: String::new(),
            quiz: None,
        }
    }

    #[test]
    fn test_first_chapter_in_progress_rest_locked() {
        let chapters = vec![chapter("a", 1), chapter("b", 2), chapter("c", 3)];
        let rows = initial_progress("u1", &chapters, &HashSet::new(), "now");

        let statuses: Vec<(&str, ChapterStatus)> = rows
            .iter()
            .map(|r| (r.chapter_id.as_str(), r.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("a", ChapterStatus::InProgress),
                ("b", ChapterStatus::Locked),
                ("c", ChapterStatus::Locked),
            ]
        );
        assert!(rows.iter().all(|r| r.user_id == "u1" && r.pack_id == "pack"));
    }

    #[test]
    fn test_existing_rows_are_not_recreated() {
        let chapters = vec![chapter("a", 1), chapter("b", 2)];
        let existing: HashSet<String> = ["a".to_string()].into_iter().collect();

        let rows = initial_progress("u1", &chapters, &existing, "now");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].chapter_id, "b");
        assert_eq!(rows[0].status, ChapterStatus::Locked);
    }

    #[test]
    fn test_empty_pack_seeds_nothing() {
        assert!(initial_progress("u1", &[], &HashSet::new(), "now").is_empty());
    }
}
