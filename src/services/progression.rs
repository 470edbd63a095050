// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chapter gating: LOCKED → IN_PROGRESS → COMPLETED per (user, chapter).
//!
//! Callers that mutate progress hold the user's lock from
//! [`LockRegistry`] for the whole read-modify-write and stage their writes
//! into a [`WriteBatch`] so that the progress change commits together with
//! whatever caused it (a quiz attempt, a bypass).

use crate::db::{collections, pair_id, Db, WriteBatch};
use crate::error::{AppError, Result};
use crate::models::{Chapter, ChapterProgress, ChapterStatus};
use crate::services::locks::LockRegistry;
use crate::time_utils::now_rfc3339;
use std::collections::HashMap;

/// What happens after a chapter is completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The next chapter of the pack is now at least IN_PROGRESS.
    NextChapter(String),
    /// The completed chapter was the last one of its pack.
    TrackFinished,
}

impl Advance {
    pub fn next_chapter_id(&self) -> Option<&str> {
        match self {
            Advance::NextChapter(id) => Some(id),
            Advance::TrackFinished => None,
        }
    }
}

/// Status a chapter without a progress row should have.
///
/// The first chapter of a pack is always reachable. Any other chapter is
/// IN_PROGRESS only if every chapter with a lower `order` is COMPLETED;
/// a lower chapter with no row counts as not completed.
pub fn repaired_status(
    chapters: &[Chapter],
    target: &Chapter,
    statuses: &HashMap<String, ChapterStatus>,
) -> ChapterStatus {
    let all_previous_completed = chapters
        .iter()
        .filter(|c| c.order < target.order)
        .all(|c| statuses.get(&c.id) == Some(&ChapterStatus::Completed));

    if all_previous_completed {
        ChapterStatus::InProgress
    } else {
        ChapterStatus::Locked
    }
}

/// The chapter following `current` in a pack's chapter list.
pub fn next_chapter<'a>(chapters: &'a [Chapter], current: &Chapter) -> Option<&'a Chapter> {
    chapters
        .iter()
        .filter(|c| c.order > current.order)
        .min_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)))
}

/// Status for the chapter after a completed one: at least IN_PROGRESS,
/// never lower than what is already stored.
pub fn unlocked_status(existing: Option<ChapterStatus>) -> ChapterStatus {
    existing.map_or(ChapterStatus::InProgress, |s| s.max(ChapterStatus::InProgress))
}

pub fn progress_row(
    user_id: &str,
    chapter: &Chapter,
    status: ChapterStatus,
    now: &str,
) -> ChapterProgress {
    ChapterProgress {
        user_id: user_id.to_string(),
        chapter_id: chapter.id.clone(),
        pack_id: chapter.pack_id.clone(),
        status,
        last_accessed: now.to_string(),
    }
}

#[derive(Clone)]
pub struct ProgressionLedger {
    db: Db,
    locks: LockRegistry,
}

impl ProgressionLedger {
    pub fn new(db: Db, locks: LockRegistry) -> Self {
        Self { db, locks }
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    /// Load a chapter or fail with NotFound.
    pub async fn chapter(&self, chapter_id: &str) -> Result<Chapter> {
        self.db
            .get_chapter(chapter_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Chapter {} not found", chapter_id)))
    }

    /// Fail with AccessDenied unless the user owns the chapter's pack.
    pub async fn require_purchase(&self, user_id: &str, chapter: &Chapter) -> Result<()> {
        if self.db.get_purchase(user_id, &chapter.pack_id).await?.is_none() {
            tracing::warn!(
                user_id,
                chapter_id = %chapter.id,
                pack_id = %chapter.pack_id,
                "Chapter access without purchase"
            );
            return Err(AppError::access_denied(format!(
                "Course pack {} has not been purchased",
                chapter.pack_id
            )));
        }
        Ok(())
    }

    /// Current progress of a chapter for a user, repairing a missing row.
    pub async fn get_chapter_progress(
        &self,
        user_id: &str,
        chapter_id: &str,
    ) -> Result<ChapterProgress> {
        let chapter = self.chapter(chapter_id).await?;
        self.require_purchase(user_id, &chapter).await?;

        let _guard = self.locks.acquire_user(user_id).await;
        self.resolve_progress(user_id, &chapter).await
    }

    /// Return the stored progress row, or compute, persist and return it.
    ///
    /// The caller must hold the user's lock.
    pub async fn resolve_progress(
        &self,
        user_id: &str,
        chapter: &Chapter,
    ) -> Result<ChapterProgress> {
        if let Some(progress) = self.db.get_progress(user_id, &chapter.id).await? {
            tracing::debug!(
                user_id,
                chapter_id = %chapter.id,
                status = progress.status.as_str(),
                "Loaded chapter progress"
            );
            return Ok(progress);
        }

        let chapters = self.db.list_chapters_for_pack(&chapter.pack_id).await?;
        let statuses: HashMap<String, ChapterStatus> = self
            .db
            .list_progress_for_pack(user_id, &chapter.pack_id)
            .await?
            .into_iter()
            .map(|p| (p.chapter_id, p.status))
            .collect();

        let status = repaired_status(&chapters, chapter, &statuses);
        let progress = progress_row(user_id, chapter, status, &now_rfc3339());
        self.db
            .set(
                collections::CHAPTER_PROGRESS,
                &pair_id(user_id, &chapter.id),
                &progress,
            )
            .await?;

        tracing::info!(
            user_id,
            chapter_id = %chapter.id,
            status = status.as_str(),
            "Repaired missing chapter progress"
        );
        Ok(progress)
    }

    /// Stage "complete chapter": the chapter becomes COMPLETED and the next
    /// chapter of the pack, if any, becomes at least IN_PROGRESS.
    ///
    /// The caller must hold the user's lock and commit `batch`.
    pub async fn stage_completion(
        &self,
        batch: &mut WriteBatch,
        user_id: &str,
        chapter: &Chapter,
    ) -> Result<Advance> {
        let now = now_rfc3339();
        batch.set(
            collections::CHAPTER_PROGRESS,
            pair_id(user_id, &chapter.id),
            &progress_row(user_id, chapter, ChapterStatus::Completed, &now),
        )?;

        let chapters = self.db.list_chapters_for_pack(&chapter.pack_id).await?;
        let Some(next) = next_chapter(&chapters, chapter) else {
            return Ok(Advance::TrackFinished);
        };

        let existing = self
            .db
            .get_progress(user_id, &next.id)
            .await?
            .map(|p| p.status);
        let status = unlocked_status(existing);
        if existing != Some(status) {
            batch.set(
                collections::CHAPTER_PROGRESS,
                pair_id(user_id, &next.id),
                &progress_row(user_id, next, status, &now),
            )?;
        }

        Ok(Advance::NextChapter(next.id.clone()))
    }
}
