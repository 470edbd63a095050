// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Adaptive paths: the curriculum outline for a (profile, academic level).

use crate::db::{collections, Db};
use crate::error::{AppError, Result};
use crate::models::{AdaptivePath, UserPathValidation};
use crate::time_utils::now_rfc3339;

#[derive(Clone)]
pub struct PathService {
    db: Db,
}

impl PathService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// The path matching the user's selected profile and academic level.
    pub async fn path_for_user(&self, user_id: &str) -> Result<AdaptivePath> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let profile_id = user.selected_profile.as_deref().ok_or_else(|| {
            AppError::validation("selected_profile", "No profile has been selected")
        })?;
        let level = user.academic_level.ok_or_else(|| {
            AppError::validation("academic_level", "No academic level on record")
        })?;

        self.db
            .find_adaptive_path(profile_id, level)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No adaptive path for profile {} at this level",
                    profile_id
                ))
            })
    }

    /// Record that the user validated and started a path. One validation
    /// per user; validating again replaces the previous one.
    pub async fn validate_path(&self, user_id: &str, path_id: &str) -> Result<UserPathValidation> {
        let path_id = path_id.trim();
        if path_id.is_empty() {
            return Err(AppError::validation("path_id", "path_id is required"));
        }

        let path = self
            .db
            .get_adaptive_path(path_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Adaptive path {} not found", path_id)))?;

        let now = now_rfc3339();
        let validation = UserPathValidation {
            user_id: user_id.to_string(),
            path_id: path.id,
            validated_at: now.clone(),
            is_started: true,
            started_at: Some(now),
        };
        self.db
            .set(collections::PATH_VALIDATIONS, user_id, &validation)
            .await?;

        tracing::info!(user_id, path_id, "Adaptive path validated");
        Ok(validation)
    }
}
