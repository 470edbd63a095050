// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Accounts: registration (with referral credit), login, and deletion.

use crate::config::EngineSettings;
use crate::db::{collections, Db, WriteBatch};
use crate::error::{AppError, Result};
use crate::models::{AcademicLevel, User};
use crate::services::locks::{LockRegistry, REGISTRATION_KEY};
use crate::services::password::{hash_password, verify_password};
use crate::time_utils::now_rfc3339;
use serde::Deserialize;
use std::borrow::Cow;
use validator::{Validate, ValidationError};

pub const REFERRAL_CODE_LEN: usize = 12;
const REFERRAL_CODE_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct Registration {
    #[serde(default)]
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(min = 2, message = "City must be at least 2 characters"))]
    pub city: Option<String>,
    pub academic_level: Option<AcademicLevel>,
    pub referral_code: Option<String>,
}

impl Registration {
    /// Trim fields, lowercase the email, uppercase the referral code, and
    /// drop optional fields that are blank.
    pub fn normalized(self) -> Self {
        fn non_blank(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password: self.password,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: non_blank(self.phone),
            city: non_blank(self.city),
            academic_level: self.academic_level,
            referral_code: non_blank(self.referral_code).map(|c| c.to_uppercase()),
        }
    }
}

/// Phone numbers need at least 8 digits or `+-() ` characters.
fn validate_phone(phone: &str) -> std::result::Result<(), ValidationError> {
    let usable = phone
        .chars()
        .filter(|c| c.is_ascii_digit() || "+-() ".contains(*c))
        .count();
    if usable < 8 {
        return Err(ValidationError::new("phone")
            .with_message(Cow::Borrowed("Invalid phone number")));
    }
    Ok(())
}

/// Editable profile fields. Absent fields keep their stored value.
/// Referral data and matching state are not editable here.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(max = 150, message = "First name is too long"))]
    pub first_name: Option<String>,
    #[validate(length(max = 150, message = "Last name is too long"))]
    pub last_name: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(min = 2, message = "City must be at least 2 characters"))]
    pub city: Option<String>,
    pub academic_level: Option<AcademicLevel>,
}

impl ProfileUpdate {
    fn normalized(self) -> Self {
        let trim = |value: Option<String>| value.map(|v| v.trim().to_string());
        Self {
            first_name: trim(self.first_name),
            last_name: trim(self.last_name),
            phone: trim(self.phone),
            city: trim(self.city),
            academic_level: self.academic_level,
        }
    }

    fn apply(self, user: &mut User) {
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if let Some(phone) = self.phone {
            user.phone = phone;
        }
        if let Some(city) = self.city {
            user.city = city;
        }
        if let Some(level) = self.academic_level {
            user.academic_level = Some(level);
        }
    }
}

/// A fresh referral code: uppercase hex from a random UUID.
pub fn generate_referral_code() -> String {
    let mut code = uuid::Uuid::new_v4().simple().to_string();
    code.truncate(REFERRAL_CODE_LEN);
    code.to_uppercase()
}

#[derive(Clone)]
pub struct AccountService {
    db: Db,
    locks: LockRegistry,
    settings: EngineSettings,
}

impl AccountService {
    pub fn new(db: Db, locks: LockRegistry, settings: EngineSettings) -> Self {
        Self {
            db,
            locks,
            settings,
        }
    }

    /// Create an account and credit the referrer, if any, in one batch.
    ///
    /// Registrations are serialized so that uniqueness checks on username,
    /// email, and referral code cannot race.
    pub async fn register(&self, registration: Registration) -> Result<User> {
        let registration = registration.normalized();
        registration.validate()?;

        let _registration_guard = self.locks.acquire(REGISTRATION_KEY).await;

        if self
            .db
            .find_user_by_username(&registration.username)
            .await?
            .is_some()
        {
            return Err(AppError::validation(
                "username",
                "This username is already taken",
            ));
        }
        if self
            .db
            .find_user_by_email(&registration.email)
            .await?
            .is_some()
        {
            return Err(AppError::validation(
                "email",
                "An account with this email already exists",
            ));
        }

        let referrer = match &registration.referral_code {
            Some(code) => Some(
                self.db
                    .find_user_by_referral_code(code)
                    .await?
                    .ok_or_else(|| AppError::validation("referral_code", "Invalid referral code"))?,
            ),
            None => None,
        };

        let referral_code = self.unused_referral_code().await?;
        let password_hash = hash_password(&registration.password)?;

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: registration.username,
            email: registration.email,
            password_hash,
            first_name: registration.first_name,
            last_name: registration.last_name,
            phone: registration.phone.unwrap_or_default(),
            city: registration.city.unwrap_or_default(),
            academic_level: registration.academic_level,
            referral_code,
            referred_by: referrer.as_ref().map(|r| r.id.clone()),
            referral_points: 0,
            has_completed_matching: false,
            selected_profile: None,
            created_at: now_rfc3339(),
        };

        let mut batch = WriteBatch::new();
        batch.set(collections::USERS, user.id.clone(), &user)?;

        match referrer {
            Some(referrer) => {
                // The copy found by code may predate a redemption.
                let _referrer_guard = self.locks.acquire_user(&referrer.id).await;
                let mut referrer = self.db.get_user(&referrer.id).await?.ok_or_else(|| {
                    AppError::validation("referral_code", "Invalid referral code")
                })?;
                referrer.referral_points = referrer
                    .referral_points
                    .saturating_add(self.settings.referral_points_per_signup);
                batch.set(collections::USERS, referrer.id.clone(), &referrer)?;
                self.db.commit(batch).await?;

                tracing::info!(
                    user_id = %user.id,
                    referrer_id = %referrer.id,
                    referrer_points = referrer.referral_points,
                    "User registered with referral"
                );
            }
            None => {
                self.db.commit(batch).await?;
                tracing::info!(user_id = %user.id, "User registered");
            }
        }

        Ok(user)
    }

    async fn unused_referral_code(&self) -> Result<String> {
        for _ in 0..REFERRAL_CODE_ATTEMPTS {
            let code = generate_referral_code();
            if self.db.find_user_by_referral_code(&code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(AppError::Internal(anyhow::anyhow!(
            "Could not generate an unused referral code"
        )))
    }

    /// Check credentials. `login` is a username or an email address.
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<User> {
        let login = login.trim();
        let user = if login.contains('@') {
            self.db.find_user_by_email(&login.to_lowercase()).await?
        } else {
            self.db.find_user_by_username(login).await?
        };

        match user {
            Some(user) if verify_password(password, &user.password_hash)? => {
                tracing::info!(user_id = %user.id, "User logged in");
                Ok(user)
            }
            _ => {
                tracing::warn!("Failed login attempt");
                Err(AppError::Unauthorized)
            }
        }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<User> {
        let update = update.normalized();
        update.validate()?;

        let _guard = self.locks.acquire_user(user_id).await;
        let mut user = self.get_user(user_id).await?;
        update.apply(&mut user);
        self.db.set(collections::USERS, &user.id, &user).await?;

        tracing::info!(
            user_id,
            academic_level = ?user.academic_level,
            "Profile updated"
        );
        Ok(user)
    }

    /// Delete the account and everything it owns.
    pub async fn delete_account(&self, user_id: &str) -> Result<usize> {
        let _guard = self.locks.acquire_user(user_id).await;
        if self.db.get_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        self.db.delete_user_data(user_id).await
    }
}
