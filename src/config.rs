// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Engine thresholds live in [`EngineSettings`] and are handed to the
//! services explicitly so tests can run against any threshold values.

use std::env;
use std::str::FromStr;

/// Quiz and referral thresholds used by the progression engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Minimum score (0-20 scale) for a quiz to count as passed.
    pub pass_threshold: f64,
    /// Minimum score (0-20 scale) that unlocks the referral bypass option.
    pub referral_threshold: f64,
    /// Number of referred users needed to bypass a chapter quiz.
    pub referral_bypass_count: u32,
    /// Points credited to a referrer for each signup using their code.
    pub referral_points_per_signup: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            pass_threshold: 14.0,
            referral_threshold: 10.0,
            referral_bypass_count: 4,
            referral_points_per_signup: 1,
        }
    }
}

impl EngineSettings {
    /// Check the relationships between thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=20.0).contains(&self.pass_threshold)
            || !(0.0..=20.0).contains(&self.referral_threshold)
        {
            return Err(ConfigError::Invalid(
                "quiz thresholds must be within 0..=20".to_string(),
            ));
        }
        if self.pass_threshold <= self.referral_threshold {
            return Err(ConfigError::Invalid(format!(
                "QUIZ_PASS_THRESHOLD ({}) must be greater than QUIZ_REFERRAL_THRESHOLD ({})",
                self.pass_threshold, self.referral_threshold
            )));
        }
        if self.referral_points_per_signup < 0 {
            return Err(ConfigError::Invalid(
                "REFERRAL_POINTS_PER_SIGNUP must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Use the in-memory document store instead of Firestore
    pub use_in_memory_store: bool,
    /// Optional JSON catalog file loaded into the store at startup
    pub catalog_seed_path: Option<String>,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Quiz and referral thresholds
    pub engine: EngineSettings,
}

impl Config {
    /// Config for tests: in-memory store and the default thresholds.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            use_in_memory_store: true,
            catalog_seed_path: None,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            engine: EngineSettings::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = EngineSettings::default();
        let engine = EngineSettings {
            pass_threshold: parse_or("QUIZ_PASS_THRESHOLD", defaults.pass_threshold)?,
            referral_threshold: parse_or("QUIZ_REFERRAL_THRESHOLD", defaults.referral_threshold)?,
            referral_bypass_count: parse_or("REFERRAL_BYPASS_COUNT", defaults.referral_bypass_count)?,
            referral_points_per_signup: parse_or(
                "REFERRAL_POINTS_PER_SIGNUP",
                defaults.referral_points_per_signup,
            )?,
        };
        engine.validate()?;

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_or("PORT", 8080)?,
            use_in_memory_store: parse_or("USE_IN_MEMORY_STORE", false)?,
            catalog_seed_path: env::var("CATALOG_SEED_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty()),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            engine,
        })
    }
}

/// Read an optional variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
