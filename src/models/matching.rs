// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile matching models: profiles, questions, weighted answers.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use super::user::AcademicLevel;

/// A professional track users are steered toward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Sparse profile-id → weight mapping attached to a matching answer.
///
/// Stored data is free-form, so deserialization keeps only entries whose
/// value is an integer, an integral float, or a string holding an integer.
/// Everything else is dropped instead of failing the whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProfileWeights(BTreeMap<String, i64>);

impl ProfileWeights {
    pub fn new(weights: BTreeMap<String, i64>) -> Self {
        Self(weights)
    }

    /// Weight for a profile; absent profiles weigh 0.
    pub fn weight(&self, profile_id: &str) -> i64 {
        self.0.get(profile_id).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build weights from an arbitrary JSON value, skipping malformed entries.
    ///
    /// A JSON-encoded object inside a string is unwrapped first; any other
    /// non-object value yields empty weights.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let owned: serde_json::Value;
        let value = match value {
            serde_json::Value::String(raw) => match serde_json::from_str(raw) {
                Ok(parsed) => {
                    owned = parsed;
                    &owned
                }
                Err(_) => return Self::default(),
            },
            other => other,
        };

        let Some(map) = value.as_object() else {
            return Self::default();
        };

        let weights = map
            .iter()
            .filter_map(|(profile_id, raw)| {
                let profile_id = profile_id.trim();
                if profile_id.is_empty() {
                    return None;
                }
                parse_weight(raw).map(|w| (profile_id.to_string(), w))
            })
            .collect();
        Self(weights)
    }
}

fn parse_weight(raw: &serde_json::Value) -> Option<i64> {
    match raw {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for ProfileWeights {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

/// One possible answer of a matching question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingAnswer {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub profile_weights: ProfileWeights,
}

/// Matching question with its answers embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingQuestion {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub answers: Vec<MatchingAnswer>,
}

impl MatchingQuestion {
    pub fn answer(&self, answer_id: &str) -> Option<&MatchingAnswer> {
        self.answers.iter().find(|a| a.id == answer_id)
    }
}

/// The answer a user currently holds for one question.
///
/// Document ID is `pair_id(user_id, question_id)`, so a second submission for the
/// same question overwrites the first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMatchingResponse {
    pub user_id: String,
    pub question_id: String,
    pub answer_id: String,
    pub updated_at: String,
}

/// Curriculum outline for a profile at a given academic level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptivePath {
    pub id: String,
    pub profile_id: String,
    pub academic_level: AcademicLevel,
    #[serde(default)]
    pub steps: Vec<String>,
    pub duration_months: u32,
}

/// The adaptive path a user has validated and started (one per user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPathValidation {
    pub user_id: String,
    pub path_id: String,
    pub validated_at: String,
    pub is_started: bool,
    pub started_at: Option<String>,
}

fn default_true() -> bool {
    true
}
