// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Referral rewards catalog and redemption ledger.

use serde::{Deserialize, Serialize};

/// What a reward grants once redeemed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewardKind {
    /// Free access to a course pack
    CoursePack { pack_id: String },
    /// Scholarship of a fixed amount (smallest currency unit)
    Scholarship { amount: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralReward {
    pub id: String,
    pub name: String,
    pub kind: RewardKind,
    pub points_required: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Ledger entry written for every successful redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralRedemption {
    pub id: String,
    pub user_id: String,
    pub reward_id: String,
    pub points_spent: i64,
    pub redeemed_at: String,
}

fn default_true() -> bool {
    true
}
