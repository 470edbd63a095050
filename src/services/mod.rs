// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod catalog;
pub mod locks;
pub mod matching;
pub mod onboarding;
pub mod password;
pub mod paths;
pub mod progression;
pub mod purchase;
pub mod quiz;
pub mod referral;

pub use accounts::{AccountService, ProfileUpdate, Registration};
pub use catalog::{CatalogError, CatalogSeed, SeedSummary};
pub use locks::LockRegistry;
pub use matching::{MatchingOutcome, MatchingService, ProfileScore, ResponseInput};
pub use onboarding::OnboardingInitializer;
pub use paths::PathService;
pub use progression::{Advance, ProgressionLedger};
pub use purchase::{PurchaseReceipt, PurchaseService};
pub use quiz::{QuizOutcome, QuizService, QuizSubmission, QuizView};
pub use referral::{BypassResult, Redemption, ReferralService, ReferralStats};
