// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Elite: learning progression and incentive engine
//!
//! This crate provides the backend API for profile matching, gated course
//! chapters with quizzes, and a referral points economy.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Db;
use services::{
    AccountService, LockRegistry, MatchingService, OnboardingInitializer, PathService,
    ProgressionLedger, PurchaseService, QuizService, ReferralService,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub accounts: AccountService,
    pub matching: MatchingService,
    pub paths: PathService,
    pub purchases: PurchaseService,
    pub progression: ProgressionLedger,
    pub quizzes: QuizService,
    pub referrals: ReferralService,
}

impl AppState {
    /// Wire every service to one store and one set of per-user locks.
    pub fn new(config: Config, db: Db) -> Self {
        let locks = LockRegistry::new();
        let settings = config.engine;

        let onboarding = OnboardingInitializer::new(db.clone());
        let progression = ProgressionLedger::new(db.clone(), locks.clone());

        Self {
            accounts: AccountService::new(db.clone(), locks.clone(), settings),
            matching: MatchingService::new(db.clone(), locks.clone()),
            paths: PathService::new(db.clone()),
            purchases: PurchaseService::new(db.clone(), locks.clone(), onboarding.clone()),
            quizzes: QuizService::new(db.clone(), progression.clone(), settings),
            referrals: ReferralService::new(
                db.clone(),
                locks,
                progression.clone(),
                onboarding,
                settings,
            ),
            progression,
            config,
            db,
        }
    }
}
