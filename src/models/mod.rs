// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod course;
pub mod matching;
pub mod referral;
pub mod user;

pub use course::{
    Chapter, ChapterProgress, ChapterStatus, CoursePack, Quiz, QuizAttempt, QuizChoice,
    QuizQuestion, UserCoursePurchase,
};
pub use matching::{
    AdaptivePath, MatchingAnswer, MatchingQuestion, Profile, ProfileWeights,
    UserMatchingResponse, UserPathValidation,
};
pub use referral::{ReferralRedemption, ReferralReward, RewardKind};
pub use user::{AcademicLevel, PublicUser, User};
