// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course pack purchases.

use crate::db::{Db, WriteBatch};
use crate::error::{AppError, Result};
use crate::models::{CoursePack, UserCoursePurchase};
use crate::services::locks::LockRegistry;
use crate::services::onboarding::OnboardingInitializer;
use futures_util::future::try_join_all;

/// Payment method recorded for packs granted by a referral reward.
pub const REFERRAL_PAYMENT_METHOD: &str = "REFERRAL_POINTS";

#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub purchase_id: String,
    pub chapters_unlocked: usize,
}

#[derive(Clone)]
pub struct PurchaseService {
    db: Db,
    locks: LockRegistry,
    onboarding: OnboardingInitializer,
}

impl PurchaseService {
    pub fn new(db: Db, locks: LockRegistry, onboarding: OnboardingInitializer) -> Self {
        Self {
            db,
            locks,
            onboarding,
        }
    }

    /// Buy a pack at its catalog price and seed its chapter progress.
    pub async fn purchase_course_pack(
        &self,
        user_id: &str,
        pack_id: &str,
        payment_method: &str,
    ) -> Result<PurchaseReceipt> {
        let payment_method = payment_method.trim();
        if payment_method.is_empty() {
            return Err(AppError::validation(
                "payment_method",
                "payment_method is required",
            ));
        }

        let pack = self
            .db
            .get_course_pack(pack_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Course pack {} not found", pack_id)))?;

        let _guard = self.locks.acquire_user(user_id).await;

        let mut batch = WriteBatch::new();
        let staged = self
            .onboarding
            .stage_purchase(&mut batch, user_id, &pack, payment_method, pack.price)
            .await?;
        self.db.commit(batch).await?;

        tracing::info!(
            user_id,
            pack_id,
            purchase_id = %staged.purchase.id,
            chapters = staged.chapters_unlocked,
            "Course pack purchased"
        );

        Ok(PurchaseReceipt {
            purchase_id: staged.purchase.id,
            chapters_unlocked: staged.chapters_unlocked,
        })
    }

    /// Packs the user owns, in purchase order.
    pub async fn purchased_packs(&self, user_id: &str) -> Result<Vec<CoursePack>> {
        let purchases: Vec<UserCoursePurchase> = self.db.list_purchases_for_user(user_id).await?;
        let packs = try_join_all(
            purchases
                .iter()
                .map(|purchase| self.db.get_course_pack(&purchase.pack_id)),
        )
        .await?;

        Ok(purchases
            .iter()
            .zip(packs)
            .filter_map(|(purchase, pack)| {
                if pack.is_none() {
                    tracing::warn!(
                        user_id,
                        pack_id = %purchase.pack_id,
                        "Purchase references a missing course pack"
                    );
                }
                pack
            })
            .collect())
    }
}
