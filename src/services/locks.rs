// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-key async locks serializing read-modify-write sequences.
//!
//! An operation that reads a user's documents and then commits a batch
//! based on them holds that user's lock from the first read to the commit.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Key used to serialize account creation (username/email/code uniqueness).
pub const REGISTRATION_KEY: &str = "registration";

/// Shared registry of named mutexes.
#[derive(Clone, Default)]
pub struct LockRegistry {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and hold the lock for `key` until the guard is dropped.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        lock.lock_owned().await
    }

    /// Lock guarding a user's aggregates.
    pub async fn acquire_user(&self, user_id: &str) -> OwnedMutexGuard<()> {
        self.acquire(&format!("user:{}", user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = LockRegistry::new();
        let inside = Arc::new(AtomicU32::new(0));
        let mut handles = vec![];

        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire_user("u1").await;
                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.expect("task panicked");
        }
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = LockRegistry::new();
        let _first = locks.acquire_user("u1").await;
        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire_user("u2")).await;
        assert!(second.is_ok());
    }
}
