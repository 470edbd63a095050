// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! A small document-store surface (get by ID, equality queries, full
//! listings, atomic write batches) backed either by Firestore or by an
//! in-memory store. Typed accessors live in [`documents`].

mod documents;
pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PROFILES: &str = "profiles";
    pub const MATCHING_QUESTIONS: &str = "matching_questions";
    pub const MATCHING_RESPONSES: &str = "matching_responses";
    pub const ADAPTIVE_PATHS: &str = "adaptive_paths";
    pub const PATH_VALIDATIONS: &str = "path_validations";
    pub const COURSE_PACKS: &str = "course_packs";
    pub const CHAPTERS: &str = "chapters";
    pub const PURCHASES: &str = "purchases";
    pub const CHAPTER_PROGRESS: &str = "chapter_progress";
    pub const QUIZ_ATTEMPTS: &str = "quiz_attempts";
    pub const REFERRAL_REWARDS: &str = "referral_rewards";
    pub const REFERRAL_REDEMPTIONS: &str = "referral_redemptions";
}

/// Document ID for a row keyed by two IDs (`user:chapter`, `user:pack`, ...).
///
/// Each part is percent-encoded so the `:` separator cannot be forged.
pub fn pair_id(first: &str, second: &str) -> String {
    format!(
        "{}:{}",
        urlencoding::encode(first),
        urlencoding::encode(second)
    )
}

/// A single pending write.
#[derive(Debug, Clone)]
pub enum Write {
    Set {
        collection: &'static str,
        id: String,
        doc: serde_json::Value,
    },
    Delete {
        collection: &'static str,
        id: String,
    },
}

/// Writes that are committed together or not at all.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a full-document write (create or replace).
    pub fn set<T: Serialize>(
        &mut self,
        collection: &'static str,
        id: impl Into<String>,
        doc: &T,
    ) -> Result<(), AppError> {
        let doc = serde_json::to_value(doc)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode document: {}", e)))?;
        self.writes.push(Write::Set {
            collection,
            id: id.into(),
            doc,
        });
        Ok(())
    }

    pub fn delete(&mut self, collection: &'static str, id: impl Into<String>) {
        self.writes.push(Write::Delete {
            collection,
            id: id.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreStore),
    Memory(Arc<MemoryStore>),
}

/// Database handle shared by all services.
#[derive(Clone)]
pub struct Db {
    backend: Backend,
}

impl Db {
    /// Connect to Firestore.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn connect_firestore(project_id: &str) -> Result<Self, AppError> {
        Ok(Self {
            backend: Backend::Firestore(FirestoreStore::new(project_id).await?),
        })
    }

    /// Create an empty in-memory database (tests and local runs).
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    /// The in-memory store, if this handle uses one.
    pub fn memory_store(&self) -> Option<&MemoryStore> {
        match &self.backend {
            Backend::Memory(store) => Some(store),
            Backend::Firestore(_) => None,
        }
    }

    /// Short name of the backend, for health reporting.
    pub fn backend_name(&self) -> &'static str {
        match &self.backend {
            Backend::Firestore(_) => "firestore",
            Backend::Memory(_) => "memory",
        }
    }

    /// Fetch a document by ID.
    pub async fn get<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(store) => store.get(collection, id).await,
            Backend::Memory(store) => store.get(collection, id).await,
        }
    }

    /// All documents whose fields equal every `(field, value)` pair.
    pub async fn query<T>(
        &self,
        collection: &str,
        filters: &[(&str, &str)],
    ) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(store) => store.query(collection, filters).await,
            Backend::Memory(store) => store.query(collection, filters).await,
        }
    }

    /// Every document of a collection.
    pub async fn list<T>(&self, collection: &str) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.query(collection, &[]).await
    }

    /// Apply all writes atomically.
    pub async fn commit(&self, batch: WriteBatch) -> Result<(), AppError> {
        if batch.is_empty() {
            return Ok(());
        }
        match &self.backend {
            Backend::Firestore(store) => store.commit(batch).await,
            Backend::Memory(store) => store.commit(batch).await,
        }
    }

    /// Write a single document.
    pub async fn set<T: Serialize>(
        &self,
        collection: &'static str,
        id: &str,
        doc: &T,
    ) -> Result<(), AppError> {
        let mut batch = WriteBatch::new();
        batch.set(collection, id, doc)?;
        self.commit(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_id_escapes_separator() {
        assert_eq!(pair_id("u1", "c1"), "u1:c1");
        assert_ne!(pair_id("a:b", "c"), pair_id("a", "b:c"));
    }
}
