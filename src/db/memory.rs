// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory backend for the document store.
//!
//! Documents are kept as JSON values. A batch is applied under one write
//! lock, so readers see either none or all of its writes.

use super::{Write, WriteBatch};
use crate::error::AppError;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::RwLock;

type Collection = BTreeMap<String, serde_json::Value>;

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    fail_next_commit: AtomicBool,
    fail_next_query: Mutex<Option<String>>,
}

impl MemoryStore {
    pub async fn get<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|doc| decode(collection, id, doc))
            .transpose()
    }

    pub async fn query<T>(
        &self,
        collection: &str,
        filters: &[(&str, &str)],
    ) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        if self.take_query_failure(collection) {
            return Err(AppError::Database(format!(
                "Injected query failure on {} (in-memory store)",
                collection
            )));
        }

        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        docs.iter()
            .filter(|(_, doc)| {
                filters
                    .iter()
                    .all(|(field, value)| doc.get(*field).and_then(|v| v.as_str()) == Some(*value))
            })
            .map(|(id, doc)| decode(collection, id, doc))
            .collect()
    }

    pub async fn commit(&self, batch: WriteBatch) -> Result<(), AppError> {
        let mut collections = self.collections.write().await;

        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(AppError::Database(
                "Injected commit failure (in-memory store)".to_string(),
            ));
        }

        for write in batch.into_writes() {
            match write {
                Write::Set {
                    collection,
                    id,
                    doc,
                } => {
                    collections
                        .entry(collection.to_string())
                        .or_default()
                        .insert(id, doc);
                }
                Write::Delete { collection, id } => {
                    if let Some(docs) = collections.get_mut(collection) {
                        docs.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }

    /// Make the next commit fail without applying any write.
    pub fn inject_commit_failure(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Make the next query on `collection` fail.
    pub fn inject_query_failure(&self, collection: &str) {
        if let Ok(mut target) = self.fail_next_query.lock() {
            *target = Some(collection.to_string());
        }
    }

    fn take_query_failure(&self, collection: &str) -> bool {
        match self.fail_next_query.lock() {
            Ok(mut target) if target.as_deref() == Some(collection) => {
                *target = None;
                true
            }
            _ => false,
        }
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, |docs| docs.len())
    }
}

fn decode<T: DeserializeOwned>(
    collection: &str,
    id: &str,
    doc: &serde_json::Value,
) -> Result<T, AppError> {
    serde_json::from_value(doc.clone())
        .map_err(|e| AppError::Database(format!("Malformed document {}/{}: {}", collection, id, e)))
}
