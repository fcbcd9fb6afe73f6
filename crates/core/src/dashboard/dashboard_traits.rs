use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::Collection;
use crate::errors::{Result, TransportError};

/// Transport that reads one whole collection from the backend.
///
/// Each call is a stateless read of the complete current collection: no
/// caching, no pagination, no partial success.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    async fn fetch_collection(&self, collection: Collection) -> Result<Vec<Value>>;
}

/// In-memory source for tests and offline rendering.
///
/// Responses can be replaced or switched to failures between calls; every
/// call is counted per collection.
#[derive(Default)]
pub struct InMemoryCollectionSource {
    responses: Mutex<HashMap<Collection, Result<Vec<Value>>>>,
    calls: Mutex<HashMap<Collection, usize>>,
    total_calls: AtomicUsize,
}

impl InMemoryCollectionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `records` for `collection` until replaced.
    pub fn set(&self, collection: Collection, records: Vec<Value>) {
        self.lock_responses().insert(collection, Ok(records));
    }

    /// Makes every fetch of `collection` fail until replaced.
    pub fn fail(&self, collection: Collection, error: TransportError) {
        self.lock_responses().insert(collection, Err(error));
    }

    /// Number of fetches issued for `collection`.
    pub fn calls(&self, collection: Collection) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&collection)
            .copied()
            .unwrap_or(0)
    }

    /// Number of fetches issued across all collections.
    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, HashMap<Collection, Result<Vec<Value>>>> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CollectionSource for InMemoryCollectionSource {
    async fn fetch_collection(&self, collection: Collection) -> Result<Vec<Value>> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(collection)
            .or_insert(0) += 1;

        self.lock_responses()
            .get(&collection)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
