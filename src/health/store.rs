// src/health/store.rs
use super::{HealthResult, ResultSnapshot};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct StoredResult {
    pub result: HealthResult,
    pub updated_at: DateTime<Utc>,
}

/// Most recent outcome per check name, shared between workers and readers.
///
/// Every write replaces a name's record as a whole.
#[derive(Clone, Default)]
pub struct ResultStore {
    entries: Arc<DashMap<String, StoredResult>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str, result: HealthResult) {
        self.entries.insert(
            name.to_string(),
            StoredResult {
                result,
                updated_at: Utc::now(),
            },
        );
    }

    /// Merge a batch of results; names absent from `snapshot` keep their entry.
    pub fn merge(&self, snapshot: ResultSnapshot) {
        for (name, result) in snapshot {
            self.record(&name, result);
        }
    }

    pub fn get(&self, name: &str) -> Option<StoredResult> {
        self.entries.get(name).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, name: &str) -> Option<StoredResult> {
        self.entries.remove(name).map(|(_, stored)| stored)
    }

    pub fn snapshot(&self) -> ResultSnapshot {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().result.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
