// src/health/result.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of a single probe invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResult {
    pub healthy: bool,
    pub message: String,
}

impl HealthResult {
    pub fn new(healthy: bool, message: impl Into<String>) -> Self {
        Self {
            healthy,
            message: message.into(),
        }
    }

    pub fn healthy(message: impl Into<String>) -> Self {
        Self::new(true, message)
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(false, message)
    }

    /// "UP" or "DOWN", as rendered in alert cards.
    pub fn status_label(&self) -> &'static str {
        if self.healthy {
            "UP"
        } else {
            "DOWN"
        }
    }
}

/// Latest outcome per check name. Serializes as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSnapshot(BTreeMap<String, HealthResult>);

impl ResultSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot holding exactly one entry.
    pub fn single(name: impl Into<String>, result: HealthResult) -> Self {
        let mut snapshot = Self::new();
        snapshot.insert(name, result);
        snapshot
    }

    pub fn insert(&mut self, name: impl Into<String>, result: HealthResult) {
        self.0.insert(name.into(), result);
    }

    pub fn get(&self, name: &str) -> Option<&HealthResult> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn any_unhealthy(&self) -> bool {
        self.0.values().any(|r| !r.healthy)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HealthResult)> {
        self.0.iter()
    }
}

impl FromIterator<(String, HealthResult)> for ResultSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, HealthResult)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ResultSnapshot {
    type Item = (String, HealthResult);
    type IntoIter = std::collections::btree_map::IntoIter<String, HealthResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
