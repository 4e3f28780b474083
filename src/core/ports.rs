//! Collaborator interfaces: telemetry store, messaging, AI triage
//!
//! The engine only sees these traits. HTTP adapters live in `remote`.

use std::collections::HashMap;
use std::path::Path;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;
use crate::error::{FetchError, NotifyError, TriageError};
use crate::types::{TriageBrief, VitalsRecord};

/// Read-only, eventually consistent key/value telemetry source
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// `Ok(None)` when nothing is stored at `path`
    async fn get(&self, path: &str) -> Result<Option<Value>, FetchError>;
}

/// Outbound notification channel
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, body: &str, to: &str) -> Result<(), NotifyError>;
}

/// Produces a triage brief for the current vitals; may be slow
#[async_trait]
pub trait TriageProvider: Send + Sync {
    async fn summarize(&self, vitals: &VitalsRecord) -> Result<TriageBrief, TriageError>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// In-process store for fixtures and tests
#[derive(Debug, Default)]
pub struct InMemoryTelemetryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemoryTelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object of `path → snapshot`
    pub fn from_json(root: Value) -> Result<Self, FetchError> {
        let Value::Object(map) = root else {
            return Err(FetchError::Malformed {
                path: "<fixture>".to_string(),
                reason: "fixture root must be an object".to_string(),
            });
        };
        Ok(Self {
            entries: RwLock::new(map.into_iter().collect()),
        })
    }

    /// Load a fixture file (same layout as `from_json`)
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, FetchError> {
        let path = path.as_ref();
        let fixture_path = path.display().to_string();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FetchError::Unreachable(format!("{}: {}", fixture_path, e)))?;
        let root: Value = serde_json::from_str(&text).map_err(|e| FetchError::Malformed {
            path: fixture_path.clone(),
            reason: e.to_string(),
        })?;
        let store = Self::from_json(root)?;
        info!(fixture = %fixture_path, paths = store.entries.read().await.len(), "loaded telemetry fixture");
        Ok(store)
    }

    pub async fn set(&self, path: impl Into<String>, value: Value) {
        self.entries.write().await.insert(path.into(), value);
    }

    pub async fn remove(&self, path: &str) {
        self.entries.write().await.remove(path);
    }
}

#[async_trait]
impl TelemetryStore for InMemoryTelemetryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, FetchError> {
        Ok(self.entries.read().await.get(path).cloned())
    }
}

/// Messenger that only writes the alert to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
    async fn send(&self, body: &str, to: &str) -> Result<(), NotifyError> {
        info!(to = %to, body = %body, "alert notification (log only)");
        Ok(())
    }
}
