//! Execution Context
//!
//! Per-execution key/value store used to pass outcomes between steps.
//! The originating plan lives under [`WORKFLOW_KEY`]; each successful step
//! stores its outcome under [`ActionKind::context_key`], so a later step of
//! the same kind overwrites an earlier one.
//!
//! Writes are serialized through a mutex. When two concurrent steps share an
//! action kind, which write lands last is unspecified.

use std::collections::HashMap;

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::workflow::{ActionKind, Plan};

/// Reserved key holding the originating plan.
pub const WORKFLOW_KEY: &str = "workflow";

/// A point-in-time copy of the context, used for parameter resolution.
pub type ContextSnapshot = HashMap<String, Value>;

/// Shared, mutable context of one execution.
#[derive(Debug, Default)]
pub struct Context {
    entries: Mutex<HashMap<String, Value>>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context seeded with the plan under the reserved key.
    pub fn for_plan(plan: &Plan) -> Self {
        let plan_value = serde_json::to_value(plan).unwrap_or_else(|e| {
            warn!("Could not store plan in context: {}", e);
            Value::Null
        });

        let mut entries = HashMap::new();
        entries.insert(WORKFLOW_KEY.to_string(), plan_value);

        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Copies the current entries.
    pub async fn snapshot(&self) -> ContextSnapshot {
        self.entries.lock().await.clone()
    }

    /// Returns a copy of one entry.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Stores a step outcome under the key derived from its action kind.
    pub async fn record_success(&self, action: ActionKind, outcome: Value) {
        let key = action.context_key();
        let mut entries = self.entries.lock().await;

        if entries.insert(key.clone(), outcome).is_some() {
            debug!("Context entry '{}' overwritten", key);
        } else {
            debug!("Context entry '{}' added", key);
        }
    }

    /// Number of entries, including the reserved plan entry.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns true if the context holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
