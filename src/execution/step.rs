//! Individual Step Execution
//!
//! Runs one plan step:
//! - Resolves `${key}` placeholders against a context snapshot
//! - Dispatches the action and times the call
//! - Normalizes the outcome into a [`StepRecord`]
//! - Stores successful outcomes in the shared context
//!
//! A step never fails outward. Dispatcher errors and outcomes that report a
//! failing `status` both become error records, and neither touches the context.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, error, info};
use serde_json::Value;

use super::context::{Context, ContextSnapshot};
use super::record::{StepRecord, StepStatus};
use super::resolver::resolve_params;
use crate::dispatch::ActionDispatcher;
use crate::workflow::{Params, Step};

/// Outcome `status` values that mark a failure without a raised error.
const FAILURE_STATUSES: &[&str] = &["error", "failed", "failure"];

/// Executes single steps through a dispatcher.
#[derive(Clone)]
pub struct StepRunner {
    dispatcher: Arc<dyn ActionDispatcher>,
}

impl StepRunner {
    pub fn new(dispatcher: Arc<dyn ActionDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Runs a step, resolving its parameters against the current context.
    pub async fn run(&self, step: &Step, context: &Context) -> StepRecord {
        let scope = context.snapshot().await;
        self.run_with_scope(step, &scope, context).await
    }

    /// Runs a step, resolving its parameters against `scope`.
    ///
    /// The outcome of a successful step is written to `context`, after the
    /// dispatcher returns and before the record is handed back.
    pub async fn run_with_scope(
        &self,
        step: &Step,
        scope: &ContextSnapshot,
        context: &Context,
    ) -> StepRecord {
        let params = resolve_params(&step.params, scope);
        debug!("Resolved params for {}: {}", step.action, Value::Object(params.clone()));

        let start_time = Utc::now();
        let started = Instant::now();

        let dispatched = self.dispatcher.dispatch(step.action, &params).await;

        let duration = started.elapsed();
        let end_time = start_time
            + chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());

        let (status, result, failure) = match dispatched {
            Ok(outcome) => match reported_failure(&outcome) {
                None => (StepStatus::Success, Some(outcome), None),
                Some(reason) => (StepStatus::Error, Some(outcome), Some(reason)),
            },
            Err(e) => (StepStatus::Error, None, Some(e.to_string())),
        };

        match failure {
            None => info!(
                "Step '{}' ({}) completed in {:.2?}",
                step.description, step.action, duration
            ),
            Some(ref reason) => error!(
                "Step '{}' ({}) failed: {}",
                step.description, step.action, reason
            ),
        }

        if status == StepStatus::Success {
            if let Some(ref outcome) = result {
                context.record_success(step.action, outcome.clone()).await;
            }
        }

        StepRecord {
            action: step.action,
            params,
            description: step.description.clone(),
            status,
            result,
            error: failure,
            start_time,
            end_time,
            duration,
        }
    }
}

/// Builds the record for a step whose task ended abnormally.
pub(crate) fn aborted_record(step: &Step, params: Params, reason: String) -> StepRecord {
    let now = Utc::now();

    StepRecord {
        action: step.action,
        params,
        description: step.description.clone(),
        status: StepStatus::Error,
        result: None,
        error: Some(reason),
        start_time: now,
        end_time: now,
        duration: Duration::ZERO,
    }
}

/// Returns the failure reason if an outcome reports a failing `status`.
///
/// Outcomes without a `status` field, or with a null one, count as
/// successful. A `status` that is not a string is malformed and fails.
fn reported_failure(outcome: &Value) -> Option<String> {
    let status = match outcome.get("status")? {
        Value::Null => return None,
        Value::String(s) => {
            if !FAILURE_STATUSES.iter().any(|f| s.eq_ignore_ascii_case(f)) {
                return None;
            }
            s.clone()
        }
        other => other.to_string(),
    };

    let reason = outcome
        .get("error")
        .or_else(|| outcome.get("message"))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| format!("dispatcher reported status '{}'", status));

    Some(reason)
}
