//! Step Records and Summaries
//!
//! A [`StepRecord`] is produced once per attempted step and never changed
//! afterwards. The [`Summary`] is derived from the records alone.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflow::{ActionKind, Params, WorkflowState};

/// Outcome status of one step.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Error,
}

/// Immutable record of one step's execution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// Dispatched action
    pub action: ActionKind,

    /// Parameters after placeholder resolution
    pub params: Params,

    /// Step description from the plan
    pub description: String,

    /// Whether the step succeeded
    pub status: StepStatus,

    /// Dispatcher outcome, present whenever the dispatcher returned one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Failure description, present exactly when `status` is `Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    /// `end_time - start_time`, in seconds on the wire
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl StepRecord {
    /// Returns true if the step succeeded.
    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Overall status reported in a summary.
///
/// There is no separate "all failed" status: one failed step and every
/// step failing are both `PartialFailure`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    Success,
    PartialFailure,
}

/// Aggregate statistics of one execution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Summary {
    pub description: String,

    /// Length of the plan, even when execution halted early
    pub total_steps: usize,

    pub completed_steps: usize,
    pub failed_steps: usize,

    /// Sum of step durations, not wall-clock time
    #[serde(with = "duration_secs")]
    pub total_duration: Duration,

    pub status: SummaryStatus,
}

impl Summary {
    /// Builds a summary from the records of an execution.
    pub fn from_records(
        description: impl Into<String>,
        total_steps: usize,
        records: &[StepRecord],
    ) -> Self {
        let failed_steps = records.iter().filter(|r| !r.is_success()).count();

        Self {
            description: description.into(),
            total_steps,
            completed_steps: records.len() - failed_steps,
            failed_steps,
            total_duration: records.iter().map(|r| r.duration).sum(),
            status: if failed_steps == 0 {
                SummaryStatus::Success
            } else {
                SummaryStatus::PartialFailure
            },
        }
    }
}

/// Everything an execution produces.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    /// Terminal lifecycle state
    pub state: WorkflowState,

    #[serde(rename = "result")]
    pub summary: Summary,

    /// Records in plan order
    pub steps: Vec<StepRecord>,
}

impl ExecutionReport {
    /// Splits the report into its summary and step records.
    pub fn into_parts(self) -> (Summary, Vec<StepRecord>) {
        (self.summary, self.steps)
    }
}

/// Serializes a [`Duration`] as fractional seconds.
pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }
}
