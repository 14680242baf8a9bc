//! Execution State
//!
//! Lifecycle of a single plan execution:
//!
//! ```text
//! Pending -> Running -> Completed
//!                    -> PartiallyFailed
//! ```
//!
//! There is no retry, pause or resume state. A run in which every attempted
//! step failed is still `PartiallyFailed`.

use std::fmt;

use log::info;
use serde::{Deserialize, Serialize};

/// State of one plan execution.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Created, no step started yet
    #[default]
    Pending,
    /// Steps are being dispatched
    Running,
    /// Every attempted step succeeded
    Completed,
    /// At least one attempted step failed
    PartiallyFailed,
}

impl WorkflowState {
    /// Moves `Pending` to `Running`. Any other state is left as is.
    pub fn start(&mut self) {
        if *self == Self::Pending {
            *self = Self::Running;
            info!("Workflow state: pending -> running");
        }
    }

    /// Moves `Running` to its terminal state based on the failure count.
    pub fn finish(&mut self, failed_steps: usize) {
        if *self != Self::Running {
            return;
        }

        *self = if failed_steps == 0 {
            Self::Completed
        } else {
            Self::PartiallyFailed
        };
        info!("Workflow state: running -> {}", self);
    }

    /// Returns true once no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::PartiallyFailed)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::PartiallyFailed => "partially_failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_creation() {
        let state = WorkflowState::default();
        assert_eq!(state, WorkflowState::Pending);
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_completed_transition() {
        let mut state = WorkflowState::default();
        state.start();
        assert_eq!(state, WorkflowState::Running);

        state.finish(0);
        assert_eq!(state, WorkflowState::Completed);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_partial_failure_transition() {
        let mut state = WorkflowState::default();
        state.start();
        state.finish(3);
        assert_eq!(state, WorkflowState::PartiallyFailed);
    }

    #[test]
    fn test_finish_requires_running() {
        let mut state = WorkflowState::default();
        state.finish(0);
        assert_eq!(state, WorkflowState::Pending);
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let mut state = WorkflowState::default();
        state.start();
        state.finish(1);

        state.start();
        state.finish(0);
        assert_eq!(state, WorkflowState::PartiallyFailed);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(WorkflowState::PartiallyFailed.to_string(), "partially_failed");
        assert_eq!(
            serde_json::to_value(WorkflowState::Completed).unwrap(),
            serde_json::json!("completed")
        );
    }
}
