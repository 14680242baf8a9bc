//! Plan Data Model
//!
//! Core data structures representing an executable plan and its steps.
//!
//! # Example YAML Format
//!
//! ```yaml
//! description: Deploy the frontend and tell the team
//! parallel: false
//! stop_on_error: true
//! steps:
//!   - action: deploy
//!     description: Deploy frontend to staging
//!     params:
//!       project_name: frontend
//!       environment: staging
//!
//!   - action: notify
//!     params:
//!       message: "${deploy_result}"
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Parameter mapping of a step. Values may nest arbitrarily.
pub type Params = serde_json::Map<String, Value>;

/// Description used when a plan does not provide one.
pub const DEFAULT_PLAN_DESCRIPTION: &str = "Untitled workflow";

/// Description carried by the plan a producer returns when it fails.
pub const FAILED_PLAN_DESCRIPTION: &str = "Failed to parse workflow";

/// The closed set of side-effecting actions a step can request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Notify,
    Deploy,
    UploadFile,
    ReadFile,
    WriteFile,
    DeleteFile,
    ListDirectory,
    WebSearch,
    ProcessData,
    CallApi,
}

/// Returned when a string names no known action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized action '{0}'")]
pub struct UnknownActionKind(pub String);

impl ActionKind {
    /// Every action kind, in catalog order.
    pub const ALL: [ActionKind; 10] = [
        ActionKind::Notify,
        ActionKind::Deploy,
        ActionKind::UploadFile,
        ActionKind::ReadFile,
        ActionKind::WriteFile,
        ActionKind::DeleteFile,
        ActionKind::ListDirectory,
        ActionKind::WebSearch,
        ActionKind::ProcessData,
        ActionKind::CallApi,
    ];

    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notify => "notify",
            Self::Deploy => "deploy",
            Self::UploadFile => "upload_file",
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
            Self::DeleteFile => "delete_file",
            Self::ListDirectory => "list_directory",
            Self::WebSearch => "web_search",
            Self::ProcessData => "process_data",
            Self::CallApi => "call_api",
        }
    }

    /// Human-readable summary, used in the plan producer's prompt.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Notify => "Send a chat notification",
            Self::Deploy => "Deploy a project to an environment",
            Self::UploadFile => "Upload a local file to the file service",
            Self::ReadFile => "Read the contents of a file",
            Self::WriteFile => "Write content to a file",
            Self::DeleteFile => "Delete a file",
            Self::ListDirectory => "List the entries of a directory",
            Self::WebSearch => "Search the web",
            Self::ProcessData => "Process a piece of data",
            Self::CallApi => "Call an external HTTP API",
        }
    }

    /// Parameters the dispatcher cannot work without.
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            Self::Notify => &["message"],
            Self::Deploy => &["project_name"],
            Self::UploadFile => &["file_path"],
            Self::ReadFile | Self::DeleteFile => &["file_path"],
            Self::WriteFile => &["file_path", "content"],
            Self::ListDirectory => &["directory_path"],
            Self::WebSearch => &["query"],
            Self::ProcessData => &["data", "operation"],
            Self::CallApi => &["url"],
        }
    }

    /// Parameters the dispatcher understands but can default.
    pub fn optional_params(&self) -> &'static [&'static str] {
        match self {
            Self::Notify => &["at_mobiles", "is_at_all"],
            Self::Deploy => &["environment", "version", "config"],
            Self::UploadFile => &["service_name", "metadata"],
            Self::WebSearch => &["num_results"],
            Self::CallApi => &["method", "headers", "body"],
            Self::ReadFile
            | Self::WriteFile
            | Self::DeleteFile
            | Self::ListDirectory
            | Self::ProcessData => &[],
        }
    }

    /// Context key under which a successful outcome of this kind is stored.
    pub fn context_key(&self) -> String {
        format!("{}_result", self.as_str())
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = UnknownActionKind;

    /// Accepts canonical names, `-` in place of `_`, any letter case,
    /// and the legacy names older prompts produced.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");

        let kind = match normalized.as_str() {
            "notify" | "dingtalk_notify" => Self::Notify,
            "deploy" => Self::Deploy,
            "upload_file" => Self::UploadFile,
            "read_file" | "file_read" => Self::ReadFile,
            "write_file" | "file_write" => Self::WriteFile,
            "delete_file" | "file_delete" => Self::DeleteFile,
            "list_directory" | "directory_list" => Self::ListDirectory,
            "web_search" => Self::WebSearch,
            "process_data" | "data_process" => Self::ProcessData,
            "call_api" | "api_call" => Self::CallApi,
            _ => return Err(UnknownActionKind(s.to_string())),
        };

        Ok(kind)
    }
}

/// A single unit of work: an action plus its parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Step {
    /// Action to dispatch
    pub action: ActionKind,

    /// Parameters, possibly containing `${key}` placeholders
    #[serde(default)]
    pub params: Params,

    /// What this step is for
    pub description: String,
}

impl Step {
    /// Creates a step with no parameters and the default description.
    ///
    /// # Example
    ///
    /// ```
    /// use planrunner::workflow::{ActionKind, Step};
    ///
    /// let step = Step::new(ActionKind::Notify)
    ///     .with_param("message", "deploy finished")
    ///     .with_description("Tell the team");
    /// assert_eq!(step.params["message"], "deploy finished");
    /// ```
    pub fn new(action: ActionKind) -> Self {
        Self {
            action,
            params: Params::new(),
            description: default_step_description(action),
        }
    }

    /// Sets a single parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Replaces the whole parameter mapping.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Required parameters this step does not provide.
    pub fn missing_params(&self) -> Vec<&'static str> {
        self.action
            .required_params()
            .iter()
            .copied()
            .filter(|name| !self.params.contains_key(*name))
            .collect()
    }
}

/// Description given to steps that arrive without one.
pub fn default_step_description(action: ActionKind) -> String {
    format!("Execute {}", action)
}

/// A structured, validated sequence of steps plus execution options.
///
/// Immutable once handed to the engine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Plan {
    /// Short description of the whole workflow
    pub description: String,

    /// Steps in plan order
    pub steps: Vec<Step>,

    /// Run every step concurrently instead of one after another
    #[serde(default)]
    pub parallel: bool,

    /// In sequential mode, halt after the first failed step
    #[serde(default = "default_stop_on_error")]
    pub stop_on_error: bool,

    /// Set by a plan producer that could not build a usable plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub(crate) fn default_stop_on_error() -> bool {
    true
}

impl Plan {
    /// Creates an empty sequential plan that stops on the first error.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            steps: Vec::new(),
            parallel: false,
            stop_on_error: true,
            error: None,
        }
    }

    /// Creates a plan from a list of steps with the default description.
    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Self::new(DEFAULT_PLAN_DESCRIPTION)
        }
    }

    /// The plan a producer returns when it cannot build one.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::new(FAILED_PLAN_DESCRIPTION)
        }
    }

    /// Appends a step.
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Sets parallel mode.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the stop-on-error policy.
    pub fn stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    /// Applies caller overrides; `None` keeps the plan's own value.
    pub fn with_options(mut self, parallel: Option<bool>, stop_on_error: Option<bool>) -> Self {
        if let Some(parallel) = parallel {
            self.parallel = parallel;
        }
        if let Some(stop_on_error) = stop_on_error {
            self.stop_on_error = stop_on_error;
        }
        self
    }

    /// Returns true if a producer flagged this plan as unusable.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the number of steps in the plan.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the plan has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::new(DEFAULT_PLAN_DESCRIPTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_kind_round_trips_through_wire_name() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
    }

    #[test]
    fn test_action_kind_accepts_hyphens_and_case() {
        assert_eq!("upload-file".parse::<ActionKind>(), Ok(ActionKind::UploadFile));
        assert_eq!("List-Directory".parse::<ActionKind>(), Ok(ActionKind::ListDirectory));
        assert_eq!(" deploy ".parse::<ActionKind>(), Ok(ActionKind::Deploy));
    }

    #[test]
    fn test_action_kind_accepts_legacy_names() {
        assert_eq!("dingtalk_notify".parse::<ActionKind>(), Ok(ActionKind::Notify));
        assert_eq!("file_read".parse::<ActionKind>(), Ok(ActionKind::ReadFile));
        assert_eq!("directory_list".parse::<ActionKind>(), Ok(ActionKind::ListDirectory));
        assert_eq!("api_call".parse::<ActionKind>(), Ok(ActionKind::CallApi));
    }

    #[test]
    fn test_action_kind_rejects_unknown() {
        let err = "teleport".parse::<ActionKind>().unwrap_err();
        assert_eq!(err, UnknownActionKind("teleport".to_string()));
    }

    #[test]
    fn test_context_key() {
        assert_eq!(ActionKind::Notify.context_key(), "notify_result");
        assert_eq!(ActionKind::UploadFile.context_key(), "upload_file_result");
    }

    #[test]
    fn test_step_creation() {
        let step = Step::new(ActionKind::Deploy)
            .with_param("project_name", "my-app")
            .with_param("config", json!({"replicas": 2}));

        assert_eq!(step.description, "Execute deploy");
        assert_eq!(step.params.len(), 2);
        assert_eq!(step.params["config"]["replicas"], 2);
    }

    #[test]
    fn test_step_missing_params() {
        let step = Step::new(ActionKind::WriteFile).with_param("file_path", "a.txt");
        assert_eq!(step.missing_params(), vec!["content"]);

        let step = step.with_param("content", "hello");
        assert!(step.missing_params().is_empty());
    }

    #[test]
    fn test_plan_defaults() {
        let plan = Plan::default();
        assert!(plan.is_empty());
        assert!(!plan.parallel);
        assert!(plan.stop_on_error);
        assert!(!plan.is_failed());
    }

    #[test]
    fn test_plan_failed() {
        let plan = Plan::failed("model returned garbage");
        assert!(plan.is_empty());
        assert!(plan.is_failed());
        assert_eq!(plan.description, FAILED_PLAN_DESCRIPTION);
    }

    #[test]
    fn test_plan_with_options() {
        let plan = Plan::from_steps(vec![Step::new(ActionKind::Notify)]);

        let plan = plan.with_options(Some(true), None);
        assert!(plan.parallel);
        assert!(plan.stop_on_error);

        let plan = plan.with_options(None, Some(false));
        assert!(plan.parallel);
        assert!(!plan.stop_on_error);
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_action_catalog_is_consistent() {
        for kind in ActionKind::ALL {
            assert!(!kind.required_params().is_empty(), "{} has no required params", kind);
            for name in kind.optional_params() {
                assert!(!kind.required_params().contains(name));
            }
        }
    }
}
