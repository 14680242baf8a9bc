//! Plan Parser
//!
//! Handles loading plan documents from JSON or YAML text and files.
//! Documents are read into a loose wire shape first and then turned into
//! a typed [`Plan`] by the validator, so an unrecognized action is reported
//! with its step index instead of as an opaque deserialization error.

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::Plan;
use super::validator::validate_plan;
use crate::error::PlanError;

/// A plan as it appears on the wire, before validation.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PlanDocument {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub steps: Vec<StepDocument>,

    #[serde(default)]
    pub parallel: Option<bool>,

    #[serde(default)]
    pub stop_on_error: Option<bool>,

    #[serde(default)]
    pub error: Option<String>,
}

/// A step as it appears on the wire, before validation.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct StepDocument {
    #[serde(default)]
    pub action: String,

    #[serde(default)]
    pub params: Value,

    #[serde(default)]
    pub description: Option<String>,
}

/// Parses and validates a plan from JSON or YAML text.
///
/// # Example
///
/// ```
/// use planrunner::workflow::{parse_plan, ActionKind};
///
/// let plan = parse_plan(r#"{"steps": [{"action": "notify", "params": {"message": "hi"}}]}"#).unwrap();
/// assert_eq!(plan.steps[0].action, ActionKind::Notify);
/// assert!(plan.stop_on_error);
/// ```
pub fn parse_plan(text: &str) -> Result<Plan, PlanError> {
    let document: PlanDocument = serde_yaml::from_str(text)?;
    debug!("Parsed plan document with {} steps", document.steps.len());
    validate_plan(document)
}

/// Loads a plan from a JSON or YAML file.
///
/// # Example
///
/// ```rust,no_run
/// use planrunner::workflow::load_plan;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let plan = load_plan("release.yaml")?;
///     println!("Loaded {} steps", plan.len());
///     Ok(())
/// }
/// ```
pub fn load_plan(path: impl AsRef<Path>) -> Result<Plan, PlanError> {
    let path = path.as_ref();
    info!("Loading plan from: {}", path.display());

    let content = fs::read_to_string(path).map_err(|source| PlanError::Read {
        path: path.display().to_string(),
        source,
    })?;

    debug!("Plan content loaded ({} bytes)", content.len());

    let plan = parse_plan(&content)?;

    info!(
        "Plan loaded: {} steps (parallel: {}, stop on error: {})",
        plan.len(),
        plan.parallel,
        plan.stop_on_error
    );

    Ok(plan)
}

/// Saves a plan to a YAML file.
pub fn save_plan(plan: &Plan, path: impl AsRef<Path>) -> Result<(), PlanError> {
    let path = path.as_ref();
    let yaml_content =
        serde_yaml::to_string(plan).map_err(|e| PlanError::Serialize(e.to_string()))?;

    fs::write(path, yaml_content).map_err(|source| PlanError::Write {
        path: path.display().to_string(),
        source,
    })?;

    info!("Plan saved to: {}", path.display());
    Ok(())
}
