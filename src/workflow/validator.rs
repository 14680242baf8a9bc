//! Plan Validation
//!
//! Turns a wire-level [`PlanDocument`] into a typed [`Plan`]:
//! - Action names are checked against the closed set of action kinds
//! - Parameters must be a mapping
//! - Missing descriptions and options receive their defaults
//!
//! Missing required parameters are only warned about. The dispatcher is the
//! authority on parameters and reports them as a failed step at run time.

use log::{debug, info, warn};
use serde_json::Value;

use super::model::{
    default_step_description, default_stop_on_error, ActionKind, Params, Plan, Step,
    DEFAULT_PLAN_DESCRIPTION,
};
use super::parser::{PlanDocument, StepDocument};
use crate::error::PlanError;

/// Validates a plan document and builds the typed plan.
///
/// Fails on the first step whose action is not recognized or whose
/// parameters are not a mapping.
pub fn validate_plan(document: PlanDocument) -> Result<Plan, PlanError> {
    info!("Validating plan with {} steps", document.steps.len());

    let steps = document
        .steps
        .into_iter()
        .enumerate()
        .map(|(index, step)| validate_step(index, step))
        .collect::<Result<Vec<_>, _>>()?;

    let plan = Plan {
        description: document
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PLAN_DESCRIPTION.to_string()),
        steps,
        parallel: document.parallel.unwrap_or(false),
        stop_on_error: document.stop_on_error.unwrap_or_else(default_stop_on_error),
        error: document.error,
    };

    for message in quick_validate(&plan) {
        warn!("{}", message);
    }

    Ok(plan)
}

/// Validates a single step document.
fn validate_step(index: usize, document: StepDocument) -> Result<Step, PlanError> {
    let action: ActionKind = document
        .action
        .parse()
        .map_err(|_| PlanError::UnknownAction {
            index,
            action: document.action.clone(),
        })?;

    let params = match document.params {
        Value::Null => Params::new(),
        Value::Object(map) => map,
        other => {
            return Err(PlanError::InvalidParams {
                index,
                found: value_kind(&other).to_string(),
            })
        }
    };

    let description = document
        .description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| default_step_description(action));

    debug!("Step {} accepted: {} ({} params)", index, action, params.len());

    Ok(Step {
        action,
        params,
        description,
    })
}

/// Name of a JSON value's type, for error messages.
fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Soft findings on an already typed plan.
///
/// Useful for surfacing likely mistakes without rejecting the plan.
pub fn quick_validate(plan: &Plan) -> Vec<String> {
    let mut messages = Vec::new();

    if let Some(ref error) = plan.error {
        messages.push(format!("Plan carries a producer error: {}", error));
    }

    if plan.steps.is_empty() {
        messages.push("Plan has no steps".to_string());
        return messages;
    }

    for (index, step) in plan.steps.iter().enumerate() {
        for name in step.missing_params() {
            messages.push(format!(
                "Step {} ({}): missing required parameter '{}'",
                index, step.action, name
            ));
        }
    }

    messages
}
