//! Plan Producers
//!
//! Turn a natural-language request into a [`Plan`]. A producer never fails
//! outward: when it cannot build a usable plan it returns [`Plan::failed`],
//! which the engine refuses to run.
//!
//! - [`llm`]: Asks an OpenAI-compatible chat model for the plan

pub mod llm;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::workflow::{ActionKind, Plan};

pub use llm::LlmPlanProducer;

/// Produces plans from free text.
#[async_trait]
pub trait PlanProducer: Send + Sync {
    async fn produce_plan(&self, text: &str) -> Plan;
}

/// Catalog of every action kind with its description and parameters.
pub fn action_catalog() -> Value {
    let mut catalog = Map::new();

    for kind in ActionKind::ALL {
        catalog.insert(
            kind.as_str().to_string(),
            json!({
                "description": kind.description(),
                "required_params": kind.required_params(),
                "optional_params": kind.optional_params(),
            }),
        );
    }

    Value::Object(catalog)
}

/// System prompt instructing the model to answer with a plan document.
pub fn system_prompt() -> String {
    let catalog =
        serde_json::to_string_pretty(&action_catalog()).unwrap_or_else(|_| "{}".to_string());

    format!(
        r#"You turn a user's request into a structured workflow.

Available actions and their parameters:
{catalog}

Reply with a single JSON object of this shape:
{{
    "description": "short summary of the workflow",
    "steps": [
        {{
            "action": "action name",
            "params": {{ "param name": "value" }},
            "description": "what this step does"
        }}
    ],
    "parallel": false,
    "stop_on_error": true
}}

Rules:
1. Use only the actions listed above.
2. Provide every required parameter with a sensible value.
3. Order the steps logically.
4. A step can use the outcome of an earlier step of kind X by setting a parameter to the exact string "${{X_result}}".
5. Set "parallel" to true only when the steps are independent of each other.
6. Reply with JSON only."#
    )
}
