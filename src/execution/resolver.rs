//! Parameter Resolution
//!
//! Substitutes `${key}` placeholders in step parameters with context entries.
//!
//! Only a string that is *entirely* a placeholder is substituted; `"v${x}"`
//! is left alone. Unknown keys keep the literal placeholder. Nested mappings
//! are resolved recursively. Sequences are passed through untouched, so a
//! placeholder inside a list is never substituted.

use serde_json::Value;

use super::context::ContextSnapshot;
use crate::workflow::Params;

/// Returns a new parameter mapping with placeholders resolved.
///
/// Neither `params` nor `context` is modified.
///
/// # Example
///
/// ```
/// use planrunner::execution::{resolve_params, ContextSnapshot};
/// use serde_json::json;
///
/// let mut context = ContextSnapshot::new();
/// context.insert("notify_result".to_string(), json!({"status": "success"}));
///
/// let params = json!({"payload": "${notify_result}", "missing": "${nope}"});
/// let resolved = resolve_params(params.as_object().unwrap(), &context);
///
/// assert_eq!(resolved["payload"]["status"], "success");
/// assert_eq!(resolved["missing"], "${nope}");
/// ```
pub fn resolve_params(params: &Params, context: &ContextSnapshot) -> Params {
    params
        .iter()
        .map(|(key, value)| (key.clone(), resolve_value(value, context)))
        .collect()
}

fn resolve_value(value: &Value, context: &ContextSnapshot) -> Value {
    match value {
        Value::String(text) => match placeholder_key(text) {
            Some(key) => context.get(key).cloned().unwrap_or_else(|| value.clone()),
            None => value.clone(),
        },
        Value::Object(map) => Value::Object(resolve_params(map, context)),
        _ => value.clone(),
    }
}

/// Extracts `key` from a string of the exact form `${key}`.
fn placeholder_key(text: &str) -> Option<&str> {
    text.strip_prefix("${")?.strip_suffix('}')
}
