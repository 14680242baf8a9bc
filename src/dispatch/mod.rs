//! Action Dispatch
//!
//! The engine performs side effects only through an [`ActionDispatcher`].
//! Dispatchers are constructed explicitly and handed to the engine, so tests
//! can substitute a fake.
//!
//! - [`http`]: Talks to the notification, deploy and upload services and the local filesystem
//! - [`dry_run`]: Logs every call and reports success without side effects

pub mod dry_run;
pub mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DispatchError;
use crate::workflow::{ActionKind, Params};

pub use dry_run::DryRunDispatcher;
pub use http::HttpDispatcher;

/// Performs the side effect behind an action kind.
///
/// A successful call returns a structured outcome that is expected to carry
/// a `status` field (`"success"` or `"error"`). Any raised error marks the
/// step as failed. Implementations must bound their own latency; the engine
/// applies no timeout.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn dispatch(&self, action: ActionKind, params: &Params) -> Result<Value, DispatchError>;
}

/// Reads a required string parameter.
pub(crate) fn required_str<'a>(
    params: &'a Params,
    name: &'static str,
) -> Result<&'a str, DispatchError> {
    match params.get(name) {
        None | Some(Value::Null) => Err(DispatchError::MissingParameter(name)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(DispatchError::MissingParameter(name)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(DispatchError::InvalidParameter {
            name,
            reason: format!("expected a string, got {}", other),
        }),
    }
}

/// Reads an optional string parameter.
pub(crate) fn optional_str<'a>(
    params: &'a Params,
    name: &'static str,
) -> Result<Option<&'a str>, DispatchError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(DispatchError::InvalidParameter {
            name,
            reason: format!("expected a string, got {}", other),
        }),
    }
}

/// Reads a required parameter as text; non-string values are rendered as JSON.
///
/// Lets a step pass a previous step's structured outcome as a message body.
pub(crate) fn required_text(params: &Params, name: &'static str) -> Result<String, DispatchError> {
    match params.get(name) {
        None | Some(Value::Null) => Err(DispatchError::MissingParameter(name)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Ok(other.to_string()),
    }
}

/// Reads an optional boolean parameter.
pub(crate) fn optional_bool(params: &Params, name: &'static str) -> Result<bool, DispatchError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(DispatchError::InvalidParameter {
            name,
            reason: format!("expected a boolean, got {}", other),
        }),
    }
}
