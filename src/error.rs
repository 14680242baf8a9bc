//! Error Types
//!
//! One error enum per layer. Plan problems stop a run before it starts,
//! dispatch problems are captured per step, and engine errors are the only
//! failures that ever leave [`Engine::execute`](crate::execution::Engine::execute).

use thiserror::Error;

/// Problems found while accepting a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Step {index}: unrecognized action '{action}'")]
    UnknownAction { index: usize, action: String },

    #[error("Step {index}: params must be a mapping, got {found}")]
    InvalidParams { index: usize, found: String },

    #[error("Failed to read plan file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write plan file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse plan: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Failed to serialize plan: {0}")]
    Serialize(String),
}

/// A failure raised by an action dispatcher for a single step.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("parameter '{name}' is invalid: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("file does not exist: {0}")]
    FileNotFound(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Hard failures of a whole execution.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Plan rejected: {0}")]
    PlanRejected(String),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Failures inside a plan producer. Never crosses the producer boundary;
/// it is folded into a failed plan instead.
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("language model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("language model returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("language model reply had no content")]
    EmptyReply,

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Missing or malformed environment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
