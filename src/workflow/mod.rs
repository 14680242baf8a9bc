//! Plan Definition Module
//!
//! Provides data structures and utilities for defining, parsing, and
//! validating executable plans.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (Plan, Step, ActionKind)
//! - [`parser`]: JSON/YAML parsing and loading
//! - [`validator`]: Action and parameter checks
//! - [`state`]: Execution lifecycle states

pub mod model;
pub mod parser;
pub mod state;
pub mod validator;

pub use model::{ActionKind, Params, Plan, Step};
pub use parser::{load_plan, parse_plan, save_plan, PlanDocument, StepDocument};
pub use state::WorkflowState;
pub use validator::{quick_validate, validate_plan};
