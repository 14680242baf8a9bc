//! Plan Execution Module
//!
//! Provides the engine that runs a plan's steps through an action
//! dispatcher, including parameter resolution, result passing between
//! steps and summary reporting.
//!
//! # Architecture
//!
//! - [`engine`]: Main execution engine orchestrating plan runs
//! - [`step`]: Individual step execution logic
//! - [`context`]: Per-execution store of step outcomes
//! - [`resolver`]: `${key}` placeholder substitution
//! - [`record`]: Step records, summary and execution report

pub mod context;
pub mod engine;
pub mod record;
pub mod resolver;
pub mod step;

pub use context::{Context, ContextSnapshot, WORKFLOW_KEY};
pub use engine::{BlockingEngine, Engine};
pub use record::{ExecutionReport, StepRecord, StepStatus, Summary, SummaryStatus};
pub use resolver::resolve_params;
pub use step::StepRunner;
