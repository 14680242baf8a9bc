//! PlanRunner - Action Plan Execution Engine
//!
//! Executes plans: ordered lists of typed action steps such as sending a
//! notification, triggering a deployment or uploading a file. Plans come
//! from YAML/JSON files or from a language model that turns a
//! natural-language request into a plan.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`workflow`]: Plan data structures, parsing and validation
//! - [`execution`]: Execution engine, parameter resolution and reporting types
//! - [`dispatch`]: The side-effect boundary and its implementations
//! - [`planner`]: Natural-language plan producers
//! - [`monitoring`]: Execution timeline and Gantt charts
//! - [`config`]: Service endpoints and credentials from the environment
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use planrunner::config::DispatcherConfig;
//! use planrunner::dispatch::HttpDispatcher;
//! use planrunner::execution::{BlockingEngine, Engine};
//! use planrunner::load_plan;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load a plan from YAML
//!     let plan = load_plan("release.yaml")?;
//!
//!     // Create execution engine
//!     let dispatcher = HttpDispatcher::new(DispatcherConfig::from_env())?;
//!     let mut engine = Engine::new(Arc::new(dispatcher));
//!     engine.set_max_parallel(4);
//!
//!     // Execute the plan
//!     let report = BlockingEngine::new(engine)?.execute(&plan)?;
//!     println!("{}/{} steps succeeded", report.summary.completed_steps, report.summary.total_steps);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod monitoring;
pub mod planner;
pub mod workflow;

// Re-export commonly used types
pub use dispatch::ActionDispatcher;
pub use execution::engine::{BlockingEngine, Engine};
pub use execution::record::{ExecutionReport, StepRecord, Summary};
pub use planner::PlanProducer;
pub use workflow::model::{ActionKind, Plan, Step};
pub use workflow::parser::{load_plan, parse_plan};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "PlanRunner";
