//! Plan Execution Engine
//!
//! The core engine that orchestrates a plan run including:
//! - Sequential execution with stop-on-error
//! - Parallel fan-out with results kept in plan order
//! - Optional bound on parallel fan-out
//! - Summary aggregation and lifecycle state
//!
//! In parallel mode every step resolves its parameters against the same
//! snapshot taken before launch, so `${...}` references to results of the
//! same batch stay unresolved. Parallel mode trades data passing between
//! steps for concurrency.

use std::future::Future;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use super::context::{Context, ContextSnapshot};
use super::record::{ExecutionReport, StepRecord, Summary};
use super::resolver::resolve_params;
use super::step::{aborted_record, StepRunner};
use crate::dispatch::ActionDispatcher;
use crate::error::EngineError;
use crate::workflow::{Plan, Step, WorkflowState};

/// Plan execution engine.
///
/// Owns no state between executions; each call to [`Engine::execute`]
/// builds its own context.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use planrunner::dispatch::DryRunDispatcher;
/// use planrunner::execution::Engine;
/// use planrunner::load_plan;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let plan = load_plan("release.yaml")?;
///     let engine = Engine::new(Arc::new(DryRunDispatcher::new()));
///
///     let report = engine.execute(&plan).await?;
///     println!("{:?}", report.summary.status);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Engine {
    runner: StepRunner,
    max_parallel: Option<usize>,
}

impl Engine {
    /// Creates an engine that dispatches through `dispatcher`.
    pub fn new(dispatcher: Arc<dyn ActionDispatcher>) -> Self {
        Self {
            runner: StepRunner::new(dispatcher),
            max_parallel: None,
        }
    }

    /// Bounds how many steps run at once in parallel mode. `0` removes the bound.
    pub fn set_max_parallel(&mut self, max: usize) {
        self.max_parallel = (max > 0).then_some(max);
    }

    /// Current bound on parallel fan-out, if any.
    pub fn max_parallel(&self) -> Option<usize> {
        self.max_parallel
    }

    /// Executes a plan.
    ///
    /// Step failures never make this fail; they are reported in the returned
    /// records and summary. Only a plan flagged as unusable by its producer
    /// is rejected.
    pub async fn execute(&self, plan: &Plan) -> Result<ExecutionReport, EngineError> {
        if let Some(ref reason) = plan.error {
            error!("Refusing to execute plan: {}", reason);
            return Err(EngineError::PlanRejected(reason.clone()));
        }

        let mut state = WorkflowState::default();
        let context = Arc::new(Context::for_plan(plan));

        info!(
            "Starting workflow '{}' ({} steps, parallel: {}, stop on error: {})",
            plan.description,
            plan.len(),
            plan.parallel,
            plan.stop_on_error
        );
        state.start();

        let steps = if plan.parallel {
            self.run_parallel(plan, context).await
        } else {
            self.run_sequential(plan, context).await
        };

        let summary = Summary::from_records(&plan.description, plan.len(), &steps);
        state.finish(summary.failed_steps);

        info!(
            "Workflow '{}' finished: {}/{} steps succeeded, {} failed ({:.2?} total step time)",
            plan.description,
            summary.completed_steps,
            summary.total_steps,
            summary.failed_steps,
            summary.total_duration
        );

        Ok(ExecutionReport {
            state,
            summary,
            steps,
        })
    }

    /// Runs steps one at a time in plan order.
    ///
    /// Each step still runs on its own task so a panicking dispatcher
    /// becomes an error record instead of unwinding out of the engine.
    async fn run_sequential(&self, plan: &Plan, context: Arc<Context>) -> Vec<StepRecord> {
        let mut records = Vec::with_capacity(plan.len());

        for (index, step) in plan.steps.iter().enumerate() {
            info!("Starting step {}/{}: {}", index + 1, plan.len(), step.description);

            let scope = Arc::new(context.snapshot().await);
            let handle =
                self.spawn_step(step.clone(), Arc::clone(&scope), Arc::clone(&context), None);
            let record = join_step(step, handle, &scope).await;

            let failed = !record.is_success();
            records.push(record);

            if failed && plan.stop_on_error {
                warn!(
                    "Stopping after failed step {}; {} remaining steps skipped",
                    index + 1,
                    plan.len() - index - 1
                );
                break;
            }
        }

        records
    }

    /// Launches every step at once and collects records in plan order.
    async fn run_parallel(&self, plan: &Plan, context: Arc<Context>) -> Vec<StepRecord> {
        let scope = Arc::new(context.snapshot().await);
        let limiter = self.max_parallel.map(|n| Arc::new(Semaphore::new(n)));

        info!(
            "Launching {} steps in parallel (limit: {})",
            plan.len(),
            self.max_parallel
                .map_or_else(|| "none".to_string(), |n| n.to_string())
        );

        let handles: Vec<_> = plan
            .steps
            .iter()
            .cloned()
            .map(|step| {
                self.spawn_step(step, Arc::clone(&scope), Arc::clone(&context), limiter.clone())
            })
            .collect();

        let mut records = Vec::with_capacity(handles.len());

        for (step, handle) in plan.steps.iter().zip(handles) {
            records.push(join_step(step, handle, &scope).await);
        }

        records
    }

    /// Runs one step on its own task, waiting for a permit when `limiter` is set.
    fn spawn_step(
        &self,
        step: Step,
        scope: Arc<ContextSnapshot>,
        context: Arc<Context>,
        limiter: Option<Arc<Semaphore>>,
    ) -> JoinHandle<StepRecord> {
        let runner = self.runner.clone();

        tokio::spawn(async move {
            let _permit = match limiter {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };
            runner.run_with_scope(&step, &scope, &context).await
        })
    }
}

/// Waits for a step task, turning an aborted task into an error record.
async fn join_step(
    step: &Step,
    handle: JoinHandle<StepRecord>,
    scope: &ContextSnapshot,
) -> StepRecord {
    match handle.await {
        Ok(record) => record,
        Err(e) => {
            error!("Step '{}' ({}) aborted: {}", step.description, step.action, e);
            let params = resolve_params(&step.params, scope);
            aborted_record(step, params, format!("step task panicked: {}", e))
        }
    }
}

/// Synchronous front for [`Engine`].
///
/// Owns a single multi-threaded runtime, created once and reused for every
/// call. Must not be used from inside another async runtime.
pub struct BlockingEngine {
    engine: Engine,
    runtime: Runtime,
}

impl BlockingEngine {
    /// Wraps an engine and starts its runtime.
    pub fn new(engine: Engine) -> Result<Self, EngineError> {
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(EngineError::Runtime)?;

        Ok(Self { engine, runtime })
    }

    /// Executes a plan, blocking until every attempted step has finished.
    pub fn execute(&self, plan: &Plan) -> Result<ExecutionReport, EngineError> {
        self.runtime.block_on(self.engine.execute(plan))
    }

    /// Runs any other future on the engine's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::{Script, ScriptedDispatcher};
    use crate::dispatch::{DryRunDispatcher, HttpDispatcher};
    use crate::config::DispatcherConfig;
    use crate::execution::record::{StepStatus, SummaryStatus};
    use crate::workflow::{ActionKind, Step};
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn engine(dispatcher: ScriptedDispatcher) -> (Engine, Arc<ScriptedDispatcher>) {
        let dispatcher = Arc::new(dispatcher);
        (Engine::new(dispatcher.clone()), dispatcher)
    }

    fn notify_then_deploy() -> Plan {
        Plan::new("notify then deploy")
            .with_step(Step::new(ActionKind::Notify).with_param("msg", "hi"))
            .with_step(Step::new(ActionKind::Deploy).with_param("env", "prod"))
    }

    #[test]
    fn test_engine_configuration() {
        let (mut engine, _) = engine(ScriptedDispatcher::new());
        assert_eq!(engine.max_parallel(), None);

        engine.set_max_parallel(4);
        assert_eq!(engine.max_parallel(), Some(4));

        engine.set_max_parallel(0);
        assert_eq!(engine.max_parallel(), None);
    }

    #[tokio::test]
    async fn test_sequential_success() {
        let (engine, dispatcher) = engine(ScriptedDispatcher::new());

        let report = engine.execute(&notify_then_deploy()).await.unwrap();

        assert_eq!(report.state, WorkflowState::Completed);
        assert_eq!(report.summary.status, SummaryStatus::Success);
        assert_eq!(report.summary.completed_steps, 2);
        assert_eq!(report.steps[0].action, ActionKind::Notify);
        assert_eq!(report.steps[1].action, ActionKind::Deploy);
        assert_eq!(dispatcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_deploy_failure_with_stop_on_error() {
        let (engine, _) = engine(ScriptedDispatcher::new().failing(ActionKind::Deploy, "deploy API 500"));

        let report = engine.execute(&notify_then_deploy()).await.unwrap();
        let summary = &report.summary;

        assert_eq!(summary.total_steps, 2);
        assert_eq!(summary.completed_steps, 1);
        assert_eq!(summary.failed_steps, 1);
        assert_eq!(summary.status, SummaryStatus::PartialFailure);
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.state, WorkflowState::PartiallyFailed);
    }

    #[tokio::test]
    async fn test_all_failed_without_stop_on_error() {
        let (engine, _) = engine(
            ScriptedDispatcher::new()
                .failing(ActionKind::Notify, "webhook down")
                .failing(ActionKind::Deploy, "deploy API 500"),
        );
        let plan = notify_then_deploy().stop_on_error(false);

        let report = engine.execute(&plan).await.unwrap();

        assert_eq!(report.steps.len(), 2);
        assert!(report.steps.iter().all(|s| s.status == StepStatus::Error));
        assert_eq!(report.summary.status, SummaryStatus::PartialFailure);
        assert_eq!(report.summary.completed_steps, 0);
        assert_eq!(report.summary.failed_steps, 2);
        assert_eq!(report.state, WorkflowState::PartiallyFailed);
    }

    #[tokio::test]
    async fn test_stop_on_error_skips_remaining_steps() {
        let (engine, dispatcher) =
            engine(ScriptedDispatcher::new().failing(ActionKind::Deploy, "boom"));
        let plan = Plan::new("halt")
            .with_step(Step::new(ActionKind::Deploy))
            .with_step(Step::new(ActionKind::Notify))
            .with_step(Step::new(ActionKind::WebSearch));

        let report = engine.execute(&plan).await.unwrap();

        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.summary.total_steps, 3);
        assert_eq!(report.summary.failed_steps, 1);
        assert_eq!(report.summary.completed_steps, 0);
        assert_eq!(dispatcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_continue_on_error_attempts_every_step() {
        let (engine, _) = engine(ScriptedDispatcher::new().failing(ActionKind::Deploy, "boom"));
        let plan = Plan::new("continue")
            .with_step(Step::new(ActionKind::Deploy))
            .with_step(Step::new(ActionKind::Notify))
            .with_step(Step::new(ActionKind::Deploy))
            .stop_on_error(false);

        let report = engine.execute(&plan).await.unwrap();

        assert_eq!(report.steps.len(), report.summary.total_steps);
        assert_eq!(report.summary.failed_steps, 2);
        assert_eq!(report.summary.completed_steps, 1);
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let dispatcher = HttpDispatcher::new(DispatcherConfig::default()).unwrap();
        let engine = Engine::new(Arc::new(dispatcher));
        let plan = Plan::new("upload").with_step(
            Step::new(ActionKind::UploadFile).with_param("file_path", "missing.txt"),
        );

        let report = engine.execute(&plan).await.unwrap();

        assert_eq!(report.steps[0].status, StepStatus::Error);
        assert!(report.steps[0].error.as_ref().unwrap().contains("missing.txt"));
        assert_eq!(report.summary.status, SummaryStatus::PartialFailure);
        assert_eq!(report.summary.completed_steps, 0);
        assert_eq!(report.summary.total_steps, 1);
    }

    #[tokio::test]
    async fn test_sequential_reference_to_previous_result() {
        let (engine, _) = engine(ScriptedDispatcher::new());
        let plan = Plan::new("pass data")
            .with_step(Step::new(ActionKind::Notify).with_param("message", "hi"))
            .with_step(Step::new(ActionKind::ProcessData).with_param("data", "${notify_result}"));

        let report = engine.execute(&plan).await.unwrap();

        let data = &report.steps[1].params["data"];
        assert_eq!(Some(data), report.steps[0].result.as_ref());
        assert_eq!(data["params"]["message"], "hi");
    }

    #[tokio::test]
    async fn test_failed_step_not_visible_to_later_steps() {
        let (engine, _) = engine(ScriptedDispatcher::new().failing(ActionKind::Notify, "down"));
        let plan = Plan::new("no pollution")
            .with_step(Step::new(ActionKind::Notify))
            .with_step(Step::new(ActionKind::ProcessData).with_param("data", "${notify_result}"))
            .stop_on_error(false);

        let report = engine.execute(&plan).await.unwrap();

        assert_eq!(report.steps[1].params["data"], "${notify_result}");
    }

    #[tokio::test]
    async fn test_plan_available_under_reserved_key() {
        let (engine, _) = engine(ScriptedDispatcher::new());
        let plan = Plan::new("self reference")
            .with_step(Step::new(ActionKind::ProcessData).with_param("data", "${workflow}"));

        let report = engine.execute(&plan).await.unwrap();

        assert_eq!(report.steps[0].params["data"]["description"], "self reference");
    }

    #[tokio::test]
    async fn test_same_kind_last_write_wins_sequentially() {
        let (engine, _) = engine(ScriptedDispatcher::new());
        let plan = Plan::new("overwrite")
            .with_step(Step::new(ActionKind::Notify).with_param("message", "first"))
            .with_step(Step::new(ActionKind::Notify).with_param("message", "second"))
            .with_step(Step::new(ActionKind::ProcessData).with_param("data", "${notify_result}"));

        let report = engine.execute(&plan).await.unwrap();

        assert_eq!(report.steps[2].params["data"]["params"]["message"], "second");
    }

    #[tokio::test]
    async fn test_parallel_preserves_plan_order() {
        let (engine, _) = engine(ScriptedDispatcher::new());
        let plan = Plan::new("reversed latencies")
            .with_step(Step::new(ActionKind::Deploy).with_param("delay_ms", 120))
            .with_step(Step::new(ActionKind::Notify).with_param("delay_ms", 60))
            .with_step(Step::new(ActionKind::WebSearch).with_param("delay_ms", 0))
            .parallel(true);

        let report = engine.execute(&plan).await.unwrap();

        let actions: Vec<_> = report.steps.iter().map(|s| s.action).collect();
        assert_eq!(
            actions,
            vec![ActionKind::Deploy, ActionKind::Notify, ActionKind::WebSearch]
        );
        assert!(report.steps[2].end_time <= report.steps[0].end_time);
        assert_eq!(report.state, WorkflowState::Completed);
    }

    #[tokio::test]
    async fn test_parallel_steps_cannot_see_batch_results() {
        let (engine, _) = engine(ScriptedDispatcher::new());
        let plan = Plan::new("isolated")
            .with_step(Step::new(ActionKind::Notify))
            .with_step(
                Step::new(ActionKind::ProcessData)
                    .with_param("delay_ms", 50)
                    .with_param("data", "${notify_result}"),
            )
            .parallel(true);

        let report = engine.execute(&plan).await.unwrap();

        assert_eq!(report.steps[1].params["data"], "${notify_result}");
    }

    #[tokio::test]
    async fn test_parallel_ignores_stop_on_error() {
        let (engine, dispatcher) =
            engine(ScriptedDispatcher::new().failing(ActionKind::Deploy, "boom"));
        let plan = notify_then_deploy()
            .with_step(Step::new(ActionKind::WebSearch))
            .parallel(true)
            .stop_on_error(true);

        let report = engine.execute(&plan).await.unwrap();

        assert_eq!(report.steps.len(), 3);
        assert_eq!(dispatcher.calls().len(), 3);
        assert_eq!(report.summary.failed_steps, 1);
        assert_eq!(report.summary.status, SummaryStatus::PartialFailure);
    }

    #[tokio::test]
    async fn test_parallel_panicking_step_becomes_error_record() {
        let (engine, _) = engine(ScriptedDispatcher::new().with(ActionKind::Deploy, Script::Panic));
        let plan = notify_then_deploy().parallel(true);

        let report = engine.execute(&plan).await.unwrap();

        assert_eq!(report.steps.len(), 2);
        assert!(report.steps[0].is_success());
        assert_eq!(report.steps[1].action, ActionKind::Deploy);
        assert_eq!(report.steps[1].status, StepStatus::Error);
        assert!(report.steps[1].error.as_ref().unwrap().contains("panicked"));
        assert_eq!(report.steps[1].params["env"], "prod");
    }

    #[tokio::test]
    async fn test_sequential_panicking_step_becomes_error_record() {
        let (engine, _) = engine(ScriptedDispatcher::new().with(ActionKind::Deploy, Script::Panic));

        let report = engine.execute(&notify_then_deploy()).await.unwrap();

        assert_eq!(report.steps.len(), 2);
        assert!(report.steps[0].is_success());
        assert_eq!(report.steps[1].status, StepStatus::Error);
        assert!(report.steps[1].error.as_ref().unwrap().contains("panicked"));
        assert_eq!(report.steps[1].params["env"], "prod");
        assert_eq!(report.state, WorkflowState::PartiallyFailed);
    }

    #[tokio::test]
    async fn test_sequential_panic_honors_stop_on_error() {
        let (engine, dispatcher) =
            engine(ScriptedDispatcher::new().with(ActionKind::Deploy, Script::Panic));
        let plan = Plan::new("panic halts")
            .with_step(Step::new(ActionKind::Deploy))
            .with_step(Step::new(ActionKind::Notify));

        let report = engine.execute(&plan).await.unwrap();

        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.summary.failed_steps, 1);
        assert_eq!(dispatcher.calls().len(), 1);

        let report = engine.execute(&plan.stop_on_error(false)).await.unwrap();
        assert_eq!(report.steps.len(), 2);
        assert!(report.steps[1].is_success());
    }

    #[tokio::test]
    async fn test_parallel_limit_serializes_steps() {
        let (mut engine, _) = engine(ScriptedDispatcher::new());
        engine.set_max_parallel(1);

        let plan = Plan::new("bounded")
            .with_step(Step::new(ActionKind::Notify).with_param("delay_ms", 30))
            .with_step(Step::new(ActionKind::Deploy).with_param("delay_ms", 30))
            .with_step(Step::new(ActionKind::WebSearch).with_param("delay_ms", 30))
            .parallel(true);

        let started = Instant::now();
        let report = engine.execute(&plan).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(90));
        assert_eq!(report.summary.completed_steps, 3);
    }

    #[tokio::test]
    async fn test_total_duration_is_sum_of_steps() {
        let (engine, _) = engine(ScriptedDispatcher::new().failing(ActionKind::Deploy, "boom"));
        let plan = Plan::new("durations")
            .with_step(Step::new(ActionKind::Notify).with_param("delay_ms", 20))
            .with_step(Step::new(ActionKind::Deploy).with_param("delay_ms", 10))
            .with_step(Step::new(ActionKind::WebSearch).with_param("delay_ms", 20))
            .stop_on_error(false);

        for parallel in [false, true] {
            let report = engine.execute(&plan.clone().parallel(parallel)).await.unwrap();
            let sum: Duration = report.steps.iter().map(|s| s.duration).sum();
            assert_eq!(report.summary.total_duration, sum);
        }
    }

    #[tokio::test]
    async fn test_empty_plan_completes() {
        let (engine, dispatcher) = engine(ScriptedDispatcher::new());

        let report = engine.execute(&Plan::new("nothing")).await.unwrap();

        assert!(report.steps.is_empty());
        assert_eq!(report.summary.total_steps, 0);
        assert_eq!(report.state, WorkflowState::Completed);
        assert!(dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_plan_is_rejected() {
        let (engine, dispatcher) = engine(ScriptedDispatcher::new());

        let result = engine.execute(&Plan::failed("model returned no JSON")).await;

        assert!(matches!(result, Err(EngineError::PlanRejected(_))));
        assert!(dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reported_status_error_counts_as_failure() {
        let outcome = json!({"status": "error", "message": "upload failed"});
        let (engine, _) =
            engine(ScriptedDispatcher::new().with(ActionKind::UploadFile, Script::Outcome(outcome)));
        let plan = Plan::new("reported")
            .with_step(Step::new(ActionKind::UploadFile).with_param("file_path", "a.txt"));

        let report = engine.execute(&plan).await.unwrap();

        assert_eq!(report.summary.failed_steps, 1);
        assert_eq!(report.steps[0].error.as_deref(), Some("upload failed"));
    }

    #[test]
    fn test_blocking_engine() {
        let engine = Engine::new(Arc::new(DryRunDispatcher::new()));
        let blocking = BlockingEngine::new(engine).unwrap();

        let plan = notify_then_deploy();
        let first = blocking.execute(&plan).unwrap();
        let second = blocking.execute(&plan.parallel(true)).unwrap();

        assert_eq!(first.state, WorkflowState::Completed);
        assert_eq!(second.steps.len(), 2);
        assert_eq!(second.steps[0].result.as_ref().unwrap()["dry_run"], true);
    }
}
