//! PlanRunner CLI Entry Point
//!
//! Provides command-line interface for plan execution.
//!
//! # Usage
//!
//! ```bash
//! # Execute a plan file
//! planrunner release.yaml
//!
//! # Let the language model write the plan
//! planrunner --query "deploy my-app to production, then notify the team"
//!
//! # Dry run mode (log actions only)
//! planrunner release.yaml --dry-run
//!
//! # Force parallel execution with at most 4 steps in flight
//! planrunner release.yaml --parallel --max-parallel 4
//! ```

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use colored::Colorize;
use log::{error, info};

use planrunner::config::{load_dotenv, DispatcherConfig};
use planrunner::dispatch::{ActionDispatcher, DryRunDispatcher, HttpDispatcher};
use planrunner::execution::{BlockingEngine, Engine, ExecutionReport};
use planrunner::monitoring::ExecutionTimeline;
use planrunner::planner::{LlmPlanProducer, PlanProducer};
use planrunner::workflow::{load_plan, Plan, WorkflowState};
use planrunner::{APP_NAME, VERSION};

/// Command-line configuration parsed from arguments.
#[derive(Debug, Default)]
struct Config {
    plan_path: Option<String>,
    query: Option<String>,
    parallel: Option<bool>,
    continue_on_error: bool,
    max_parallel: usize,
    dry_run: bool,
    json: bool,
    verbose: bool,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("Action Plan Execution Engine");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: planrunner [OPTIONS] <PLAN_FILE>");
    println!("       planrunner [OPTIONS] --query <TEXT>");
    println!();
    println!("Arguments:");
    println!("  <PLAN_FILE>           Path to a YAML or JSON plan");
    println!();
    println!("Options:");
    println!("  --query TEXT          Ask the language model to write the plan");
    println!("  --parallel            Run all steps concurrently");
    println!("  --sequential          Run steps one after another");
    println!("  --continue-on-error   Keep going after a failed step");
    println!("  --max-parallel N      Bound concurrent steps in parallel mode (0: no bound)");
    println!("  --dry-run             Log actions without performing them");
    println!("  --json                Print the execution report as JSON");
    println!("  --verbose             Enable debug logging");
    println!("  --help                Show this help message");
    println!("  --version             Show version information");
    println!();
    println!("Environment:");
    println!("  NOTIFY_WEBHOOK_URL, DEPLOY_API_URL, FILE_UPLOAD_API_URL, ACTION_API_TOKEN");
    println!("  LLM_API_KEY, LLM_BASE_URL, LLM_MODEL (for --query)");
    println!();
    println!("Examples:");
    println!("  planrunner release.yaml");
    println!("  planrunner release.yaml --dry-run --continue-on-error");
    println!("  planrunner --query \"upload report.pdf to the docs service\"");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--parallel" => config.parallel = Some(true),
            "--sequential" => config.parallel = Some(false),
            "--continue-on-error" => config.continue_on_error = true,
            "--dry-run" => config.dry_run = true,
            "--json" => config.json = true,
            "--verbose" | "-v" => config.verbose = true,
            "--query" | "-q" => {
                i += 1;
                if i >= args.len() {
                    return Err("--query requires a text argument".to_string());
                }
                config.query = Some(args[i].clone());
            }
            "--max-parallel" => {
                i += 1;
                if i >= args.len() {
                    return Err("--max-parallel requires a number argument".to_string());
                }
                config.max_parallel = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid max-parallel value: {}", args[i]))?;
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if config.plan_path.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.plan_path = Some(arg.clone());
            }
        }
        i += 1;
    }

    match (&config.plan_path, &config.query) {
        (None, None) => Err("A plan file or --query is required".to_string()),
        (Some(_), Some(_)) => Err("Give either a plan file or --query, not both".to_string()),
        _ => Ok(config),
    }
}

/// Builds the dispatcher for the selected mode.
fn build_dispatcher(
    dry_run: bool,
) -> Result<Arc<dyn ActionDispatcher>, Box<dyn std::error::Error>> {
    if dry_run {
        info!("Mode: DRY RUN (actions will not be performed)");
        return Ok(Arc::new(DryRunDispatcher::new()));
    }

    Ok(Arc::new(HttpDispatcher::new(DispatcherConfig::from_env())?))
}

/// Loads the plan from file or asks the language model for one.
fn obtain_plan(
    config: &Config,
    engine: &BlockingEngine,
) -> Result<Plan, Box<dyn std::error::Error>> {
    if let Some(ref query) = config.query {
        let producer = LlmPlanProducer::from_env()?;
        info!("Requesting plan from model {}", producer.model());
        return Ok(engine.block_on(producer.produce_plan(query)));
    }

    let path = config.plan_path.as_deref().unwrap_or_default();
    let plan = load_plan(path).map_err(|e| {
        error!("Failed to load plan: {}", e);
        format!("Could not load plan from '{}': {}", path, e)
    })?;

    Ok(plan)
}

/// Prints per-step results, the summary and the timeline.
fn print_report(report: &ExecutionReport) {
    println!();
    println!("{}", "Steps:".bold());

    for (index, step) in report.steps.iter().enumerate() {
        let line = format!(
            "{:>3}. {} ({}) {:.2?}",
            index + 1,
            step.description,
            step.action,
            step.duration
        );

        if step.is_success() {
            println!("  {} {}", "ok".green(), line);
        } else {
            println!("  {} {}", "failed".red(), line);
            if let Some(ref reason) = step.error {
                println!("        {}", reason.as_str().red());
            }
        }
    }

    let summary = &report.summary;
    let skipped = summary.total_steps - summary.completed_steps - summary.failed_steps;

    println!();
    println!("{} {}", "Workflow:".bold(), summary.description);
    println!(
        "  {} succeeded, {} failed, {} not attempted, {} total ({:.2?} step time)",
        summary.completed_steps.to_string().green(),
        summary.failed_steps.to_string().red(),
        skipped,
        summary.total_steps,
        summary.total_duration
    );

    let state = report.state.to_string();
    match report.state {
        WorkflowState::Completed => println!("  State: {}", state.as_str().green().bold()),
        _ => println!("  State: {}", state.as_str().red().bold()),
    }

    let timeline = ExecutionTimeline::from_records(&report.steps);
    if !timeline.is_empty() {
        print!("{}", timeline.gantt_chart());
    }
}

/// Main application entry point. Returns whether every attempted step succeeded.
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    // Setup logging
    setup_logging(config.verbose);

    if !config.json {
        print_banner();
    }

    load_dotenv();

    // Create and configure engine
    let mut engine = Engine::new(build_dispatcher(config.dry_run)?);
    engine.set_max_parallel(config.max_parallel);
    let engine = BlockingEngine::new(engine)?;

    let stop_on_error = config.continue_on_error.then_some(false);
    let plan = obtain_plan(&config, &engine)?.with_options(config.parallel, stop_on_error);

    // Execute plan
    let report = engine.execute(&plan)?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(report.state == WorkflowState::Completed)
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
