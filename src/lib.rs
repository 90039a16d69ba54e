// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pipeline;

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{PipelineFile, parse_duration};
use crate::exec::orchestrator::display_path;
use crate::exec::{ExitReport, Orchestrator, RunOptions};
use crate::pipeline::Pipeline;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - pipeline file loading
/// - CLI overrides for redirections and timeout
/// - dry-run printing
/// - orchestration and the final report
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let mut cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading pipeline file {:?}", config_path))?;

    apply_overrides(&mut cfg, &args);

    let pipeline = cfg.to_pipeline()?;
    let timeout = match args.timeout.as_deref() {
        Some(s) => Some(parse_duration(s).context("parsing --timeout")?),
        None => cfg.timeout()?,
    };

    if args.dry_run {
        print_dry_run(&pipeline, timeout);
        return Ok(());
    }

    let orchestrator = Orchestrator::new(RunOptions { timeout });
    let report = orchestrator.run(&pipeline).await?;

    print_report(&pipeline, &report);
    if !report.all_succeeded() {
        info!(
            failed = report.failed_stages().count(),
            "some stages did not exit cleanly; see report"
        );
    }
    Ok(())
}

/// CLI flags take precedence over the `[pipeline]` section.
fn apply_overrides(cfg: &mut PipelineFile, args: &CliArgs) {
    if let Some(ref input) = args.input {
        cfg.pipeline.input = Some(input.clone());
    }
    if let Some(ref output) = args.output {
        cfg.pipeline.output = Some(output.clone());
    }
}

/// Final report on stderr; stdout may be carrying the last stage's output.
fn print_report(pipeline: &Pipeline, report: &ExitReport) {
    eprintln!("Completed: {}", pipeline.command_line());
    for stage in report.stages() {
        eprintln!("{stage}");
    }
}

/// Simple dry-run output: print the pipeline and each stage.
fn print_dry_run(pipeline: &Pipeline, timeout: Option<Duration>) {
    println!("pipexec dry-run");
    println!("  pipeline: {}", pipeline.command_line());
    println!("  input: {}", display_path(pipeline.input()));
    println!("  output: {}", display_path(pipeline.output()));
    if let Some(timeout) = timeout {
        println!("  timeout: {timeout:?}");
    }
    println!();

    println!("stages ({}):", pipeline.len());
    for stage in pipeline.stages() {
        println!("  [{}] {}", stage.index(), stage.program());
        if !stage.args().is_empty() {
            println!("      args: {:?}", stage.args());
        }
    }

    debug!("dry-run complete (nothing spawned)");
}

