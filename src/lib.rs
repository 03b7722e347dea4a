// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod progress;
pub mod stats;
pub mod types;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{BuiltPlan, PlanFile};
use crate::engine::Driver;
use crate::exec::CommandExecutor;
use crate::progress::LogProgress;
use crate::types::ExportFormat;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - plan loading and graph construction
/// - driver + shell command executor
/// - Ctrl-C handling
/// - statistics and export output on stdout
pub async fn run(args: CliArgs) -> Result<()> {
    let plan_path = PathBuf::from(&args.plan);
    let plan = load_and_validate(&plan_path)?;
    let built = plan.build_graph()?;

    if args.dry_run {
        print_dry_run(&plan, &built);
        return Ok(());
    }

    let mut options = plan.run_options();
    if let Some(secs) = args.timeout {
        options.run_timeout = Some(Duration::from_secs(secs));
    }

    // Commands run relative to the plan file's directory.
    let mut executor = CommandExecutor::new();
    if let Some(parent) = plan_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        executor = executor.in_dir(parent);
    }

    // Ctrl-C → cancel the run; the driver fails pending work and drains.
    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl-C received; cancelling run");
            token.cancel();
        });
    }

    let driver = Driver::new(built.graph, executor)
        .with_options(options)
        .with_progress(LogProgress)
        .with_cancellation(token);

    let report = driver.run().await?;

    println!("{}", serde_json::to_string_pretty(&report.statistics)?);

    match args.export {
        Some(ExportFormat::Dot) => println!("{}", report.graph.snapshot().to_dot()),
        Some(ExportFormat::Json) => {
            println!("{}", report.graph.snapshot_with_payloads().to_json()?)
        }
        None => {}
    }

    if report.cancelled {
        anyhow::bail!("run cancelled before completion");
    }
    Ok(())
}

/// Print tasks, dependencies and the built graph without executing.
fn print_dry_run(plan: &PlanFile, built: &BuiltPlan) {
    println!("querydag dry-run");
    println!("  config.node_timeout_secs = {:?}", plan.config.node_timeout_secs);
    println!("  config.run_timeout_secs = {:?}", plan.config.run_timeout_secs);
    println!("  config.cancel_grace_ms = {}", plan.config.cancel_grace_ms);
    println!("  scaffold = {}", plan.scaffold.is_some());
    println!();

    println!("tasks ({}):", plan.tasks.len());
    for task in &plan.tasks {
        println!("  - {} [{}]", task.id, task.kind);
        println!("      cmd: {}", task.cmd);
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
    }
    println!();

    println!("{}", built.graph.snapshot().to_dot());

    debug!("dry-run complete (no execution)");
}
