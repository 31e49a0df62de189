// src/lib.rs

pub mod cli;
pub mod components;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipelines;
pub mod types;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::load_and_validate;
use crate::dag::Workflow;
use crate::engine::RunReport;
use crate::pipelines::{PrefixParams, WindowParams, gc_ratio_prefix, gc_ratio_window};
use crate::types::PortState;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - workflow construction (pipeline file or built-in pipeline)
/// - CLI overrides (concurrency, workdir)
/// - optional DOT export
/// - dry-run or execution, followed by a summary on stdout
pub async fn run(args: CliArgs) -> Result<()> {
    let mut workflow = build_workflow(&args)?;

    if let Some(n) = args.concurrency {
        workflow = workflow.with_max_concurrency(n)?;
    }
    if let Some(dir) = &args.workdir {
        workflow = workflow.with_workdir(dir);
    }

    if let Some(path) = &args.dot {
        std::fs::write(path, workflow.to_dot())
            .with_context(|| format!("writing DOT graph to {}", path.display()))?;
        info!(path = %path.display(), "wrote workflow graph");
    }

    if args.dry_run {
        print_dry_run(&workflow)?;
        return Ok(());
    }

    let result = workflow.run().await;
    print_summary(&workflow, result.as_ref().ok());
    result?;
    Ok(())
}

fn build_workflow(args: &CliArgs) -> Result<Workflow> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let workflow = match &args.command {
        Command::Run { config } => {
            let file = load_and_validate(config)
                .with_context(|| format!("loading pipeline {}", config.display()))?;
            file.build_workflow()?
        }
        Command::GcRatio { base_dir, mode } => {
            let params = WindowParams::draw(*mode, &mut rng);
            info!(start = params.start, count = params.count, "drew window parameters");
            gc_ratio_window(base_dir, params)?
        }
        Command::GcPrefix { base_dir, mode } => {
            let params = PrefixParams::draw(*mode, &mut rng);
            info!(count1 = params.count1, count2 = params.count2, "drew prefix parameters");
            gc_ratio_prefix(base_dir, params)?
        }
    };

    Ok(workflow)
}

/// Validate and print each process with its rendered command.
fn print_dry_run(workflow: &Workflow) -> Result<()> {
    let plan = workflow.validate()?;

    println!("filedag dry-run");
    println!("  workflow = {}", plan.workflow);
    println!("  max_concurrency = {}", plan.max_concurrency);
    println!("  workdir = {}", plan.workdir.display());
    println!();

    println!("processes ({}):", plan.len());
    for &idx in &plan.topo_order {
        let Some(p) = plan.get(idx) else { continue };
        println!("  - {}", p.name);
        println!("      cmd: {}", p.command);
        if !p.deps.is_empty() {
            let deps: Vec<&str> = p
                .deps
                .iter()
                .filter_map(|&d| plan.get(d).map(|dp| dp.name.as_str()))
                .collect();
            println!("      after: {deps:?}");
        }
        for out in &p.outputs {
            println!("      out {}: {}", out.port, out.path.display());
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

/// Final process and port states after a run.
fn print_summary(workflow: &Workflow, report: Option<&RunReport>) {
    println!("workflow {}: {:?}", workflow.name(), workflow.state());
    for process in workflow.processes() {
        println!("  {} [{:?}]", process.name(), process.state());
        for value in process.outputs() {
            match (value.state(), value.digest()) {
                (PortState::Ready, Some(digest)) => println!(
                    "      {} -> {} (blake3 {})",
                    value.port(),
                    value.path().display(),
                    &digest[..digest.len().min(16)]
                ),
                (state, _) => println!(
                    "      {} -> {} ({state:?})",
                    value.port(),
                    value.path().display()
                ),
            }
        }
    }
    if let Some(report) = report {
        println!(
            "dispatched {} processes, peak concurrency {}",
            report.dispatch_order().len(),
            report.peak_concurrency()
        );
    }
}
