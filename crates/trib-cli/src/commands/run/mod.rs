//! Run command implementation

mod checks;
mod config;
mod executor;

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use trib_core::StateStore;
use trib_db::KeyedRetryMutex;
use trib_lineage::infer_upstreams;
use trib_run::{RunOutcome, Runner, SkipReason};

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::{load_pipeline, ExitCode};

use config::build_run_config;
use executor::DuckDbAssetExecutor;

/// Exit code for a run with failed assets
const EXIT_FAILED: i32 = 1;
/// Exit code for a run interrupted before all assets ran
const EXIT_CANCELLED: i32 = 130;

/// Execute the run command
pub async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let mut pipeline = load_pipeline(&args.path)?;
    let inferred = infer_upstreams(&mut pipeline);
    if global.verbose {
        eprintln!("[verbose] Inferred {} upstream reference(s) from SQL", inferred);
    }
    let config = build_run_config(args, &pipeline)?;

    let locks = Arc::new(KeyedRetryMutex::new());
    let executor = Arc::new(DuckDbAssetExecutor::new(&pipeline, locks));
    if global.verbose {
        eprintln!("[verbose] Database: {}", executor.db_path().display());
    }

    let store = StateStore::for_pipeline(&pipeline.root, pipeline.name());
    let runner = Runner::new(executor, store);

    let cancel = runner.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, waiting for running assets to finish...");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    println!(
        "Running pipeline '{}' ({} assets)...\n",
        pipeline.name(),
        pipeline.len()
    );
    let no_log_file = config.no_log_file;
    let outcome = runner
        .run(&pipeline, config)
        .await
        .context("Run failed")?;

    let report = format_report(&outcome);
    print!("{}", report);
    if !no_log_file {
        write_log_file(&outcome.state_path.with_extension("log"), &report);
    }
    if global.verbose {
        eprintln!("[verbose] Run state: {}", outcome.state_path.display());
    }

    let summary = &outcome.summary;
    if summary.has_failures() {
        return Err(ExitCode(EXIT_FAILED).into());
    }
    if summary.cancelled {
        return Err(ExitCode(EXIT_CANCELLED).into());
    }
    Ok(())
}

/// End-of-run report: failures, skips and totals
fn format_report(outcome: &RunOutcome) -> String {
    let summary = &outcome.summary;
    let mut out = String::new();

    if summary.has_failures() {
        let _ = writeln!(out, "\nFailed assets:");
        for failed in &summary.failed {
            let _ = writeln!(out, "  \u{2717} {} - {}", failed.name, failed.error);
        }
    }

    let continued: Vec<&str> = summary
        .skipped_with(SkipReason::PreviouslySucceeded)
        .collect();
    if !continued.is_empty() {
        let _ = writeln!(
            out,
            "\nSkipped {} asset(s) that succeeded in the previous run",
            continued.len()
        );
    }
    let filtered = summary.skipped_with(SkipReason::Filtered).count();
    if filtered > 0 {
        let _ = writeln!(out, "\nSkipped {} asset(s) excluded by filters", filtered);
    }
    if !summary.pending.is_empty() {
        let _ = writeln!(
            out,
            "\n{} asset(s) not started: {}",
            summary.pending.len(),
            summary.pending.join(", ")
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Completed: {} succeeded, {} failed, {} skipped",
        summary.succeeded.len(),
        summary.failure_count(),
        summary.skipped.len()
    );
    let _ = writeln!(out, "Total time: {}ms", summary.duration.as_millis());
    out
}

fn write_log_file(path: &Path, report: &str) {
    if let Err(e) = std::fs::write(path, report) {
        log::warn!("Failed to write run log {}: {}", path.display(), e);
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
