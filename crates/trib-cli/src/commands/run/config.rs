//! Building the run configuration from command-line flags

use anyhow::{Context, Result};
use trib_core::{
    parse_end_date, parse_start_date, PackageManager, Pipeline, RunConfig, TaskKind,
    DEFAULT_WORKERS,
};

use crate::cli::RunArgs;

/// Assemble the immutable [`RunConfig`] for a run of `pipeline`.
///
/// Dates default to yesterday. A full refresh starts the window at the
/// pipeline's `start_date` when one is configured and `--start-date` is not
/// given.
pub(crate) fn build_run_config(args: &RunArgs, pipeline: &Pipeline) -> Result<RunConfig> {
    let mut config = RunConfig::default();

    if let Some(start) = &args.start_date {
        config.start_date = parse_start_date(start).context("Invalid --start-date")?;
    } else if args.full_refresh {
        if let Some(start) = &pipeline.config.start_date {
            config.start_date =
                parse_start_date(start).context("Invalid start_date in pipeline.yml")?;
        }
    }
    if let Some(end) = &args.end_date {
        config.end_date = parse_end_date(end).context("Invalid --end-date")?;
    }

    config.workers = args
        .workers
        .or(pipeline.config.default_parallelism)
        .unwrap_or(DEFAULT_WORKERS);
    config.downstream = args.downstream;
    config.environment = args.environment.clone();
    config.force = args.force;
    config.push_metadata = args.push_metadata;
    config.no_log_file = args.no_log_file;
    config.full_refresh = args.full_refresh;
    config.package_manager = if args.use_pip {
        PackageManager::Pip
    } else {
        PackageManager::Uv
    };
    config.tag = args.tag.clone();
    config.exclude_tag = args.exclude_tag.clone();
    config.only = args.only.iter().map(|&o| TaskKind::from(o)).collect();
    config.continue_run = args.continue_run;
    config.targets = args.assets.clone();

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
