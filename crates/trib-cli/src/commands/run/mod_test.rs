use super::*;
use std::path::PathBuf;
use std::time::Duration;
use trib_core::{PipelineState, RunConfig};
use trib_run::{FailedAsset, RunSummary, SkippedAsset};

fn outcome(summary: RunSummary) -> RunOutcome {
    RunOutcome {
        summary,
        state: PipelineState::new(RunConfig::default(), String::new(), Vec::<String>::new()),
        state_path: PathBuf::from("logs/runs/shop/2024_01_01_00_00_00.json"),
    }
}

#[test]
fn test_report_for_clean_run() {
    let report = format_report(&outcome(RunSummary {
        succeeded: vec!["a".to_string(), "b".to_string()],
        duration: Duration::from_millis(12),
        ..RunSummary::default()
    }));
    assert!(!report.contains("Failed assets"));
    assert!(report.contains("Completed: 2 succeeded, 0 failed, 0 skipped"));
    assert!(report.contains("Total time: 12ms"));
}

#[test]
fn test_report_lists_failures_and_skips() {
    let report = format_report(&outcome(RunSummary {
        succeeded: vec!["raw".to_string()],
        failed: vec![
            FailedAsset {
                name: "stg".to_string(),
                error: "boom".to_string(),
            },
            FailedAsset {
                name: "mart".to_string(),
                error: "upstream 'stg' failed".to_string(),
            },
        ],
        skipped: vec![
            SkippedAsset {
                name: "dim".to_string(),
                reason: SkipReason::PreviouslySucceeded,
            },
            SkippedAsset {
                name: "audit".to_string(),
                reason: SkipReason::Filtered,
            },
        ],
        ..RunSummary::default()
    }));
    assert!(report.contains("  \u{2717} stg - boom"));
    assert!(report.contains("  \u{2717} mart - upstream 'stg' failed"));
    assert!(report.contains("Skipped 1 asset(s) that succeeded in the previous run"));
    assert!(report.contains("Skipped 1 asset(s) excluded by filters"));
    assert!(report.contains("Completed: 1 succeeded, 2 failed, 2 skipped"));
}

#[test]
fn test_report_mentions_unstarted_assets() {
    let report = format_report(&outcome(RunSummary {
        pending: vec!["x".to_string(), "y".to_string()],
        cancelled: true,
        ..RunSummary::default()
    }));
    assert!(report.contains("2 asset(s) not started: x, y"));
}
