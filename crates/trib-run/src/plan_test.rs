use super::*;
use trib_core::{Asset, AssetStatus, Column, ColumnCheck};

fn name(s: &str) -> AssetName {
    AssetName::try_new(s).unwrap()
}

fn asset(n: &str, upstreams: &[&str], tags: &[&str]) -> Asset {
    let mut asset = Asset::new(name(n), "duckdb.sql", "select 1");
    for up in upstreams {
        asset.add_upstream(name(up));
    }
    asset.tags = tags.iter().map(|t| t.to_string()).collect();
    asset
}

fn with_checks(mut asset: Asset) -> Asset {
    let mut col = Column::new("id", "int");
    col.checks.push(ColumnCheck::new("not_null"));
    asset.columns.push(col);
    asset
}

/// raw -> stg -> mart, raw -> audit
fn pipeline() -> Pipeline {
    Pipeline::from_assets(
        "shop",
        vec![
            with_checks(asset("raw", &[], &["ingest"])),
            asset("stg", &["raw"], &["transform"]),
            asset("mart", &["stg"], &["transform", "slow"]),
            asset("audit", &["raw"], &[]),
        ],
    )
    .unwrap()
}

fn task_names(plan: &RunPlan) -> Vec<String> {
    plan.tasks().iter().map(|t| t.id.to_string()).collect()
}

fn index_of(plan: &RunPlan, id: &str) -> usize {
    plan.tasks()
        .iter()
        .position(|t| t.id.to_string() == id)
        .unwrap_or_else(|| panic!("task {id} not planned"))
}

fn deps_of(plan: &RunPlan, id: &str) -> Vec<String> {
    plan.tasks()[index_of(plan, id)]
        .deps
        .iter()
        .map(|&i| plan.tasks()[i].id.to_string())
        .collect()
}

fn config() -> RunConfig {
    RunConfig::default()
}

fn previous(pipeline: &Pipeline, statuses: &[(&str, AssetStatus)]) -> PipelineState {
    let mut state = PipelineState::new(
        config(),
        pipeline.compatibility_hash(),
        pipeline.asset_names().map(|n| n.to_string()),
    );
    for (name, status) in statuses {
        state.set_status(name, *status);
    }
    state
}

#[test]
fn test_default_universe_is_main_and_checks() {
    let p = pipeline();
    let plan = RunPlan::build(&p, &config(), None).unwrap();

    assert_eq!(plan.len(), 5);
    assert!(plan.skipped().is_empty());
    assert!(task_names(&plan).contains(&"raw:checks".to_string()));
    assert!(!task_names(&plan).contains(&"stg:checks".to_string()));
}

#[test]
fn test_dependencies_point_backwards() {
    let p = pipeline();
    let plan = RunPlan::build(&p, &config(), None).unwrap();
    for (i, task) in plan.tasks().iter().enumerate() {
        assert!(task.deps.iter().all(|&d| d < i), "{} depends forward", task.id);
    }
}

#[test]
fn test_main_waits_for_upstream_main_and_checks() {
    let p = pipeline();
    let plan = RunPlan::build(&p, &config(), None).unwrap();

    assert_eq!(deps_of(&plan, "raw:main"), Vec::<String>::new());
    assert_eq!(deps_of(&plan, "raw:checks"), vec!["raw:main"]);
    assert_eq!(deps_of(&plan, "stg:main"), vec!["raw:main", "raw:checks"]);

    let mart = deps_of(&plan, "mart:main");
    assert!(mart.contains(&"stg:main".to_string()));
    assert!(mart.contains(&"raw:main".to_string()));
    assert!(!mart.contains(&"audit:main".to_string()));
}

#[test]
fn test_push_metadata_follows_main() {
    let p = pipeline();
    let cfg = RunConfig {
        push_metadata: true,
        ..config()
    };
    let plan = RunPlan::build(&p, &cfg, None).unwrap();
    assert_eq!(plan.len(), 9);
    assert_eq!(deps_of(&plan, "stg:push-metadata"), vec!["stg:main"]);
}

#[test]
fn test_only_restricts_task_kinds() {
    let p = pipeline();
    let cfg = RunConfig {
        only: vec![TaskKind::Checks],
        ..config()
    };
    let plan = RunPlan::build(&p, &cfg, None).unwrap();
    assert_eq!(task_names(&plan), vec!["raw:checks"]);
    assert!(plan.tasks()[0].deps.is_empty());
}

#[test]
fn test_tag_and_exclude_tag() {
    let p = pipeline();
    let cfg = RunConfig {
        tag: Some("transform".to_string()),
        exclude_tag: Some("slow".to_string()),
        ..config()
    };
    let plan = RunPlan::build(&p, &cfg, None).unwrap();

    assert_eq!(task_names(&plan), vec!["stg:main"]);
    assert_eq!(plan.skip_reason("raw"), Some(SkipReason::Filtered));
    assert_eq!(plan.skip_reason("mart"), Some(SkipReason::Filtered));
    assert_eq!(plan.skip_reason("audit"), Some(SkipReason::Filtered));
    assert_eq!(plan.skip_reason("stg"), None);
}

#[test]
fn test_filtered_gap_keeps_transitive_order() {
    let p = pipeline();
    let cfg = RunConfig {
        exclude_tag: Some("transform".to_string()),
        targets: Vec::new(),
        ..config()
    };
    let plan = RunPlan::build(&p, &cfg, None).unwrap();
    assert_eq!(plan.skip_reason("stg"), Some(SkipReason::Filtered));
    assert_eq!(deps_of(&plan, "audit:main"), vec!["raw:main", "raw:checks"]);
}

#[test]
fn test_target_with_downstream() {
    let p = pipeline();
    let cfg = RunConfig {
        targets: vec!["stg".to_string()],
        downstream: true,
        ..config()
    };
    let plan = RunPlan::build(&p, &cfg, None).unwrap();
    let assets: Vec<String> = plan.scheduled_assets().iter().map(|n| n.to_string()).collect();
    assert_eq!(assets, vec!["stg", "mart"]);
    assert_eq!(deps_of(&plan, "mart:main"), vec!["stg:main"]);
}

#[test]
fn test_target_without_downstream() {
    let p = pipeline();
    let cfg = RunConfig {
        targets: vec!["stg".to_string()],
        ..config()
    };
    let plan = RunPlan::build(&p, &cfg, None).unwrap();
    assert_eq!(task_names(&plan), vec!["stg:main"]);
}

#[test]
fn test_unknown_target() {
    let p = pipeline();
    let cfg = RunConfig {
        targets: vec!["nope".to_string()],
        ..config()
    };
    let err = RunPlan::build(&p, &cfg, None).unwrap_err();
    assert!(matches!(err, RunError::UnknownAsset { name } if name == "nope"));
}

#[test]
fn test_continue_reruns_failed_and_dependents() {
    let p = pipeline();
    let prev = previous(
        &p,
        &[
            ("raw", AssetStatus::Succeeded),
            ("stg", AssetStatus::Failed),
            ("mart", AssetStatus::Failed),
            ("audit", AssetStatus::Succeeded),
        ],
    );
    let plan = RunPlan::build(&p, &config(), Some(&prev)).unwrap();

    assert_eq!(task_names(&plan), vec!["stg:main", "mart:main"]);
    assert_eq!(plan.skip_reason("raw"), Some(SkipReason::PreviouslySucceeded));
    assert_eq!(plan.skip_reason("audit"), Some(SkipReason::PreviouslySucceeded));
    assert_eq!(deps_of(&plan, "stg:main"), Vec::<String>::new());
}

#[test]
fn test_continue_requeues_dependents_of_pending() {
    let p = pipeline();
    // mart was recorded as succeeded but its upstream never finished
    let prev = previous(
        &p,
        &[
            ("raw", AssetStatus::Succeeded),
            ("stg", AssetStatus::Pending),
            ("mart", AssetStatus::Succeeded),
            ("audit", AssetStatus::Succeeded),
        ],
    );
    let plan = RunPlan::build(&p, &config(), Some(&prev)).unwrap();
    assert_eq!(task_names(&plan), vec!["stg:main", "mart:main"]);
}

#[test]
fn test_continue_with_changed_pipeline_fails() {
    let p = pipeline();
    let mut prev = previous(&p, &[]);
    prev.compatibility_hash = "0000".to_string();

    let err = RunPlan::build(&p, &config(), Some(&prev)).unwrap_err();
    match err {
        RunError::IncompatibleState { expected, found } => {
            assert_eq!(expected, p.compatibility_hash());
            assert_eq!(found, "0000");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_continue_after_full_success_plans_nothing() {
    let p = pipeline();
    let mut prev = previous(
        &p,
        &[
            ("raw", AssetStatus::Succeeded),
            ("mart", AssetStatus::Succeeded),
            ("audit", AssetStatus::Succeeded),
        ],
    );
    prev.set_skipped("stg", SkipReason::PreviouslySucceeded);

    let plan = RunPlan::build(&p, &config(), Some(&prev)).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.skipped().len(), 4);
}

#[test]
fn test_continue_runs_assets_filtered_out_of_previous_run() {
    let p = pipeline();
    let mut prev = previous(&p, &[("raw", AssetStatus::Succeeded)]);
    for n in ["stg", "mart", "audit"] {
        prev.set_skipped(n, SkipReason::Filtered);
    }

    let plan = RunPlan::build(&p, &config(), Some(&prev)).unwrap();
    let mut names = task_names(&plan);
    names.sort();
    assert_eq!(names, vec!["audit:main", "mart:main", "stg:main"]);
    assert_eq!(plan.skip_reason("raw"), Some(SkipReason::PreviouslySucceeded));
    assert_eq!(plan.skipped().len(), 1);
}

#[test]
fn test_continue_reruns_skipped_asset_without_reason() {
    let p = pipeline();
    let prev = previous(
        &p,
        &[
            ("raw", AssetStatus::Succeeded),
            ("stg", AssetStatus::Skipped),
            ("mart", AssetStatus::Succeeded),
            ("audit", AssetStatus::Succeeded),
        ],
    );
    let plan = RunPlan::build(&p, &config(), Some(&prev)).unwrap();
    assert_eq!(task_names(&plan), vec!["stg:main", "mart:main"]);
}
