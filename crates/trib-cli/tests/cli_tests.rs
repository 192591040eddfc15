//! End-to-end tests of the `trib` binary against a DuckDB pipeline

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn trib() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_trib"));
    cmd.env_remove("RUST_LOG")
        .env_remove("TRIB_WORKERS")
        .env_remove("TRIB_ENVIRONMENT");
    cmd
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    trib()
        .args(args)
        .arg(dir)
        .output()
        .expect("failed to run trib")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// raw_orders, raw_customers -> fct_orders; upstreams are inferred from SQL
fn shop() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "pipeline.yml", "name: shop\ndefault_parallelism: 2\n");
    write(
        root,
        "assets/raw_orders.sql",
        "select * from (values (1, 10, 100.0), (2, 11, 50.0), (3, 10, 25.5)) t(id, customer_id, amount)\n",
    );
    write(
        root,
        "assets/raw_orders.yml",
        "tags: [ingest]\ncolumns:\n  - name: id\n    type: integer\n    checks:\n      - name: unique\n      - name: not_null\n  - name: customer_id\n    type: integer\n  - name: amount\n    type: double\n    checks:\n      - name: positive\n",
    );
    write(
        root,
        "assets/raw_customers.sql",
        "select * from (values (10, 'ada'), (11, 'grace')) t(id, name)\n",
    );
    write(
        root,
        "assets/raw_customers.yml",
        "tags: [ingest]\ncolumns:\n  - name: id\n    type: integer\n  - name: name\n    type: varchar\n",
    );
    write(
        root,
        "assets/fct_orders.sql",
        "select o.id, c.name as customer_name, o.amount\nfrom raw_orders o\njoin raw_customers c on o.customer_id = c.id\n",
    );
    dir
}

fn state_files(root: &Path) -> Vec<std::path::PathBuf> {
    let dir = root.join("logs/runs/shop");
    let mut files: Vec<_> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

#[test]
fn test_run_succeeds_and_records_state() {
    let dir = shop();
    let output = run_in(dir.path(), &["run"]);
    let out = stdout(&output);

    assert!(output.status.success(), "stdout: {out}\nstderr: {}", stderr(&output));
    assert!(out.contains("\u{2713} raw_orders"));
    assert!(out.contains("\u{2713} raw_orders (checks)"));
    assert!(out.contains("\u{2713} fct_orders"));
    assert!(out.contains("Completed: 3 succeeded, 0 failed, 0 skipped"));

    let files = state_files(dir.path());
    assert_eq!(files.len(), 1);
    let state: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(state["Parameters"]["Workers"], 2);
    assert!(state["State"]
        .as_array()
        .unwrap()
        .iter()
        .all(|s| s["Status"] == "succeeded"));
    assert!(files[0].with_extension("log").is_file());
    assert!(dir.path().join("shop.duckdb").is_file());
}

#[test]
fn test_failed_asset_exits_non_zero_then_continue_recovers() {
    let dir = shop();
    write(
        dir.path(),
        "assets/raw_customers.sql",
        "select * from missing_source\n",
    );

    let first = run_in(dir.path(), &["run", "--no-log-file"]);
    let out = stdout(&first);
    assert_eq!(first.status.code(), Some(1), "stdout: {out}");
    assert!(out.contains("\u{2717} raw_customers"));
    assert!(out.contains("\u{2717} fct_orders - upstream 'raw_customers' failed"));
    assert!(out.contains("1 succeeded, 2 failed"));

    write(
        dir.path(),
        "assets/raw_customers.sql",
        "select * from (values (10, 'ada'), (11, 'grace')) t(id, name)\n",
    );
    let second = run_in(dir.path(), &["run", "--continue", "--no-log-file"]);
    let out = stdout(&second);
    assert!(second.status.success(), "stdout: {out}\nstderr: {}", stderr(&second));
    assert!(!out.contains("\u{2713} raw_orders"));
    assert!(out.contains("\u{2713} raw_customers"));
    assert!(out.contains("\u{2713} fct_orders"));
    assert!(out.contains("Skipped 1 asset(s) that succeeded in the previous run"));
}

#[test]
fn test_continue_without_previous_run_fails() {
    let dir = shop();
    let output = run_in(dir.path(), &["run", "--continue"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("[R003]"));
}

#[test]
fn test_tag_filter_runs_only_tagged_assets() {
    let dir = shop();
    let output = run_in(dir.path(), &["run", "--tag", "ingest", "--only", "main"]);
    let out = stdout(&output);
    assert!(output.status.success(), "stdout: {out}");
    assert!(out.contains("\u{2713} raw_orders"));
    assert!(!out.contains("(checks)"));
    assert!(!out.contains("fct_orders"));
    assert!(out.contains("Skipped 1 asset(s) excluded by filters"));
}

#[test]
fn test_failing_check_fails_run() {
    let dir = shop();
    write(
        dir.path(),
        "assets/raw_orders.sql",
        "select * from (values (1, 10, -1.0)) t(id, customer_id, amount)\n",
    );
    let output = run_in(dir.path(), &["run", "--no-log-file"]);
    let out = stdout(&output);
    assert_eq!(output.status.code(), Some(1), "stdout: {out}");
    assert!(out.contains("positive(amount) returned 1 failing row(s)"));
    assert!(out.contains("\u{2713} raw_customers"));
}

#[test]
fn test_lineage_json() {
    let dir = shop();
    let output = run_in(dir.path(), &["lineage", "--output", "json", "--asset", "fct_orders"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let assets = json.as_array().unwrap();
    assert_eq!(assets.len(), 1);
    let fct = &assets[0];
    assert_eq!(fct["name"], "fct_orders");
    let columns: Vec<&str> = fct["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(columns, vec!["id", "customer_name", "amount"]);
    assert_eq!(fct["columns"][1]["type"], "varchar");
    assert_eq!(fct["columns"][1]["upstreams"][0], "raw_customers.name");
}

#[test]
fn test_lineage_unknown_asset() {
    let dir = shop();
    let output = run_in(dir.path(), &["lineage", "--asset", "nope"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Asset not found: nope"));
}
