use super::*;

fn name(s: &str) -> AssetName {
    AssetName::try_new(s).unwrap()
}

#[test]
fn test_upstream_columns_reject_duplicates() {
    let mut col = Column::new("id", "int");
    assert!(col.push_upstream(UpstreamColumn::new("customers", "id")));
    assert!(!col.push_upstream(UpstreamColumn::new("customers", "id")));
    assert!(col.push_upstream(UpstreamColumn::new("orders", "id")));
    assert_eq!(col.upstreams.len(), 2);
    assert!(col.upstreams.contains("orders", "id"));
}

#[test]
fn test_upstream_duplicate_ignores_table() {
    let mut set = UpstreamColumns::new();
    set.push(UpstreamColumn::new("raw", "id"));
    let mut other = UpstreamColumn::new("raw", "id");
    other.table = "other_table".to_string();
    assert!(!set.push(other));
    assert_eq!(set.iter().next().unwrap().table, "raw");
}

#[test]
fn test_upstream_columns_deserialize_dedups() {
    let yaml = r#"
name: id
type: int
upstreams:
  - { asset: a, column: id, table: a }
  - { asset: a, column: id, table: a }
  - { asset: b, column: id }
"#;
    let col: Column = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(col.upstreams.len(), 2);
    let assets: Vec<&str> = col.upstreams.iter().map(|u| u.asset.as_str()).collect();
    assert_eq!(assets, vec!["a", "b"]);
}

#[test]
fn test_column_check_defaults_to_blocking() {
    let yaml = r#"
name: status
type: varchar
checks:
  - name: not_null
  - name: accepted_values
    value: [active, churned]
  - name: unique
    blocking: false
"#;
    let col: Column = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(col.checks.len(), 3);
    assert!(col.checks[0].blocking);
    assert!(col.checks[0].value.is_none());
    assert!(col.checks[1].value.as_ref().unwrap().is_sequence());
    assert!(!col.checks[2].blocking);
}

#[test]
fn test_has_checks() {
    let mut asset = Asset::new(name("orders"), "duckdb.sql", "select 1 as id");
    assert!(!asset.has_checks());

    let mut col = Column::new("id", "int");
    col.checks.push(ColumnCheck::new("not_null"));
    asset.columns.push(col);
    assert!(asset.has_checks());
}

#[test]
fn test_add_upstream_keeps_order_without_duplicates() {
    let mut asset = Asset::new(name("c"), "duckdb.sql", "");
    asset.add_upstream(name("b"));
    asset.add_upstream(name("a"));
    asset.add_upstream(name("b"));
    let ups: Vec<&str> = asset.upstreams.iter().map(|u| u.as_str()).collect();
    assert_eq!(ups, vec!["b", "a"]);
}

#[test]
fn test_get_column_is_exact() {
    let mut asset = Asset::new(name("people"), "duckdb.sql", "");
    asset.columns.push(Column::new("Name", "varchar"));
    assert!(asset.get_column("Name").is_some());
    assert!(asset.get_column("name").is_none());
    asset.get_column_mut("Name").unwrap().primary_key = true;
    assert!(asset.columns[0].primary_key);
}

#[test]
fn test_asset_name_rejects_empty_in_yaml() {
    let name: AssetName = serde_yaml::from_str("mart.daily_sales").unwrap();
    assert_eq!(name, "mart.daily_sales");
    assert_eq!(serde_json::to_string(&name).unwrap(), "\"mart.daily_sales\"");

    let err = serde_yaml::from_str::<AssetName>("''").unwrap_err();
    assert!(err.to_string().contains("must not be empty"));
}
