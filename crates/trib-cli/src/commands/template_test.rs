use super::*;
use trib_core::{parse_end_date, parse_start_date};

fn window() -> RunConfig {
    RunConfig {
        start_date: parse_start_date("2024-03-01").unwrap(),
        end_date: parse_end_date("2024-03-02").unwrap(),
        environment: Some("prod".to_string()),
        ..RunConfig::default()
    }
}

#[test]
fn test_plain_sql_is_unchanged() {
    let sql = "select id, amount from raw_orders\n";
    assert_eq!(SqlRenderer::new().render(sql, &window()).unwrap(), sql);
}

#[test]
fn test_window_variables() {
    let sql = "select * from events where ts between '{{ start_datetime }}' and '{{ end_datetime }}' and day >= '{{ start_date }}'";
    let rendered = SqlRenderer::new().render(sql, &window()).unwrap();
    assert_eq!(
        rendered,
        "select * from events where ts between '2024-03-01T00:00:00' and '2024-03-02T23:59:59' and day >= '2024-03-01'"
    );
}

#[test]
fn test_conditionals_on_run_flags() {
    let sql = "{% if full_refresh %}full{% else %}{{ environment }}{% endif %}";
    let renderer = SqlRenderer::new();
    assert_eq!(renderer.render(sql, &window()).unwrap(), "prod");

    let config = RunConfig {
        full_refresh: true,
        ..window()
    };
    assert_eq!(renderer.render(sql, &config).unwrap(), "full");
}

#[test]
fn test_syntax_error_is_reported() {
    let err = SqlRenderer::new()
        .render("select {{ start_date", &window())
        .unwrap_err();
    assert!(err.to_string().contains("render"));
}
