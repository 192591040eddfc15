//! Check SQL generation and evaluation
//!
//! Column checks compile to a query returning the violating rows; the check
//! passes when it returns none. Custom checks run their own query and pass
//! when its single value equals the declared one.

use anyhow::{anyhow, bail, Result};
use serde_yaml::Value;
use trib_core::{Asset, ColumnCheck};
use trib_db::Warehouse;

use crate::commands::common::{escape_sql_string, quote_ident, quote_qualified};

/// A compiled check
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CheckQuery {
    /// Display name, `check(column)` or the custom check name
    pub name: String,
    pub kind: CheckKind,
    pub sql: String,
    pub blocking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CheckKind {
    /// Passes when the query returns no rows
    NoRows,
    /// Passes when the query's value equals the expected one
    Equals(i64),
}

/// SQL returning the rows of `table` that violate `check` on `column`
pub(crate) fn column_check_sql(table: &str, column: &str, check: &ColumnCheck) -> Result<String> {
    let qt = quote_qualified(table);
    let qc = quote_ident(column);
    let sql = match check.name.as_str() {
        "not_null" => format!("SELECT * FROM {qt} WHERE {qc} IS NULL"),
        "unique" => {
            format!("SELECT {qc}, COUNT(*) AS cnt\nFROM {qt}\nGROUP BY {qc}\nHAVING COUNT(*) > 1")
        }
        "positive" => format!("SELECT * FROM {qt} WHERE {qc} <= 0"),
        "non_negative" => format!("SELECT * FROM {qt} WHERE {qc} < 0"),
        "negative" => format!("SELECT * FROM {qt} WHERE {qc} >= 0"),
        "accepted_values" => {
            let values = accepted_values(check)?;
            format!("SELECT * FROM {qt} WHERE {qc} NOT IN ({values}) OR {qc} IS NULL")
        }
        "min" => format!("SELECT * FROM {qt} WHERE {qc} < {}", threshold(check)?),
        "max" => format!("SELECT * FROM {qt} WHERE {qc} > {}", threshold(check)?),
        other => bail!("unknown check '{}' on column '{}'", other, column),
    };
    Ok(sql)
}

fn literal(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(format!("'{}'", escape_sql_string(s))),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
        other => Err(anyhow!("unsupported accepted value: {:?}", other)),
    }
}

fn accepted_values(check: &ColumnCheck) -> Result<String> {
    let Some(Value::Sequence(values)) = &check.value else {
        bail!("accepted_values needs a list of values");
    };
    if values.is_empty() {
        bail!("accepted_values needs at least one value");
    }
    let literals = values.iter().map(literal).collect::<Result<Vec<_>>>()?;
    Ok(literals.join(", "))
}

fn threshold(check: &ColumnCheck) -> Result<f64> {
    let value = match &check.value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => bail!("{} needs a finite numeric value", check.name),
    }
}

/// Compile every column and custom check of `asset`
pub(crate) fn asset_checks(asset: &Asset) -> Result<Vec<CheckQuery>> {
    let mut checks = Vec::new();
    for column in &asset.columns {
        for check in &column.checks {
            checks.push(CheckQuery {
                name: format!("{}({})", check.name, column.name),
                kind: CheckKind::NoRows,
                sql: column_check_sql(&asset.name, &column.name, check)?,
                blocking: check.blocking,
            });
        }
    }
    for custom in &asset.custom_checks {
        checks.push(CheckQuery {
            name: custom.name.clone(),
            kind: CheckKind::Equals(custom.value),
            sql: custom.query.trim().trim_end_matches(';').to_string(),
            blocking: custom.blocking,
        });
    }
    Ok(checks)
}

/// Evaluate one check; `Ok(None)` when it passes, `Ok(Some(reason))` when not
pub(crate) async fn evaluate(db: &dyn Warehouse, check: &CheckQuery) -> Result<Option<String>> {
    match check.kind {
        CheckKind::NoRows => {
            let failures = db.count_rows(&check.sql).await?;
            Ok((failures > 0).then(|| format!("{} returned {} failing row(s)", check.name, failures)))
        }
        CheckKind::Equals(expected) => {
            let actual = db.scalar(&check.sql).await?;
            Ok((actual != expected)
                .then(|| format!("{} returned {}, expected {}", check.name, actual, expected)))
        }
    }
}

/// Run all checks of `asset`. Non-blocking failures are only logged.
pub(crate) async fn run_checks(db: &dyn Warehouse, asset: &Asset) -> Result<()> {
    let mut failures = Vec::new();
    for check in asset_checks(asset)? {
        log::debug!("Running check {} on {}", check.name, asset.name);
        match evaluate(db, &check).await? {
            None => {}
            Some(reason) if check.blocking => failures.push(reason),
            Some(reason) => log::warn!("Non-blocking check failed on {}: {}", asset.name, reason),
        }
    }
    if !failures.is_empty() {
        bail!("{}", failures.join("; "));
    }
    Ok(())
}

#[cfg(test)]
#[path = "checks_test.rs"]
mod tests;
