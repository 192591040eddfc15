//! Shared helpers for commands

use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;
use trib_core::Pipeline;
use trib_sql::Dialect;

/// Non-zero process exit status. `main` turns it into the exit code once
/// everything it owns has been dropped.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only, main() never prints it
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Load a pipeline directory with a readable error
pub(crate) fn load_pipeline(path: &Path) -> Result<Pipeline> {
    Pipeline::load(path).with_context(|| format!("Failed to load pipeline at {}", path.display()))
}

/// Quote a DuckDB identifier
pub(crate) fn quote_ident(ident: &str) -> String {
    Dialect::DuckDb.quote_ident(ident)
}

/// Quote a possibly schema-qualified name component by component
pub(crate) fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}

/// Escape a value for a single-quoted SQL string literal
pub(crate) fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Schema part of a qualified name, if any
pub(crate) fn schema_of(name: &str) -> Option<&str> {
    name.rfind('.').map(|pos| &name[..pos])
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
