//! Jinja rendering of asset bodies with the run window in context

use anyhow::{Context, Result};
use minijinja::{context, Environment};
use trib_core::RunConfig;

const DATE: &str = "%Y-%m-%d";
const DATETIME: &str = "%Y-%m-%dT%H:%M:%S";

/// Renders asset SQL with the run's variables
pub(crate) struct SqlRenderer {
    env: Environment<'static>,
}

impl SqlRenderer {
    pub(crate) fn new() -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        Self { env }
    }

    /// Render `sql`; text without template syntax comes back unchanged.
    ///
    /// Available variables: `start_date`, `end_date` (`YYYY-MM-DD`),
    /// `start_datetime`, `end_datetime` (`YYYY-MM-DDTHH:MM:SS`),
    /// `environment` and `full_refresh`.
    pub(crate) fn render(&self, sql: &str, config: &RunConfig) -> Result<String> {
        let ctx = context! {
            start_date => config.start_date.format(DATE).to_string(),
            end_date => config.end_date.format(DATE).to_string(),
            start_datetime => config.start_date.format(DATETIME).to_string(),
            end_datetime => config.end_date.format(DATETIME).to_string(),
            environment => config.environment.clone().unwrap_or_default(),
            full_refresh => config.full_refresh,
        };
        self.env
            .render_str(sql, ctx)
            .context("Failed to render asset template")
    }
}

impl Default for SqlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "template_test.rs"]
mod tests;
