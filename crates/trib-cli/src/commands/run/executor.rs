//! Task execution against the pipeline's DuckDB database
//!
//! DuckDB allows a single writer per database file, so every task holds the
//! database key on a shared [`KeyedRetryMutex`] for as long as it touches the
//! file, python scripts included.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use trib_core::{Asset, Materialization, PackageManager, Pipeline, RunConfig, TaskKind, DATE_FORMAT};
use trib_db::{lock_database, DatabaseGuard, DuckDbWarehouse, KeyedRetryMutex, RelationKind, Warehouse};
use trib_run::{AssetExecutor, ExecutionError, TaskContext};

use super::checks::run_checks;
use crate::commands::common::{escape_sql_string, quote_ident, quote_qualified, schema_of};
use crate::commands::template::SqlRenderer;

/// Executes asset tasks against one DuckDB file
pub(crate) struct DuckDbAssetExecutor {
    db_path: PathBuf,
    locks: Arc<KeyedRetryMutex>,
    renderer: SqlRenderer,
    /// Upstream assets of each asset, for python input tables
    inputs: HashMap<String, Vec<String>>,
}

impl DuckDbAssetExecutor {
    pub(crate) fn new(pipeline: &Pipeline, locks: Arc<KeyedRetryMutex>) -> Self {
        let inputs = pipeline
            .assets()
            .iter()
            .map(|a| {
                let ups = a.upstreams.iter().map(|u| u.to_string()).collect();
                (a.name.to_string(), ups)
            })
            .collect();
        Self {
            db_path: pipeline.database_path(),
            locks,
            renderer: SqlRenderer::new(),
            inputs,
        }
    }

    pub(crate) fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Wait for exclusive access to the database file
    async fn acquire(&self) -> Result<DatabaseGuard> {
        let locks = Arc::clone(&self.locks);
        let key = self.db_path.display().to_string();
        tokio::task::spawn_blocking(move || lock_database(&locks, key))
            .await
            .context("Database lock task failed")
    }

    fn open(&self) -> Result<DuckDbWarehouse> {
        Ok(DuckDbWarehouse::open(&self.db_path)?)
    }

    async fn run_task(&self, ctx: &TaskContext) -> Result<()> {
        let asset = ctx.asset.as_ref();
        let _guard = self.acquire().await?;

        if ctx.kind == TaskKind::Main && asset.is_python() {
            return self.run_python(asset, &ctx.config).await;
        }

        let db = self.open()?;
        match ctx.kind {
            TaskKind::Main => self.materialize(&db, asset, &ctx.config).await,
            TaskKind::Checks => run_checks(&db, asset).await,
            TaskKind::PushMetadata => push_metadata(&db, asset).await,
        }
    }

    async fn materialize(&self, db: &dyn Warehouse, asset: &Asset, config: &RunConfig) -> Result<()> {
        let rendered = self.renderer.render(&asset.sql, config)?;
        let select = rendered.trim().trim_end_matches(';').trim_end();
        if select.is_empty() {
            bail!("asset '{}' has no SQL", asset.name);
        }

        let relation = quote_qualified(&asset.name);
        if let Some(schema) = schema_of(&asset.name) {
            db.ensure_schema(&quote_qualified(schema)).await?;
        }
        if config.full_refresh {
            db.drop_relation(&relation).await?;
        }
        db.materialize(&relation, relation_kind(asset), select).await?;
        Ok(())
    }

    fn python_env(&self, asset: &Asset, config: &RunConfig) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert(
            "TRIB_DATABASE_PATH".to_string(),
            self.db_path.display().to_string(),
        );
        env.insert("TRIB_ASSET_NAME".to_string(), asset.name.to_string());
        env.insert("TRIB_OUTPUT_TABLE".to_string(), asset.name.to_string());
        let inputs = self.inputs.get(asset.name.as_str()).cloned().unwrap_or_default();
        env.insert(
            "TRIB_INPUT_TABLES".to_string(),
            serde_json::to_string(&inputs).unwrap_or_else(|_| "[]".to_string()),
        );
        env.insert(
            "TRIB_START_DATE".to_string(),
            config.start_date.format(DATE_FORMAT).to_string(),
        );
        env.insert(
            "TRIB_END_DATE".to_string(),
            config.end_date.format(DATE_FORMAT).to_string(),
        );
        env.insert(
            "TRIB_FULL_REFRESH".to_string(),
            if config.full_refresh { "1" } else { "0" }.to_string(),
        );
        if let Some(environment) = &config.environment {
            env.insert("TRIB_ENVIRONMENT".to_string(), environment.clone());
        }
        env
    }

    async fn run_python(&self, asset: &Asset, config: &RunConfig) -> Result<()> {
        let Some(script) = &asset.path else {
            bail!("python asset '{}' has no script file", asset.name);
        };

        let mut command = match config.package_manager {
            PackageManager::Uv => {
                let mut cmd = tokio::process::Command::new("uv");
                cmd.arg("run");
                cmd
            }
            PackageManager::Pip => tokio::process::Command::new("python3"),
        };
        let output = command
            .arg(script)
            .envs(self.python_env(asset, config))
            .output()
            .await
            .with_context(|| match config.package_manager {
                PackageManager::Uv => "Failed to execute 'uv run', is uv installed?",
                PackageManager::Pip => "Failed to execute 'python3'",
            })?;

        if !output.status.success() {
            bail!(
                "script exited with {}:\n{}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
        }

        if !asset.columns.is_empty() {
            let db = self.open()?;
            if !db.has_relation(&asset.name).await? {
                bail!(
                    "script did not create the expected output table '{}'",
                    asset.name
                );
            }
        }
        Ok(())
    }
}

fn relation_kind(asset: &Asset) -> RelationKind {
    match asset.materialization {
        Materialization::Table => RelationKind::Table,
        Materialization::View => RelationKind::View,
    }
}

/// Write asset and column descriptions as relation comments
async fn push_metadata(db: &dyn Warehouse, asset: &Asset) -> Result<()> {
    let relation = quote_qualified(&asset.name);
    let kind = relation_kind(asset).keyword();
    let mut statements = Vec::new();
    if !asset.description.is_empty() {
        statements.push(format!(
            "COMMENT ON {kind} {relation} IS '{}';",
            escape_sql_string(&asset.description)
        ));
    }
    for column in asset.columns.iter().filter(|c| !c.description.is_empty()) {
        statements.push(format!(
            "COMMENT ON COLUMN {relation}.{} IS '{}';",
            quote_ident(&column.name),
            escape_sql_string(&column.description)
        ));
    }
    if statements.is_empty() {
        log::debug!("No descriptions to push for {}", asset.name);
        return Ok(());
    }
    db.run_script(&statements.join("\n")).await?;
    Ok(())
}

#[async_trait]
impl AssetExecutor for DuckDbAssetExecutor {
    async fn execute(&self, ctx: &TaskContext) -> Result<(), ExecutionError> {
        let start = Instant::now();
        let label = match ctx.kind {
            TaskKind::Main => ctx.asset.name.to_string(),
            kind => format!("{} ({})", ctx.asset.name, kind),
        };
        match self.run_task(ctx).await {
            Ok(()) => {
                println!("  \u{2713} {} [{}ms]", label, start.elapsed().as_millis());
                Ok(())
            }
            Err(e) => {
                println!("  \u{2717} {} - {:#} [{}ms]", label, e, start.elapsed().as_millis());
                Err(ExecutionError::new(format!("{:#}", e)))
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
