//! DuckDB-backed [`Warehouse`]

use crate::error::{DbError, DbResult};
use crate::warehouse::{RelationKind, Warehouse};
use async_trait::async_trait;
use duckdb::Connection;
use std::path::Path;
use std::sync::Mutex;

/// One DuckDB connection, serialized behind a mutex
pub struct DuckDbWarehouse {
    conn: Mutex<Connection>,
}

impl DuckDbWarehouse {
    pub fn in_memory() -> DbResult<Self> {
        Connection::open_in_memory()
            .map(Self::wrap)
            .map_err(|e| DbError::Open {
                path: ":memory:".to_string(),
                reason: e.to_string(),
            })
    }

    pub fn open(path: &Path) -> DbResult<Self> {
        Connection::open(path)
            .map(Self::wrap)
            .map_err(|e| DbError::Open {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Open `location`, where `:memory:` selects a transient database
    pub fn connect(location: &str) -> DbResult<Self> {
        match location {
            ":memory:" => Self::in_memory(),
            file => Self::open(Path::new(file)),
        }
    }

    fn wrap(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> duckdb::Result<T>) -> DbResult<T> {
        let conn = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&conn).map_err(DbError::from)
    }

    fn batch(&self, sql: &str) -> DbResult<()> {
        self.with_conn(|c| c.execute_batch(sql))
    }

    fn first_i64(&self, sql: &str) -> DbResult<i64> {
        let no_value = || DbError::NoValue(sql.to_string());
        let conn = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match conn.query_row(sql, [], |row| row.get::<_, Option<i64>>(0)) {
            Ok(Some(value)) => Ok(value),
            Ok(None) | Err(duckdb::Error::QueryReturnedNoRows) => Err(no_value()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Warehouse for DuckDbWarehouse {
    async fn run_script(&self, sql: &str) -> DbResult<()> {
        self.batch(sql)
    }

    async fn materialize(&self, relation: &str, kind: RelationKind, select: &str) -> DbResult<()> {
        self.batch(&format!(
            "CREATE OR REPLACE {} {} AS {}",
            kind.keyword(),
            relation,
            select
        ))
    }

    async fn ensure_schema(&self, schema: &str) -> DbResult<()> {
        self.batch(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
    }

    async fn drop_relation(&self, relation: &str) -> DbResult<()> {
        // DROP VIEW on a table is an error in DuckDB, and vice versa
        for kind in [RelationKind::View, RelationKind::Table] {
            let sql = format!("DROP {} IF EXISTS {}", kind.keyword(), relation);
            if let Err(e) = self.batch(&sql) {
                log::debug!("Ignoring '{}': {}", sql, e);
            }
        }
        Ok(())
    }

    async fn has_relation(&self, name: &str) -> DbResult<bool> {
        let (schema, table) = name.rsplit_once('.').unwrap_or(("main", name));
        let found: i64 = self.with_conn(|c| {
            c.query_row(
                "SELECT count(*) FROM information_schema.tables \
                 WHERE table_schema = ? AND table_name = ?",
                duckdb::params![schema, table],
                |row| row.get(0),
            )
        })?;
        Ok(found > 0)
    }

    async fn count_rows(&self, select: &str) -> DbResult<u64> {
        let rows = self.first_i64(&format!("SELECT count(*) FROM ({}) AS counted", select))?;
        Ok(u64::try_from(rows).unwrap_or(0))
    }

    async fn scalar(&self, sql: &str) -> DbResult<i64> {
        self.first_i64(sql)
    }

    fn backend(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
