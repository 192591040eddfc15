//! The storage seam that task executors write through

use crate::error::DbResult;
use async_trait::async_trait;

/// How an asset's SELECT is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Table,
    View,
}

impl RelationKind {
    /// Keyword used in DDL
    pub fn keyword(self) -> &'static str {
        match self {
            RelationKind::Table => "TABLE",
            RelationKind::View => "VIEW",
        }
    }
}

/// A database that assets are materialized into and checked against
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Run one or more statements, discarding results
    async fn run_script(&self, sql: &str) -> DbResult<()>;

    /// Replace `relation` with the result of `select`
    async fn materialize(&self, relation: &str, kind: RelationKind, select: &str) -> DbResult<()>;

    async fn ensure_schema(&self, schema: &str) -> DbResult<()>;

    /// Drop `relation` whether it is a table or a view; absent is fine
    async fn drop_relation(&self, relation: &str) -> DbResult<()>;

    /// Whether an unquoted `schema.name` or `name` is in the catalog
    async fn has_relation(&self, name: &str) -> DbResult<bool>;

    /// Number of rows produced by `select`
    async fn count_rows(&self, select: &str) -> DbResult<u64>;

    /// First column of the first row, which must be a non-null integer
    async fn scalar(&self, sql: &str) -> DbResult<i64>;

    fn backend(&self) -> &'static str;
}
