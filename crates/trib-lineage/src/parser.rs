//! The SQL analyzer seam used by the extractor

use trib_sql::{Dialect, Lineage, Schema, SqlResult};

/// Computes column lineage of a SQL text against known table schemas
pub trait LineageParser {
    fn column_lineage(&self, sql: &str, dialect: Dialect, schema: &Schema) -> SqlResult<Lineage>;
}

/// [`LineageParser`] backed by the sqlparser-based analyzer in `trib-sql`
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlLineageParser;

impl LineageParser for SqlLineageParser {
    fn column_lineage(&self, sql: &str, dialect: Dialect, schema: &Schema) -> SqlResult<Lineage> {
        trib_sql::column_lineage(sql, dialect, schema)
    }
}
