//! SQL dialects and their mapping from asset types

use serde::{Deserialize, Serialize};
use sqlparser::ast::Statement;
use sqlparser::dialect::{
    BigQueryDialect, ClickHouseDialect, DatabricksDialect, Dialect as ParserDialect,
    DuckDbDialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect,
    RedshiftSqlDialect, SnowflakeDialect,
};
use sqlparser::parser::Parser;
use std::fmt;

use crate::error::{SqlError, SqlResult};

/// A SQL dialect understood by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    BigQuery,
    Snowflake,
    DuckDb,
    Postgres,
    Redshift,
    MsSql,
    Databricks,
    ClickHouse,
    MySql,
    Generic,
}

impl Dialect {
    /// The underlying sqlparser dialect
    fn parser_dialect(&self) -> Box<dyn ParserDialect> {
        match self {
            Dialect::BigQuery => Box::new(BigQueryDialect {}),
            Dialect::Snowflake => Box::new(SnowflakeDialect {}),
            Dialect::DuckDb => Box::new(DuckDbDialect {}),
            Dialect::Postgres => Box::new(PostgreSqlDialect {}),
            Dialect::Redshift => Box::new(RedshiftSqlDialect {}),
            Dialect::MsSql => Box::new(MsSqlDialect {}),
            Dialect::Databricks => Box::new(DatabricksDialect {}),
            Dialect::ClickHouse => Box::new(ClickHouseDialect {}),
            Dialect::MySql => Box::new(MySqlDialect {}),
            Dialect::Generic => Box::new(GenericDialect {}),
        }
    }

    /// Parse SQL into AST statements
    pub fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        let dialect = self.parser_dialect();
        Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| {
            let message = e.to_string();
            let (line, column) = error_position(&message);
            SqlError::ParseError {
                message,
                line,
                column,
            }
        })
    }

    /// Quote an identifier for this dialect
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            Dialect::BigQuery | Dialect::Databricks | Dialect::MySql => {
                format!("`{}`", ident.replace('`', "``"))
            }
            Dialect::MsSql => format!("[{}]", ident.replace(']', "]]")),
            _ => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Dialect name
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::BigQuery => "bigquery",
            Dialect::Snowflake => "snowflake",
            Dialect::DuckDb => "duckdb",
            Dialect::Postgres => "postgres",
            Dialect::Redshift => "redshift",
            Dialect::MsSql => "tsql",
            Dialect::Databricks => "databricks",
            Dialect::ClickHouse => "clickhouse",
            Dialect::MySql => "mysql",
            Dialect::Generic => "generic",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve the SQL dialect of an asset from its type (`bq.sql`, `duckdb.sql`, ...)
pub fn dialect_for_asset_type(asset_type: &str) -> SqlResult<Dialect> {
    let dialect = match asset_type {
        "bq.sql" => Dialect::BigQuery,
        "sf.sql" => Dialect::Snowflake,
        "duckdb.sql" | "motherduck.sql" => Dialect::DuckDb,
        "pg.sql" => Dialect::Postgres,
        "rs.sql" => Dialect::Redshift,
        "ms.sql" | "synapse.sql" => Dialect::MsSql,
        "databricks.sql" => Dialect::Databricks,
        "clickhouse.sql" => Dialect::ClickHouse,
        "mysql.sql" => Dialect::MySql,
        "athena.sql" => Dialect::Generic,
        other => {
            return Err(SqlError::UnknownDialect {
                asset_type: other.to_string(),
            })
        }
    };
    Ok(dialect)
}

/// sqlparser only reports positions inside the message text, as
/// "... at Line: 3, Column: 12". Unknown positions are (0, 0).
fn error_position(msg: &str) -> (usize, usize) {
    let number_after = |label: &str| -> Option<usize> {
        let rest = &msg[msg.rfind(label)? + label.len()..];
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    };
    match (number_after("Line: "), number_after("Column: ")) {
        (Some(line), Some(column)) => (line, column),
        _ => (0, 0),
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
