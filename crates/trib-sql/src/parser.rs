//! Statement parsing for asset SQL

use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use sqlparser::ast::Statement;

/// Parses asset SQL in one dialect
#[derive(Debug, Clone, Copy)]
pub struct SqlParser {
    dialect: Dialect,
}

impl SqlParser {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// All statements in `sql`; blank input is [`SqlError::EmptySql`]
    pub fn statements(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        match sql.trim() {
            "" => Err(SqlError::EmptySql),
            body => self.dialect.parse(body),
        }
    }

    /// Only the leading statement matters for an asset's output
    pub fn first_statement(&self, sql: &str) -> SqlResult<Statement> {
        self.statements(sql)?
            .into_iter()
            .next()
            .ok_or(SqlError::EmptySql)
    }
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;
