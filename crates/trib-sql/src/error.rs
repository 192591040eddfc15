//! Failures raised while reading asset SQL

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqlError {
    /// Position is 1-based and zero when the parser could not locate it
    #[error("[S001] Cannot parse SQL at {line}:{column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("[S002] No SQL statement to parse")]
    EmptySql,

    #[error("[S003] Asset type '{asset_type}' has no SQL dialect")]
    UnknownDialect { asset_type: String },
}

pub type SqlResult<T> = Result<T, SqlError>;
