//! Failures raised while talking to the warehouse

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("[D001] Cannot open database {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("[D002] Statement failed: {0}")]
    Statement(String),

    /// A catalog lookup for a table or view came back empty
    #[error("[D003] Relation does not exist: {0}")]
    MissingRelation(String),

    #[error("[D004] Query produced no value: {0}")]
    NoValue(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        let text = err.to_string();
        if is_missing_relation(&text) {
            DbError::MissingRelation(text)
        } else {
            DbError::Statement(text)
        }
    }
}

/// DuckDB reports unknown relations only through the message text
fn is_missing_relation(text: &str) -> bool {
    text.starts_with("Catalog Error")
        && (text.contains("does not exist") || text.contains("not found"))
        && (text.contains("Table") || text.contains("View"))
}
