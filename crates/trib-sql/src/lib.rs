//! trib-sql - SQL layer for Tributary
//!
//! This crate provides SQL parsing using sqlparser-rs with dialect selection by
//! asset type, table reference extraction, and a schema-aware column lineage
//! analyzer.

pub mod dialect;
pub mod error;
pub mod extractor;
pub mod lineage;
pub mod parser;
pub mod schema;

pub use dialect::{dialect_for_asset_type, Dialect};
pub use error::{SqlError, SqlResult};
pub use extractor::referenced_tables;
pub use lineage::{column_lineage, Lineage, LineageColumn, UpstreamRef};
pub use parser::SqlParser;
pub use schema::{Schema, SchemaColumn};

use sqlparser::ast::ObjectName;

/// Join the parts of an object name with dots (`db.schema.table`)
pub fn object_name_to_string(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|part| match part.as_ident() {
            Some(ident) => ident.value.clone(),
            None => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}
