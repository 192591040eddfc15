//! Error types for trib-lineage

use thiserror::Error;
use trib_sql::SqlError;

/// Lineage resolution errors
#[derive(Error, Debug)]
pub enum LineageError {
    /// L001: Invalid arguments to a lineage operation
    #[error("[L001] Invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// L002: Asset not found in the pipeline
    #[error("[L002] Asset not found: {name}")]
    AssetNotFound { name: String },

    /// L003: Upstream cycle found while resolving lineage
    #[error("[L003] Cycle detected while resolving lineage: {cycle}")]
    CycleDetected { cycle: String },

    /// L004: Dialect lookup or SQL analysis failed for an asset
    #[error("[L004] Failed to parse column lineage of '{asset}': {source}")]
    Parse {
        asset: String,
        #[source]
        source: SqlError,
    },
}

/// Result type alias for LineageError
pub type LineageResult<T> = Result<T, LineageError>;
