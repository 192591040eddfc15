//! trib-db - Storage access for Tributary
//!
//! A keyed retry lock that serializes work against single-writer database
//! files, the [`Warehouse`] seam executors write through, and its DuckDB
//! implementation.

pub mod duckdb;
pub mod error;
pub mod lock;
pub mod warehouse;

pub use duckdb::DuckDbWarehouse;
pub use error::{DbError, DbResult};
pub use lock::{lock_database, DatabaseGuard, KeyedRetryMutex, RetryPolicy};
pub use warehouse::{RelationKind, Warehouse};
