//! trib-lineage - Column lineage resolution for Tributary
//!
//! Propagates column-level provenance through the asset graph: each asset's
//! columns are inferred from its SQL against the columns of its upstream
//! assets, resolving upstreams first.

pub mod error;
pub mod extractor;
pub mod parser;
pub mod upstreams;

pub use error::{LineageError, LineageResult};
pub use extractor::{add_column_to_asset, LineageExtractor};
pub use parser::{LineageParser, SqlLineageParser};
pub use upstreams::infer_upstreams;
