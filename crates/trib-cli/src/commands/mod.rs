//! Command implementations

pub(crate) mod common;
pub mod lineage;
pub mod run;
pub(crate) mod template;
