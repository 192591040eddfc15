//! trib-core - Core library for Tributary
//!
//! This crate provides the asset and column data model, the pipeline graph,
//! pipeline loading, run configuration and the durable run state shared by
//! the lineage resolver, the scheduler and the CLI.

pub mod asset;
pub mod asset_name;
pub mod dag;
pub mod error;
pub mod loading;
pub mod pipeline;
pub mod pipeline_state;
pub mod run_config;

pub use asset::{
    Asset, Column, ColumnCheck, CustomCheck, EntityAttribute, Materialization, UpstreamColumn,
    UpstreamColumns,
};
pub use asset_name::AssetName;
pub use dag::AssetDag;
pub use error::{CoreError, CoreResult};
pub use pipeline::{Pipeline, PipelineConfig, DEFAULT_ASSET_TYPE};
pub use pipeline_state::{
    AssetStatus, Metadata, PipelineAssetState, PipelineState, SkipReason, StateStore, STATE_VERSION,
};
pub use run_config::{
    parse_end_date, parse_start_date, PackageManager, RunConfig, TaskKind, DATE_FORMAT,
    DEFAULT_WORKERS,
};
