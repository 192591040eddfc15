//! Failures raised while loading pipelines and run state

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("[E001] No pipeline.yml or pipeline.yaml under {path}")]
    PipelineNotFound { path: String },

    #[error("[E002] Invalid definition in {path}: {message}")]
    DefinitionParse { path: String, message: String },

    #[error("[E003] Invalid run configuration: {message}")]
    ConfigInvalid { message: String },

    /// `cycle` lists the assets on the loop, first and last repeated
    #[error("[E004] Assets depend on each other in a cycle: {cycle}")]
    CircularDependency { cycle: String },

    #[error("[E005] Asset '{name}' is defined more than once")]
    DuplicateAsset { name: String },

    #[error("[E006] Empty name in {context}")]
    EmptyName { context: String },

    #[error("[E007] Cannot read date '{value}', expected {expected}")]
    InvalidDate { value: String, expected: String },

    #[error("[E008] {0}")]
    Io(#[from] std::io::Error),

    #[error("[E009] Cannot read {path}: {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    #[error("[E010] {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("[E011] {0}")]
    Json(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
