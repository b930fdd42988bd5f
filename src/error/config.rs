use super::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to parse JSON config '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported config extension '{ext}'. Use .toml or .json.")]
    UnsupportedExtension { ext: String },
    #[error("Config file must have .toml or .json extension.")]
    MissingExtension,
    #[error("Config '{field}' must be >= 1.")]
    FieldMustBePositive { field: String },
    #[error("Invalid duration for '{field}': {source}")]
    InvalidDuration {
        field: String,
        #[source]
        source: ValidationError,
    },
    #[error("Stage {index} must have a duration > 0.")]
    StageDurationZero { index: usize },
    #[error("Stage {index} must have a spawn_rate >= 1.")]
    StageSpawnRateZero { index: usize },
    #[error("Config 'stages' must contain at least one stage.")]
    StagesEmpty,
    #[error("Config '{section}' wait_min must be <= wait_max.")]
    WaitRangeInverted { section: &'static str },
    #[error("Config 'data.{field}' must not be empty.")]
    DataListEmpty { field: &'static str },
    #[error("Config 'tasks.{task}' weight must be >= 1.")]
    TaskWeightZero { task: String },
    #[error("Config 'tasks.{task}' is not a staking task and cannot be weighted.")]
    TaskNotWeighted { task: String },
}
