use pipewright_types::AwsError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Engine-level failure: either a bad definition caught at dispatch time, or
/// a cloud call that failed underneath a handler.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("no phase handler registered for type '{0}'")]
    UnknownPhaseType(String),

    #[error("pipeline '{0}' is not defined in the pipeline file")]
    UnknownPipeline(String),

    #[error("pipeline '{pipeline}' failed validation: {}", .errors.join("; "))]
    InvalidPipeline { pipeline: String, errors: Vec<String> },

    #[error("phase '{phase}' is missing required secret '{key}'")]
    MissingSecret { phase: String, key: String },

    #[error("phase '{phase}' has invalid configuration: {message}")]
    InvalidPhaseConfig { phase: String, message: String },

    #[error(transparent)]
    Cloud(#[from] AwsError),

    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}
