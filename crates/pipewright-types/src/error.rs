//! Normalized error type for cloud service calls.

use thiserror::Error;

pub type AwsResult<T> = Result<T, AwsError>;

/// A failed cloud API call, reduced to the service error code plus message.
///
/// Lookups for absent resources are normalized to `Ok(None)` at the client
/// boundary, so `Api` here always means a real failure. `RetriesExhausted`
/// marks an operation that kept hitting IAM propagation delays until the
/// retry budget ran out.
#[derive(Debug, Clone, Error)]
pub enum AwsError {
    #[error("{code}: {message}")]
    Api { code: String, message: String },
    #[error("gave up after {attempts} attempts, last error: {last}")]
    RetriesExhausted { attempts: u32, last: Box<AwsError> },
}

/// Error codes the services use to say "that resource does not exist".
const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchEntity",
    "ValidationError",
    "PipelineNotFoundException",
    "ParameterNotFound",
    "ResourceNotFoundException",
];

/// Error codes that mean a just-created IAM role has not propagated to the
/// consuming service yet. These are the only codes worth retrying.
const PROPAGATION_CODES: &[&str] = &["InvalidInputException", "InvalidStructureException"];

impl AwsError {
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        AwsError::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            AwsError::Api { code, .. } => code,
            AwsError::RetriesExhausted { last, .. } => last.code(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        NOT_FOUND_CODES.contains(&self.code())
    }

    pub fn is_propagation_delay(&self) -> bool {
        matches!(self, AwsError::Api { .. }) && PROPAGATION_CODES.contains(&self.code())
    }
}
