//! Thin aws-sdk adapters behind the service traits.
//!
//! Adapters translate between the domain shapes in `pipewright-types` and
//! the generated SDK types, and normalize every error to [`AwsError`] via
//! its service error code.

pub mod cloudformation;
pub mod codebuild;
pub mod codepipeline;
pub mod iam;
pub mod s3;
pub mod ssm;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use pipewright_types::AwsError;

pub async fn load_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// Reduce any SDK error to its service error code and message. Transport
/// failures (no service response) get a synthetic code.
pub(crate) fn map_sdk_err<E, R>(context: &str, err: SdkError<E, R>) -> AwsError
where
    E: ProvideErrorMetadata,
{
    match err.as_service_error() {
        Some(service_err) => AwsError::api(
            service_err.code().unwrap_or("Unknown"),
            service_err
                .message()
                .map_or_else(|| context.to_string(), str::to_string),
        ),
        None => AwsError::api("RequestFailure", format!("{context}: request did not complete")),
    }
}

/// Required-member builder failures, surfaced as a normal API error.
pub(crate) fn map_build_err(
    context: &str,
    err: aws_smithy_types::error::operation::BuildError,
) -> AwsError {
    AwsError::api("InvalidRequest", format!("{context}: {err}"))
}
