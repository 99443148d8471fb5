//! SecureString parameter helpers for phase tokens.

use pipewright_types::AwsResult;

use crate::client::SsmApi;

/// Store a phase secret as a SecureString parameter, overwriting any
/// previous value. The value itself is never logged.
pub async fn put_phase_secret(
    client: &dyn SsmApi,
    name: &str,
    value: &str,
    description: &str,
) -> AwsResult<()> {
    tracing::info!(parameter = name, "Storing phase secret in Parameter Store");
    client.put_secure_parameter(name, value, description).await
}

/// Remove phase secrets; names that no longer exist are ignored.
pub async fn delete_phase_secrets(client: &dyn SsmApi, names: &[String]) -> AwsResult<()> {
    if names.is_empty() {
        return Ok(());
    }
    tracing::info!(count = names.len(), "Deleting phase secrets from Parameter Store");
    client.delete_parameters(names).await
}
