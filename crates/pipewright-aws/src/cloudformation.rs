//! CloudFormation stack provisioning for the singleton Lambda functions.

use std::time::Duration;

use pipewright_types::{AwsError, AwsResult};

use crate::client::{CloudFormationApi, Stack};

fn is_terminal(status: &str) -> bool {
    status.ends_with("_COMPLETE") || status.ends_with("_FAILED")
}

/// Poll until the stack reaches a terminal status.
///
/// # Errors
///
/// A terminal status other than `CREATE_COMPLETE`/`UPDATE_COMPLETE` is
/// surfaced as an error; a stack that disappears mid-wait too.
pub async fn wait_for_stack(
    client: &dyn CloudFormationApi,
    name: &str,
    poll_interval: Duration,
) -> AwsResult<Stack> {
    loop {
        let Some(stack) = client.get_stack(name).await? else {
            return Err(AwsError::api(
                "ValidationError",
                format!("stack '{name}' disappeared while waiting for it"),
            ));
        };
        if is_terminal(&stack.status) {
            if stack.status == "CREATE_COMPLETE" || stack.status == "UPDATE_COMPLETE" {
                return Ok(stack);
            }
            return Err(AwsError::api(
                "StackOperationFailed",
                format!("stack '{name}' ended in status {}", stack.status),
            ));
        }
        tracing::debug!(stack = name, status = %stack.status, "Waiting for stack");
        tokio::time::sleep(poll_interval).await;
    }
}

/// Create the stack and wait for it to finish.
pub async fn create_stack_and_wait(
    client: &dyn CloudFormationApi,
    name: &str,
    template_body: &str,
    parameters: &[(String, String)],
    poll_interval: Duration,
) -> AwsResult<Stack> {
    tracing::info!(stack = name, "Creating CloudFormation stack");
    client.create_stack(name, template_body, parameters).await?;
    wait_for_stack(client, name, poll_interval).await
}

/// Delete the stack if present and wait for the deletion to settle.
pub async fn delete_stack_and_wait(
    client: &dyn CloudFormationApi,
    name: &str,
    poll_interval: Duration,
) -> AwsResult<()> {
    if client.get_stack(name).await?.is_none() {
        return Ok(());
    }
    tracing::info!(stack = name, "Deleting CloudFormation stack");
    client.delete_stack(name).await?;
    loop {
        match client.get_stack(name).await? {
            None => return Ok(()),
            Some(stack) if stack.status == "DELETE_FAILED" => {
                return Err(AwsError::api(
                    "StackOperationFailed",
                    format!("stack '{name}' failed to delete"),
                ));
            }
            Some(_) => tokio::time::sleep(poll_interval).await,
        }
    }
}
