//! Idempotent role and policy management.
//!
//! Every ensure is safe to run on every deploy: existing roles are reused,
//! an unchanged policy document is left alone, and a changed one becomes a
//! new default version with all older versions pruned (IAM caps managed
//! policies at five versions).

use pipewright_types::{AwsError, AwsResult, Policy, Role};

use crate::client::IamApi;

/// Path under which pipewright-managed policies live.
pub const POLICY_PATH: &str = "/pipewright/";

pub fn policy_arn(account_id: &str, policy_name: &str) -> String {
    format!("arn:aws:iam::{account_id}:policy/pipewright/{policy_name}")
}

fn trust_policy(trusted_services: &[&str]) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": trusted_services },
            "Action": "sts:AssumeRole"
        }]
    })
    .to_string()
}

/// Create the role if it does not exist, trusting the given services.
pub async fn ensure_role(
    iam: &dyn IamApi,
    role_name: &str,
    trusted_services: &[&str],
) -> AwsResult<Role> {
    if let Some(role) = iam.get_role(role_name).await? {
        return Ok(role);
    }
    tracing::info!(role = role_name, "Creating IAM role");
    match iam.create_role(role_name, &trust_policy(trusted_services)).await {
        // Lost the create race to a concurrent deploy of the same app.
        Err(err) if err.code() == "EntityAlreadyExists" => require_role(iam, role_name).await,
        other => other,
    }
}

/// Compare two policy documents as parsed JSON so formatting and key order
/// differences do not count as changes.
fn documents_equal(left: &str, right: &str) -> bool {
    let left: Result<serde_json::Value, _> = serde_json::from_str(left);
    let right: Result<serde_json::Value, _> = serde_json::from_str(right);
    match (left, right) {
        (Ok(l), Ok(r)) => l == r,
        _ => false,
    }
}

async fn prune_non_default_versions(iam: &dyn IamApi, arn: &str) -> AwsResult<()> {
    for version in iam.list_policy_versions(arn).await? {
        if !version.is_default {
            iam.delete_policy_version(arn, &version.version_id).await?;
        }
    }
    Ok(())
}

/// Create the policy if absent; otherwise bring its default version up to
/// date with `document`, skipping the update entirely when the stored
/// default is already equal.
pub async fn ensure_policy(
    iam: &dyn IamApi,
    account_id: &str,
    policy_name: &str,
    document: &serde_json::Value,
) -> AwsResult<Policy> {
    let arn = policy_arn(account_id, policy_name);
    let document = document.to_string();

    let Some(existing) = iam.get_policy(&arn).await? else {
        tracing::info!(policy = policy_name, "Creating IAM policy");
        return match iam.create_policy(policy_name, POLICY_PATH, &document).await {
            Err(err) if err.code() == "EntityAlreadyExists" => {
                // A concurrent deploy created it with the same document.
                iam.get_policy(&arn).await?.ok_or(err)
            }
            other => other,
        };
    };

    if let Some(default_version) = &existing.default_version_id {
        let current = iam.get_policy_version_document(&arn, default_version).await?;
        if documents_equal(&current, &document) {
            tracing::debug!(policy = policy_name, "Policy document unchanged");
            return Ok(existing);
        }
    }

    tracing::info!(policy = policy_name, "Updating IAM policy to a new default version");
    iam.create_policy_version(&arn, &document).await?;
    prune_non_default_versions(iam, &arn).await?;
    Ok(existing)
}

/// Ensure role + policy + attachment in one shot. This is the entry point
/// phase deployers use for their service roles.
pub async fn ensure_role_with_policy(
    iam: &dyn IamApi,
    account_id: &str,
    role_name: &str,
    trusted_services: &[&str],
    policy_document: &serde_json::Value,
) -> AwsResult<Role> {
    let role = ensure_role(iam, role_name, trusted_services).await?;
    let policy = ensure_policy(iam, account_id, role_name, policy_document).await?;
    iam.attach_role_policy(role_name, &policy.arn).await?;
    Ok(role)
}

fn absent_ok(result: AwsResult<()>) -> AwsResult<()> {
    match result {
        Err(err) if err.is_not_found() => Ok(()),
        other => other,
    }
}

/// Tear down a role and its managed policy. Resources that are already gone
/// count as deleted.
pub async fn delete_role_and_policy(
    iam: &dyn IamApi,
    account_id: &str,
    role_name: &str,
) -> AwsResult<()> {
    let arn = policy_arn(account_id, role_name);
    absent_ok(iam.detach_role_policy(role_name, &arn).await)?;
    match iam.list_policy_versions(&arn).await {
        Ok(versions) => {
            for version in versions {
                if !version.is_default {
                    iam.delete_policy_version(&arn, &version.version_id).await?;
                }
            }
        }
        Err(err) if err.is_not_found() => {}
        Err(err) => return Err(err),
    }
    absent_ok(iam.delete_policy(&arn).await)?;
    absent_ok(iam.delete_role(role_name).await)?;
    tracing::info!(role = role_name, "Deleted IAM role and policy");
    Ok(())
}

/// Look up a role that must already exist (user-supplied custom roles).
pub async fn require_role(iam: &dyn IamApi, role_name: &str) -> AwsResult<Role> {
    iam.get_role(role_name).await?.ok_or_else(|| {
        AwsError::api(
            "NoSuchEntity",
            format!("role '{role_name}' does not exist in the target account"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CloudClients;

    fn doc(actions: &str) -> serde_json::Value {
        serde_json::json!({
            "Version": "2012-10-17",
            "Statement": [{ "Effect": "Allow", "Action": actions, "Resource": "*" }]
        })
    }

    #[tokio::test]
    async fn test_ensure_role_with_policy_is_idempotent() {
        let (clients, cloud) = CloudClients::in_memory();
        let iam = clients.iam.as_ref();

        let first = ensure_role_with_policy(iam, "111122223333", "app-Build", &["codebuild.amazonaws.com"], &doc("s3:*"))
            .await
            .unwrap();
        let second = ensure_role_with_policy(iam, "111122223333", "app-Build", &["codebuild.amazonaws.com"], &doc("s3:*"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(cloud.calls("create_role"), 1);
        assert_eq!(cloud.calls("create_policy"), 1);
        // Unchanged document: no version churn at all.
        assert_eq!(cloud.calls("create_policy_version"), 0);
        assert_eq!(cloud.policy_version_count(&policy_arn("111122223333", "app-Build")), 1);
    }

    #[tokio::test]
    async fn test_changed_document_creates_version_and_prunes() {
        let (clients, cloud) = CloudClients::in_memory();
        let iam = clients.iam.as_ref();
        let arn = policy_arn("111122223333", "app-Build");

        ensure_role_with_policy(iam, "111122223333", "app-Build", &["codebuild.amazonaws.com"], &doc("s3:*"))
            .await
            .unwrap();
        ensure_role_with_policy(iam, "111122223333", "app-Build", &["codebuild.amazonaws.com"], &doc("s3:GetObject"))
            .await
            .unwrap();

        assert_eq!(cloud.calls("create_policy_version"), 1);
        assert_eq!(cloud.policy_version_count(&arn), 1);
        let default_doc = cloud.default_policy_document(&arn).unwrap();
        assert!(default_doc.contains("s3:GetObject"));
    }

    #[tokio::test]
    async fn test_document_comparison_ignores_formatting() {
        assert!(documents_equal(
            r#"{"Version":"2012-10-17","Statement":[]}"#,
            "{ \"Statement\": [], \"Version\": \"2012-10-17\" }"
        ));
        assert!(!documents_equal(
            r#"{"Version":"2012-10-17"}"#,
            r#"{"Version":"2008-10-17"}"#
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (clients, cloud) = CloudClients::in_memory();
        let iam = clients.iam.as_ref();

        ensure_role_with_policy(iam, "111122223333", "app-Npm", &["codebuild.amazonaws.com"], &doc("ssm:GetParameters"))
            .await
            .unwrap();
        delete_role_and_policy(iam, "111122223333", "app-Npm").await.unwrap();
        // Second delete finds nothing and still succeeds.
        delete_role_and_policy(iam, "111122223333", "app-Npm").await.unwrap();
        assert!(cloud.role("app-Npm").is_none());
    }

    #[tokio::test]
    async fn test_require_role_fails_on_missing() {
        let (clients, _cloud) = CloudClients::in_memory();
        let err = require_role(clients.iam.as_ref(), "not-there").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
