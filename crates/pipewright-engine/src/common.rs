//! Shared role provisioning used by multiple phase handlers.
//!
//! Per-account singletons (service role, deploy role, lambda role) are
//! ensured under a named lock so concurrent pipeline deploys cannot race
//! the check-then-create.

use pipewright_aws::{cloudformation, iam, CloudClients};
use pipewright_types::{AccountConfig, AwsResult, Role};
use serde_json::json;

use crate::error::{ProvisionError, Result};
use crate::naming;

fn policy(statements: Vec<serde_json::Value>) -> serde_json::Value {
    json!({
        "Version": "2012-10-17",
        "Statement": statements
    })
}

/// Policy for the per-app build phase role: logs, artifact bucket access,
/// and read access to this app's Parameter Store secrets. Extra statements
/// come from the build phase's `extra_resources`.
pub fn build_phase_policy(
    account: &AccountConfig,
    app_name: &str,
    extra_statements: &[serde_json::Value],
) -> serde_json::Value {
    let bucket = account.artifact_bucket();
    let mut statements = vec![
        json!({
            "Effect": "Allow",
            "Action": [
                "logs:CreateLogGroup",
                "logs:CreateLogStream",
                "logs:PutLogEvents"
            ],
            "Resource": "arn:aws:logs:*:*:*"
        }),
        json!({
            "Effect": "Allow",
            "Action": ["s3:GetObject", "s3:GetObjectVersion", "s3:PutObject"],
            "Resource": format!("arn:aws:s3:::{bucket}/*")
        }),
        json!({
            "Effect": "Allow",
            "Action": ["ssm:GetParameter", "ssm:GetParameters"],
            "Resource": naming::ssm_parameter_arn_prefix(account, app_name)
        }),
    ];
    statements.extend_from_slice(extra_statements);
    policy(statements)
}

/// Ensure the per-app build phase role.
pub async fn ensure_build_phase_role(
    clients: &CloudClients,
    account: &AccountConfig,
    app_name: &str,
    extra_statements: &[serde_json::Value],
) -> AwsResult<Role> {
    iam::ensure_role_with_policy(
        clients.iam.as_ref(),
        &account.account_id,
        &naming::build_phase_role(app_name),
        &["codebuild.amazonaws.com"],
        &build_phase_policy(account, app_name, extra_statements),
    )
    .await
}

/// Ensure a per-app phase role whose build only needs logs plus this app's
/// Parameter Store secrets (npm and pypi publish phases).
pub async fn ensure_publish_phase_role(
    clients: &CloudClients,
    account: &AccountConfig,
    app_name: &str,
    role_name: &str,
) -> AwsResult<Role> {
    iam::ensure_role_with_policy(
        clients.iam.as_ref(),
        &account.account_id,
        role_name,
        &["codebuild.amazonaws.com"],
        &build_phase_policy(account, app_name, &[]),
    )
    .await
}

/// Ensure the singleton deploy phase role. Deployment phases hand the whole
/// account to the deployment engine, so the policy is unrestricted.
pub async fn ensure_deploy_phase_role(
    clients: &CloudClients,
    account: &AccountConfig,
) -> AwsResult<Role> {
    let _guard = clients
        .locks
        .acquire(&naming::singleton_lock_key(naming::DEPLOY_PHASE_ROLE, account))
        .await;
    iam::ensure_role_with_policy(
        clients.iam.as_ref(),
        &account.account_id,
        naming::DEPLOY_PHASE_ROLE,
        &["codebuild.amazonaws.com"],
        &policy(vec![json!({
            "Effect": "Allow",
            "Action": "*",
            "Resource": "*"
        })]),
    )
    .await
}

/// Ensure the singleton delete phase role. Teardown phases remove whatever
/// the deployment engine created, so the policy is unrestricted like the
/// deploy role's.
pub async fn ensure_delete_phase_role(
    clients: &CloudClients,
    account: &AccountConfig,
) -> AwsResult<Role> {
    let _guard = clients
        .locks
        .acquire(&naming::singleton_lock_key(naming::DELETE_PHASE_ROLE, account))
        .await;
    iam::ensure_role_with_policy(
        clients.iam.as_ref(),
        &account.account_id,
        naming::DELETE_PHASE_ROLE,
        &["codebuild.amazonaws.com"],
        &policy(vec![json!({
            "Effect": "Allow",
            "Action": "*",
            "Resource": "*"
        })]),
    )
    .await
}

/// Ensure the singleton role for pipeline-invoked Lambda functions: logs
/// plus the job result callbacks.
pub async fn ensure_lambda_role(
    clients: &CloudClients,
    account: &AccountConfig,
) -> AwsResult<Role> {
    let _guard = clients
        .locks
        .acquire(&naming::singleton_lock_key(naming::LAMBDA_ROLE, account))
        .await;
    iam::ensure_role_with_policy(
        clients.iam.as_ref(),
        &account.account_id,
        naming::LAMBDA_ROLE,
        &["lambda.amazonaws.com"],
        &policy(vec![
            json!({
                "Effect": "Allow",
                "Action": [
                    "logs:CreateLogGroup",
                    "logs:CreateLogStream",
                    "logs:PutLogEvents"
                ],
                "Resource": "arn:aws:logs:*:*:*"
            }),
            json!({
                "Effect": "Allow",
                "Action": [
                    "codepipeline:PutJobSuccessResult",
                    "codepipeline:PutJobFailureResult"
                ],
                "Resource": "*"
            }),
        ]),
    )
    .await
}

/// Ensure the singleton CodePipeline service role.
pub async fn ensure_service_role(
    clients: &CloudClients,
    account: &AccountConfig,
) -> AwsResult<Role> {
    let _guard = clients
        .locks
        .acquire(&naming::singleton_lock_key(naming::SERVICE_ROLE, account))
        .await;
    iam::ensure_role_with_policy(
        clients.iam.as_ref(),
        &account.account_id,
        naming::SERVICE_ROLE,
        &["codepipeline.amazonaws.com"],
        &policy(vec![
            json!({
                "Effect": "Allow",
                "Action": [
                    "s3:GetObject",
                    "s3:GetObjectVersion",
                    "s3:GetBucketVersioning",
                    "s3:PutObject"
                ],
                "Resource": "*"
            }),
            json!({
                "Effect": "Allow",
                "Action": [
                    "codebuild:StartBuild",
                    "codebuild:StopBuild",
                    "codebuild:BatchGetBuilds",
                    "codebuild:BatchGetProjects"
                ],
                "Resource": "*"
            }),
            json!({
                "Effect": "Allow",
                "Action": [
                    "codecommit:GetBranch",
                    "codecommit:GetCommit",
                    "codecommit:UploadArchive",
                    "codecommit:GetUploadArchiveStatus",
                    "codecommit:CancelUploadArchive"
                ],
                "Resource": "*"
            }),
            json!({
                "Effect": "Allow",
                "Action": ["lambda:InvokeFunction", "lambda:ListFunctions"],
                "Resource": "*"
            }),
            json!({
                "Effect": "Allow",
                "Action": [
                    "cloudformation:CreateStack",
                    "cloudformation:DeleteStack",
                    "cloudformation:DescribeStacks",
                    "cloudformation:UpdateStack",
                    "cloudformation:CreateChangeSet",
                    "cloudformation:DeleteChangeSet",
                    "cloudformation:DescribeChangeSet",
                    "cloudformation:ExecuteChangeSet",
                    "cloudformation:SetStackPolicy",
                    "cloudformation:ValidateTemplate"
                ],
                "Resource": "*"
            }),
            json!({
                "Effect": "Allow",
                "Action": ["iam:PassRole", "sns:Publish"],
                "Resource": "*"
            }),
        ]),
    )
    .await
}

/// Ensure the singleton Lambda stack backing an Invoke phase and return the
/// deployed function's name. The stack is shared by every pipeline in the
/// account, so the check-then-create runs under its lock.
pub async fn ensure_invoke_lambda(
    clients: &CloudClients,
    account: &AccountConfig,
    stack_name: &str,
    template_body: &str,
) -> Result<String> {
    let _guard = clients
        .locks
        .acquire(&naming::singleton_lock_key(stack_name, account))
        .await;
    let stack = match clients.cloudformation.get_stack(stack_name).await? {
        Some(stack) => stack,
        None => {
            let role = ensure_lambda_role(clients, account).await?;
            cloudformation::create_stack_and_wait(
                clients.cloudformation.as_ref(),
                stack_name,
                template_body,
                &[
                    ("FunctionName".to_string(), stack_name.to_string()),
                    ("RoleArn".to_string(), role.arn),
                ],
                clients.stack_poll_interval,
            )
            .await?
        }
    };
    stack
        .output("FunctionName")
        .map(str::to_string)
        .ok_or_else(|| {
            ProvisionError::from(anyhow::anyhow!(
                "stack '{stack_name}' has no FunctionName output"
            ))
        })
}
