//! Idempotent CodeBuild project management.

use pipewright_types::{AwsResult, ProjectInput, ProjectSettings};

use crate::client::CodeBuildApi;
use crate::retry::{retry_on_propagation, RetryPolicy};

/// Marker that a build image lives in the account's own ECR registry.
const ACCOUNT_IMAGE_PREFIX: &str = "<account>";

/// Rewrite an `<account>`-relative image to the account's ECR URI. ECR
/// images need Docker-in-Docker, so they also flip the project privileged.
fn resolve_image(settings: &ProjectSettings) -> (String, bool) {
    match settings.image.strip_prefix(ACCOUNT_IMAGE_PREFIX) {
        Some(rest) => (format!("{}{rest}", settings.account.ecr_registry()), true),
        None => (settings.image.clone(), false),
    }
}

/// Standard variables every build gets, so buildspecs can address their own
/// pipeline. User variables are appended after and win on collision.
fn resolve_env_vars(settings: &ProjectSettings) -> Vec<(String, String)> {
    let mut vars: Vec<(String, String)> = vec![
        ("ACCOUNT_ID".to_string(), settings.account.account_id.clone()),
        ("REGION".to_string(), settings.account.region.clone()),
        ("APP_NAME".to_string(), settings.app_name.clone()),
        ("PIPELINE_NAME".to_string(), settings.pipeline_name.clone()),
        ("PHASE_NAME".to_string(), settings.phase_name.clone()),
    ];
    for (key, value) in &settings.environment_variables {
        if let Some(existing) = vars.iter_mut().find(|(k, _)| k == key) {
            existing.1 = value.clone();
        } else {
            vars.push((key.clone(), value.clone()));
        }
    }
    vars
}

/// Resolve the declarative settings into the exact project definition sent
/// to CodeBuild.
pub fn resolve(settings: &ProjectSettings) -> ProjectInput {
    let (image, privileged) = resolve_image(settings);
    ProjectInput {
        name: settings.project_name.clone(),
        description: format!(
            "Build project for the {}-{} pipeline",
            settings.app_name, settings.pipeline_name
        ),
        image,
        privileged,
        environment_variables: resolve_env_vars(settings),
        service_role_arn: settings.service_role_arn.clone(),
        build_spec: settings.build_spec.clone(),
        cache_location: settings.cache_location.clone(),
        tags: vec![
            ("app".to_string(), settings.app_name.clone()),
            ("pipeline".to_string(), settings.pipeline_name.clone()),
        ],
    }
}

/// Create the project, or replace its definition if it already exists.
/// Creation runs through the propagation retrier: the service role was
/// usually created moments ago.
pub async fn ensure_project(
    client: &dyn CodeBuildApi,
    retry: &RetryPolicy,
    settings: &ProjectSettings,
) -> AwsResult<()> {
    let project = resolve(settings);
    if client.get_project(&project.name).await?.is_some() {
        tracing::info!(project = %project.name, "Updating CodeBuild project");
        client.update_project(&project).await
    } else {
        tracing::info!(project = %project.name, "Creating CodeBuild project");
        retry_on_propagation(retry, "create codebuild project", || {
            client.create_project(&project)
        })
        .await
    }
}

/// Delete the project; already gone counts as deleted.
pub async fn delete_project(client: &dyn CodeBuildApi, name: &str) -> AwsResult<()> {
    match client.delete_project(name).await {
        Err(err) if err.is_not_found() => Ok(()),
        other => {
            if other.is_ok() {
                tracing::info!(project = name, "Deleted CodeBuild project");
            }
            other
        }
    }
}
