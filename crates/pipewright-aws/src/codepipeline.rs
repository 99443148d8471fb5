//! Create-or-update for the pipeline itself.

use pipewright_types::{AwsResult, PipelineAction, PipelineDeclaration};

use crate::client::CodePipelineApi;
use crate::retry::{retry_on_propagation, RetryPolicy};

/// Create the pipeline if it is new, otherwise replace its definition in
/// place. Creation runs through the propagation retrier because the service
/// role is often created in the same run.
pub async fn ensure_pipeline(
    client: &dyn CodePipelineApi,
    retry: &RetryPolicy,
    declaration: &PipelineDeclaration,
) -> AwsResult<PipelineAction> {
    if client.get_pipeline(&declaration.name).await?.is_some() {
        tracing::info!(pipeline = %declaration.name, "Updating pipeline");
        client.update_pipeline(declaration).await?;
        Ok(PipelineAction::Updated)
    } else {
        tracing::info!(pipeline = %declaration.name, "Creating pipeline");
        retry_on_propagation(retry, "create pipeline", || {
            client.create_pipeline(declaration)
        })
        .await?;
        Ok(PipelineAction::Created)
    }
}

/// Delete the pipeline; returns whether it existed.
pub async fn delete_pipeline(client: &dyn CodePipelineApi, name: &str) -> AwsResult<bool> {
    match client.delete_pipeline(name).await {
        Ok(()) => {
            tracing::info!(pipeline = name, "Deleted pipeline");
            Ok(true)
        }
        Err(err) if err.is_not_found() => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use pipewright_types::{ArtifactStore, PipelineAction};

    use super::*;
    use crate::client::CloudClients;

    fn declaration(name: &str) -> PipelineDeclaration {
        PipelineDeclaration {
            name: name.to_string(),
            role_arn: "arn:aws:iam::111122223333:role/PipewrightServiceRole".to_string(),
            artifact_store: ArtifactStore::s3("codepipeline-us-west-2-111122223333"),
            stages: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_then_update() {
        let (clients, cloud) = CloudClients::in_memory();
        let cp = clients.codepipeline.as_ref();

        let first = ensure_pipeline(cp, &clients.retry, &declaration("app-main")).await.unwrap();
        let second = ensure_pipeline(cp, &clients.retry, &declaration("app-main")).await.unwrap();

        assert_eq!(first, PipelineAction::Created);
        assert_eq!(second, PipelineAction::Updated);
        assert_eq!(cloud.calls("create_pipeline"), 1);
        assert_eq!(cloud.calls("update_pipeline"), 1);
    }

    #[tokio::test]
    async fn test_create_retries_on_invalid_structure() {
        let (clients, cloud) = CloudClients::in_memory();
        cloud.inject_failures("create_pipeline", "InvalidStructureException", 1);

        let action = ensure_pipeline(clients.codepipeline.as_ref(), &clients.retry, &declaration("app-main"))
            .await
            .unwrap();
        assert_eq!(action, PipelineAction::Created);
        assert_eq!(cloud.calls("create_pipeline"), 2);
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let (clients, _cloud) = CloudClients::in_memory();
        let cp = clients.codepipeline.as_ref();

        ensure_pipeline(cp, &clients.retry, &declaration("app-main")).await.unwrap();
        assert!(delete_pipeline(cp, "app-main").await.unwrap());
        assert!(!delete_pipeline(cp, "app-main").await.unwrap());
    }
}
