use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_codepipeline::types::{
    ActionCategory, ActionOwner, ActionTypeId as SdkActionTypeId, ArtifactStore as SdkArtifactStore,
    ArtifactStoreType, InputArtifact, OutputArtifact, PipelineDeclaration as SdkPipelineDeclaration,
    StageDeclaration as SdkStageDeclaration,
};
use pipewright_types::{AwsError, AwsResult, PipelineDeclaration};

use super::{map_build_err, map_sdk_err};
use crate::client::{CodePipelineApi, PipelineSummary};

pub struct SdkCodePipeline {
    client: aws_sdk_codepipeline::Client,
}

impl SdkCodePipeline {
    pub fn new(config: &SdkConfig) -> Self {
        SdkCodePipeline {
            client: aws_sdk_codepipeline::Client::new(config),
        }
    }
}

fn to_sdk_declaration(declaration: &PipelineDeclaration) -> AwsResult<SdkPipelineDeclaration> {
    let store = SdkArtifactStore::builder()
        .r#type(ArtifactStoreType::S3)
        .location(&declaration.artifact_store.location)
        .build()
        .map_err(|e| map_build_err("artifact store", e))?;

    let mut builder = SdkPipelineDeclaration::builder()
        .name(&declaration.name)
        .role_arn(&declaration.role_arn)
        .artifact_store(store);

    for stage in &declaration.stages {
        let mut stage_builder = SdkStageDeclaration::builder().name(&stage.name);
        for action in &stage.actions {
            let type_id = SdkActionTypeId::builder()
                .category(ActionCategory::from(action.action_type_id.category.as_str()))
                .owner(ActionOwner::from(action.action_type_id.owner.as_str()))
                .provider(&action.action_type_id.provider)
                .version(&action.action_type_id.version)
                .build()
                .map_err(|e| map_build_err("action type", e))?;

            let mut action_builder = aws_sdk_codepipeline::types::ActionDeclaration::builder()
                .name(&action.name)
                .action_type_id(type_id)
                .run_order(action.run_order as i32);
            for input in &action.input_artifacts {
                action_builder = action_builder.input_artifacts(
                    InputArtifact::builder()
                        .name(input)
                        .build()
                        .map_err(|e| map_build_err("input artifact", e))?,
                );
            }
            for output in &action.output_artifacts {
                action_builder = action_builder.output_artifacts(
                    OutputArtifact::builder()
                        .name(output)
                        .build()
                        .map_err(|e| map_build_err("output artifact", e))?,
                );
            }
            for (key, value) in &action.configuration {
                action_builder = action_builder.configuration(key.clone(), value.clone());
            }
            stage_builder = stage_builder.actions(
                action_builder
                    .build()
                    .map_err(|e| map_build_err("action declaration", e))?,
            );
        }
        builder = builder.stages(
            stage_builder
                .build()
                .map_err(|e| map_build_err("stage declaration", e))?,
        );
    }

    builder.build().map_err(|e| map_build_err("pipeline declaration", e))
}

#[async_trait]
impl CodePipelineApi for SdkCodePipeline {
    async fn get_pipeline(&self, name: &str) -> AwsResult<Option<PipelineSummary>> {
        match self.client.get_pipeline().name(name).send().await {
            Ok(out) => {
                let pipeline = out.pipeline.ok_or_else(|| {
                    AwsError::api("MalformedResponse", "GetPipeline returned no pipeline")
                })?;
                Ok(Some(PipelineSummary {
                    name: pipeline.name,
                    role_arn: pipeline.role_arn,
                    stage_names: pipeline.stages.iter().map(|s| s.name.clone()).collect(),
                }))
            }
            Err(err) => {
                let mapped = map_sdk_err("get pipeline", err);
                if mapped.is_not_found() {
                    Ok(None)
                } else {
                    Err(mapped)
                }
            }
        }
    }

    async fn create_pipeline(&self, declaration: &PipelineDeclaration) -> AwsResult<()> {
        self.client
            .create_pipeline()
            .pipeline(to_sdk_declaration(declaration)?)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("create pipeline", e))
    }

    async fn update_pipeline(&self, declaration: &PipelineDeclaration) -> AwsResult<()> {
        self.client
            .update_pipeline()
            .pipeline(to_sdk_declaration(declaration)?)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("update pipeline", e))
    }

    async fn delete_pipeline(&self, name: &str) -> AwsResult<()> {
        self.client
            .delete_pipeline()
            .name(name)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("delete pipeline", e))
    }
}
