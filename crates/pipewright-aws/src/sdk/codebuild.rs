use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_codebuild::types::{
    ArtifactsType, CacheType, ComputeType, EnvironmentType, EnvironmentVariable, ProjectArtifacts,
    ProjectCache, ProjectEnvironment, ProjectSource, SourceType, Tag,
};
use pipewright_types::{AwsResult, ProjectInput};

use super::{map_build_err, map_sdk_err};
use crate::client::{BuildProject, CodeBuildApi};

pub struct SdkCodeBuild {
    client: aws_sdk_codebuild::Client,
}

impl SdkCodeBuild {
    pub fn new(config: &SdkConfig) -> Self {
        SdkCodeBuild {
            client: aws_sdk_codebuild::Client::new(config),
        }
    }
}

fn environment(project: &ProjectInput) -> AwsResult<ProjectEnvironment> {
    let mut builder = ProjectEnvironment::builder()
        .r#type(EnvironmentType::LinuxContainer)
        .compute_type(ComputeType::BuildGeneral1Small)
        .image(&project.image)
        .privileged_mode(project.privileged);
    for (name, value) in &project.environment_variables {
        builder = builder.environment_variables(
            EnvironmentVariable::builder()
                .name(name)
                .value(value)
                .build()
                .map_err(|e| map_build_err("project environment variable", e))?,
        );
    }
    builder.build().map_err(|e| map_build_err("project environment", e))
}

fn source(project: &ProjectInput) -> AwsResult<ProjectSource> {
    let mut builder = ProjectSource::builder().r#type(SourceType::Codepipeline);
    if let Some(spec) = &project.build_spec {
        builder = builder.buildspec(spec);
    }
    builder.build().map_err(|e| map_build_err("project source", e))
}

fn artifacts() -> AwsResult<ProjectArtifacts> {
    ProjectArtifacts::builder()
        .r#type(ArtifactsType::Codepipeline)
        .build()
        .map_err(|e| map_build_err("project artifacts", e))
}

fn cache(project: &ProjectInput) -> AwsResult<Option<ProjectCache>> {
    match &project.cache_location {
        Some(location) => ProjectCache::builder()
            .r#type(CacheType::S3)
            .location(location)
            .build()
            .map(Some)
            .map_err(|e| map_build_err("project cache", e)),
        None => Ok(None),
    }
}

fn tags(project: &ProjectInput) -> Vec<Tag> {
    project
        .tags
        .iter()
        .map(|(k, v)| Tag::builder().key(k).value(v).build())
        .collect()
}

#[async_trait]
impl CodeBuildApi for SdkCodeBuild {
    async fn get_project(&self, name: &str) -> AwsResult<Option<BuildProject>> {
        let out = self
            .client
            .batch_get_projects()
            .names(name)
            .send()
            .await
            .map_err(|e| map_sdk_err("get project", e))?;
        Ok(out.projects().first().map(|p| BuildProject {
            name: p.name().unwrap_or(name).to_string(),
            service_role_arn: p.service_role().unwrap_or_default().to_string(),
        }))
    }

    async fn create_project(&self, project: &ProjectInput) -> AwsResult<()> {
        self.client
            .create_project()
            .name(&project.name)
            .description(&project.description)
            .source(source(project)?)
            .artifacts(artifacts()?)
            .environment(environment(project)?)
            .service_role(&project.service_role_arn)
            .set_cache(cache(project)?)
            .set_tags(Some(tags(project)))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("create project", e))
    }

    async fn update_project(&self, project: &ProjectInput) -> AwsResult<()> {
        self.client
            .update_project()
            .name(&project.name)
            .description(&project.description)
            .source(source(project)?)
            .artifacts(artifacts()?)
            .environment(environment(project)?)
            .service_role(&project.service_role_arn)
            .set_cache(cache(project)?)
            .set_tags(Some(tags(project)))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("update project", e))
    }

    async fn delete_project(&self, name: &str) -> AwsResult<()> {
        self.client
            .delete_project()
            .name(name)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("delete project", e))
    }
}
