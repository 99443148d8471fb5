//! Build phase backed by a CodeBuild project.
//!
//! The project and its service role are provisioned per pipeline. An
//! `extra_resources` block hands supporting resources to the external
//! resource deployer, whose outputs feed back into the role policy and the
//! build environment.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use pipewright_aws::{codebuild, iam, CloudClients};
use pipewright_types::{
    ActionTypeId, PhaseContext, PhaseSpec, ProjectSettings, Role, StageDeclaration, BUILD_OUTPUT,
    SOURCE_OUTPUT,
};
use serde::Deserialize;

use super::single_action_stage;
use crate::error::{ProvisionError, Result};
use crate::phase::{parse_params, ExtraResourceDeployer, PhaseHandler};
use crate::{common, naming};

pub struct CodeBuildPhase {
    extra_resources: Option<Arc<dyn ExtraResourceDeployer>>,
}

impl CodeBuildPhase {
    pub fn new(extra_resources: Option<Arc<dyn ExtraResourceDeployer>>) -> Self {
        CodeBuildPhase { extra_resources }
    }
}

#[derive(Deserialize)]
struct CodeBuildParams {
    build_image: String,
    #[serde(default)]
    environment_variables: BTreeMap<String, String>,
    /// Existing role to build with instead of the managed per-app role.
    #[serde(default)]
    build_role: Option<String>,
    #[serde(default)]
    cache: bool,
    #[serde(default)]
    extra_resources: Option<serde_json::Value>,
}

impl CodeBuildPhase {
    async fn resolve_role(
        &self,
        ctx: &PhaseContext,
        clients: &CloudClients,
        params: &CodeBuildParams,
        extra_statements: &[serde_json::Value],
    ) -> Result<Role> {
        match &params.build_role {
            Some(role_name) => Ok(iam::require_role(clients.iam.as_ref(), role_name).await?),
            None => Ok(common::ensure_build_phase_role(
                clients,
                &ctx.account,
                &ctx.app_name,
                extra_statements,
            )
            .await?),
        }
    }
}

#[async_trait]
impl PhaseHandler for CodeBuildPhase {
    fn phase_type(&self) -> &'static str {
        "codebuild"
    }

    fn check(&self, spec: &PhaseSpec) -> Vec<String> {
        let mut errors = Vec::new();
        if spec.str_param("build_image").is_none() {
            errors.push(format!(
                "Phase '{}' - the 'build_image' parameter is required",
                spec.name
            ));
        }
        if spec.params.contains_key("extra_resources") && self.extra_resources.is_none() {
            errors.push(format!(
                "Phase '{}' - 'extra_resources' is configured but no resource deployer is available",
                spec.name
            ));
        }
        errors
    }

    async fn deploy(&self, ctx: &PhaseContext, clients: &CloudClients) -> Result<StageDeclaration> {
        let params: CodeBuildParams = parse_params(ctx)?;
        tracing::info!(phase = %ctx.phase_name, "Creating build phase");

        let mut env_vars = params.environment_variables.clone();
        let mut extra_statements = Vec::new();
        if let Some(resources) = &params.extra_resources {
            let deployer = self.extra_resources.as_ref().ok_or_else(|| {
                ProvisionError::InvalidPhaseConfig {
                    phase: ctx.phase_name.clone(),
                    message: "'extra_resources' is configured but no resource deployer is available"
                        .to_string(),
                }
            })?;
            tracing::info!(phase = %ctx.phase_name, "Deploying extra resources for build phase");
            let outputs = deployer.deploy(ctx, resources).await?;
            extra_statements = outputs.policy_statements;
            env_vars.extend(outputs.environment_variables);
        }

        let role = self.resolve_role(ctx, clients, &params, &extra_statements).await?;

        let project_name = naming::project(&ctx.app_name, &ctx.pipeline_name, &ctx.phase_name);
        let settings = ProjectSettings {
            project_name: project_name.clone(),
            app_name: ctx.app_name.clone(),
            pipeline_name: ctx.pipeline_name.clone(),
            phase_name: ctx.phase_name.clone(),
            account: ctx.account.clone(),
            image: params.build_image.clone(),
            environment_variables: env_vars,
            service_role_arn: role.arn,
            build_spec: None,
            cache_location: params.cache.then(|| {
                naming::cache_location(
                    &ctx.artifact_bucket,
                    &ctx.app_name,
                    &ctx.pipeline_name,
                    &ctx.phase_name,
                )
            }),
        };
        codebuild::ensure_project(clients.codebuild.as_ref(), &clients.retry, &settings).await?;

        Ok(single_action_stage(
            &ctx.phase_name,
            ActionTypeId::new("Build", "AWS", "CodeBuild"),
            vec![SOURCE_OUTPUT.to_string()],
            vec![BUILD_OUTPUT.to_string()],
            vec![("ProjectName".to_string(), project_name)],
        ))
    }

    async fn delete(&self, ctx: &PhaseContext, clients: &CloudClients) -> Result<bool> {
        let params: CodeBuildParams = parse_params(ctx)?;
        let project_name = naming::project(&ctx.app_name, &ctx.pipeline_name, &ctx.phase_name);
        codebuild::delete_project(clients.codebuild.as_ref(), &project_name).await?;

        if params.build_role.is_none() {
            iam::delete_role_and_policy(
                clients.iam.as_ref(),
                &ctx.account.account_id,
                &naming::build_phase_role(&ctx.app_name),
            )
            .await?;
        }
        if let (Some(_), Some(deployer)) = (&params.extra_resources, &self.extra_resources) {
            deployer.delete(ctx).await?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::ExtraResourceOutputs;
    use crate::phases::testutil;

    fn params() -> serde_json::Value {
        serde_json::json!({"build_image": "aws/codebuild/standard:7.0"})
    }

    #[test]
    fn test_check_requires_build_image() {
        let handler = CodeBuildPhase::new(None);
        let errors = handler.check(&testutil::spec("codebuild", "Build", serde_json::json!({})));
        assert_eq!(errors.len(), 1);
        assert!(handler.check(&testutil::spec("codebuild", "Build", params())).is_empty());
    }

    #[test]
    fn test_check_flags_extra_resources_without_deployer() {
        let handler = CodeBuildPhase::new(None);
        let spec = testutil::spec(
            "codebuild",
            "Build",
            serde_json::json!({
                "build_image": "aws/codebuild/standard:7.0",
                "extra_resources": {"shop-table": {"type": "dynamodb"}}
            }),
        );
        let errors = handler.check(&spec);
        assert!(errors.iter().any(|e| e.contains("no resource deployer")));
    }

    #[tokio::test]
    async fn test_deploy_provisions_role_and_project() {
        let (clients, cloud) = pipewright_aws::CloudClients::in_memory();
        let handler = CodeBuildPhase::new(None);
        let ctx = testutil::ctx("codebuild", "Build", params(), &[]);

        let stage = handler.deploy(&ctx, &clients).await.unwrap();

        assert!(cloud.role("shop-PipewrightBuildPhase").is_some());
        let project = cloud.project("shop-prd-Build").unwrap();
        assert_eq!(
            project.service_role_arn,
            "arn:aws:iam::111122223333:role/shop-PipewrightBuildPhase"
        );
        let action = &stage.actions[0];
        assert_eq!(action.input_artifacts, vec![SOURCE_OUTPUT.to_string()]);
        assert_eq!(action.output_artifacts, vec![BUILD_OUTPUT.to_string()]);
        assert_eq!(action.configuration_value("ProjectName"), Some("shop-prd-Build"));
    }

    #[tokio::test]
    async fn test_deploy_with_custom_role_requires_it_to_exist() {
        let (clients, _cloud) = pipewright_aws::CloudClients::in_memory();
        let handler = CodeBuildPhase::new(None);
        let ctx = testutil::ctx(
            "codebuild",
            "Build",
            serde_json::json!({
                "build_image": "aws/codebuild/standard:7.0",
                "build_role": "my-existing-role"
            }),
            &[],
        );
        let err = handler.deploy(&ctx, &clients).await.unwrap_err();
        assert!(err.to_string().contains("my-existing-role"));
    }

    #[tokio::test]
    async fn test_cache_enables_s3_cache_location() {
        let (clients, cloud) = pipewright_aws::CloudClients::in_memory();
        let handler = CodeBuildPhase::new(None);
        let ctx = testutil::ctx(
            "codebuild",
            "Build",
            serde_json::json!({"build_image": "aws/codebuild/standard:7.0", "cache": true}),
            &[],
        );
        handler.deploy(&ctx, &clients).await.unwrap();
        assert_eq!(
            cloud.project("shop-prd-Build").unwrap().cache_location.as_deref(),
            Some("codepipeline-us-west-2-111122223333/caches/shop/prd/Build/codeBuildCache")
        );
    }

    struct FakeDeployer;

    #[async_trait]
    impl ExtraResourceDeployer for FakeDeployer {
        async fn deploy(
            &self,
            _ctx: &PhaseContext,
            _resources: &serde_json::Value,
        ) -> anyhow::Result<ExtraResourceOutputs> {
            Ok(ExtraResourceOutputs {
                policy_statements: vec![serde_json::json!({
                    "Effect": "Allow",
                    "Action": "dynamodb:GetItem",
                    "Resource": "*"
                })],
                environment_variables: [("TABLE_NAME".to_string(), "shop-table".to_string())]
                    .into_iter()
                    .collect(),
            })
        }

        async fn delete(&self, _ctx: &PhaseContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_extra_resources_feed_role_and_environment() {
        let (clients, cloud) = pipewright_aws::CloudClients::in_memory();
        let handler = CodeBuildPhase::new(Some(Arc::new(FakeDeployer)));
        let ctx = testutil::ctx(
            "codebuild",
            "Build",
            serde_json::json!({
                "build_image": "aws/codebuild/standard:7.0",
                "extra_resources": {"shop-table": {"type": "dynamodb"}}
            }),
            &[],
        );
        handler.deploy(&ctx, &clients).await.unwrap();

        let arn = pipewright_aws::iam::policy_arn("111122223333", "shop-PipewrightBuildPhase");
        let policy_doc = cloud.default_policy_document(&arn).unwrap();
        assert!(policy_doc.contains("dynamodb:GetItem"));

        let project = cloud.project("shop-prd-Build").unwrap();
        assert!(project
            .environment_variables
            .iter()
            .any(|(k, v)| k == "TABLE_NAME" && v == "shop-table"));
    }

    #[tokio::test]
    async fn test_delete_removes_project_and_managed_role() {
        let (clients, cloud) = pipewright_aws::CloudClients::in_memory();
        let handler = CodeBuildPhase::new(None);
        let ctx = testutil::ctx("codebuild", "Build", params(), &[]);

        handler.deploy(&ctx, &clients).await.unwrap();
        assert!(handler.delete(&ctx, &clients).await.unwrap());
        assert!(cloud.project("shop-prd-Build").is_none());
        assert!(cloud.role("shop-PipewrightBuildPhase").is_none());
    }
}
