//! Deployment phase that runs the Handel deployment engine inside a
//! CodeBuild project. The target environments and the serialized account
//! config travel as environment variables into the build.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use pipewright_aws::{codebuild, CloudClients};
use pipewright_types::{
    ActionTypeId, PhaseContext, PhaseSpec, ProjectSettings, StageDeclaration, BUILD_OUTPUT,
};
use serde::Deserialize;

use super::{single_action_stage, DEFAULT_BUILD_IMAGE};
use crate::error::Result;
use crate::phase::{parse_params, PhaseHandler};
use crate::{common, naming};

pub struct HandelPhase;

#[derive(Deserialize)]
struct HandelParams {
    environments_to_deploy: Vec<String>,
}

fn buildspec() -> String {
    [
        "version: 0.2",
        "phases:",
        "  install:",
        "    commands:",
        "      - npm install -g handel",
        "  build:",
        "    commands:",
        "      - handel deploy -c \"${HANDEL_ACCOUNT_CONFIG}\" -e \"${ENVS_TO_DEPLOY}\"",
    ]
    .join("\n")
}

#[async_trait]
impl PhaseHandler for HandelPhase {
    fn phase_type(&self) -> &'static str {
        "handel"
    }

    fn check(&self, spec: &PhaseSpec) -> Vec<String> {
        let mut errors = Vec::new();
        let environments = spec
            .params
            .get("environments_to_deploy")
            .and_then(serde_json::Value::as_array);
        match environments {
            None => errors.push(format!(
                "Phase '{}' - the 'environments_to_deploy' parameter is required",
                spec.name
            )),
            Some(list) if list.is_empty() => errors.push(format!(
                "Phase '{}' - 'environments_to_deploy' must name at least one environment",
                spec.name
            )),
            Some(_) => {}
        }
        errors
    }

    async fn deploy(&self, ctx: &PhaseContext, clients: &CloudClients) -> Result<StageDeclaration> {
        let params: HandelParams = parse_params(ctx)?;
        tracing::info!(phase = %ctx.phase_name, "Creating deployment phase");

        let role = common::ensure_deploy_phase_role(clients, &ctx.account).await?;

        let account_yaml = serde_yaml::to_string(&ctx.account)
            .map_err(|err| anyhow::anyhow!("failed to serialize account config: {err}"))?;
        let mut env_vars = BTreeMap::new();
        env_vars.insert(
            "ENVS_TO_DEPLOY".to_string(),
            params.environments_to_deploy.join(","),
        );
        env_vars.insert(
            "HANDEL_ACCOUNT_CONFIG".to_string(),
            BASE64.encode(account_yaml),
        );

        let project_name = naming::project(&ctx.app_name, &ctx.pipeline_name, &ctx.phase_name);
        let settings = ProjectSettings {
            project_name: project_name.clone(),
            app_name: ctx.app_name.clone(),
            pipeline_name: ctx.pipeline_name.clone(),
            phase_name: ctx.phase_name.clone(),
            account: ctx.account.clone(),
            image: DEFAULT_BUILD_IMAGE.to_string(),
            environment_variables: env_vars,
            service_role_arn: role.arn,
            build_spec: Some(buildspec()),
            cache_location: None,
        };
        codebuild::ensure_project(clients.codebuild.as_ref(), &clients.retry, &settings).await?;

        Ok(single_action_stage(
            &ctx.phase_name,
            ActionTypeId::new("Test", "AWS", "CodeBuild"),
            vec![BUILD_OUTPUT.to_string()],
            vec![],
            vec![("ProjectName".to_string(), project_name)],
        ))
    }

    async fn delete(&self, ctx: &PhaseContext, clients: &CloudClients) -> Result<bool> {
        let project_name = naming::project(&ctx.app_name, &ctx.pipeline_name, &ctx.phase_name);
        codebuild::delete_project(clients.codebuild.as_ref(), &project_name).await?;
        // The deploy role is a per-account singleton shared with other
        // pipelines, so it stays.
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::testutil;

    #[test]
    fn test_check_requires_environments() {
        assert_eq!(
            HandelPhase
                .check(&testutil::spec("handel", "Deploy", serde_json::json!({})))
                .len(),
            1
        );
        assert_eq!(
            HandelPhase
                .check(&testutil::spec(
                    "handel",
                    "Deploy",
                    serde_json::json!({"environments_to_deploy": []})
                ))
                .len(),
            1
        );
        assert!(HandelPhase
            .check(&testutil::spec(
                "handel",
                "Deploy",
                serde_json::json!({"environments_to_deploy": ["prd"]})
            ))
            .is_empty());
    }

    #[tokio::test]
    async fn test_deploy_uses_singleton_role_and_injects_envs() {
        let (clients, cloud) = pipewright_aws::CloudClients::in_memory();
        let ctx = testutil::ctx(
            "handel",
            "Deploy",
            serde_json::json!({"environments_to_deploy": ["prd", "stg"]}),
            &[],
        );
        let stage = HandelPhase.deploy(&ctx, &clients).await.unwrap();

        assert!(cloud.role("PipewrightDeployPhase").is_some());
        let project = cloud.project("shop-prd-Deploy").unwrap();
        assert!(project
            .environment_variables
            .iter()
            .any(|(k, v)| k == "ENVS_TO_DEPLOY" && v == "prd,stg"));
        assert!(project
            .environment_variables
            .iter()
            .any(|(k, _)| k == "HANDEL_ACCOUNT_CONFIG"));
        assert!(project.build_spec.as_deref().unwrap().contains("handel deploy"));

        let action = &stage.actions[0];
        assert_eq!(action.action_type_id.category, "Test");
        assert_eq!(action.input_artifacts, vec![BUILD_OUTPUT.to_string()]);
        assert!(action.output_artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_delete_keeps_singleton_role() {
        let (clients, cloud) = pipewright_aws::CloudClients::in_memory();
        let ctx = testutil::ctx(
            "handel",
            "Deploy",
            serde_json::json!({"environments_to_deploy": ["prd"]}),
            &[],
        );
        HandelPhase.deploy(&ctx, &clients).await.unwrap();
        HandelPhase.delete(&ctx, &clients).await.unwrap();
        assert!(cloud.project("shop-prd-Deploy").is_none());
        assert!(cloud.role("PipewrightDeployPhase").is_some());
    }
}
