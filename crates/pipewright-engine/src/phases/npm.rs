//! npm publish phase: a CodeBuild project whose token lives in Parameter
//! Store and is pulled into the build through the buildspec's
//! parameter-store mapping, never through a plain env var.

use std::collections::BTreeMap;

use async_trait::async_trait;
use pipewright_aws::{codebuild, iam, ssm, CloudClients};
use pipewright_types::{
    ActionTypeId, PhaseContext, PhaseSpec, ProjectSettings, SecretQuestion, StageDeclaration,
    BUILD_OUTPUT,
};

use super::{single_action_stage, DEFAULT_BUILD_IMAGE};
use crate::error::Result;
use crate::phase::{question, require_secret, PhaseHandler};
use crate::{common, naming};

pub struct NpmPhase;

const TOKEN_KEY: &str = "npm_token";

fn buildspec(token_parameter: &str) -> String {
    format!(
        "version: 0.2\n\
         env:\n\
         \x20 parameter-store:\n\
         \x20   NPM_TOKEN: \"{token_parameter}\"\n\
         phases:\n\
         \x20 build:\n\
         \x20   commands:\n\
         \x20     - echo \"//registry.npmjs.org/:_authToken=${{NPM_TOKEN}}\" >> ~/.npmrc\n\
         \x20     - npm publish\n"
    )
}

#[async_trait]
impl PhaseHandler for NpmPhase {
    fn phase_type(&self) -> &'static str {
        "npm"
    }

    fn check(&self, _spec: &PhaseSpec) -> Vec<String> {
        Vec::new()
    }

    fn secret_questions(&self, spec: &PhaseSpec) -> Vec<SecretQuestion> {
        vec![question(spec, TOKEN_KEY, "npm auth token for publishing")]
    }

    async fn deploy(&self, ctx: &PhaseContext, clients: &CloudClients) -> Result<StageDeclaration> {
        let token = require_secret(ctx, TOKEN_KEY)?;
        tracing::info!(phase = %ctx.phase_name, "Creating npm publish phase");

        let parameter = naming::ssm_parameter(&ctx.app_name, &ctx.pipeline_name, TOKEN_KEY);
        ssm::put_phase_secret(clients.ssm.as_ref(), &parameter, token, "npm publish token").await?;

        let role = common::ensure_publish_phase_role(
            clients,
            &ctx.account,
            &ctx.app_name,
            &naming::npm_phase_role(&ctx.app_name),
        )
        .await?;

        let project_name = naming::project(&ctx.app_name, &ctx.pipeline_name, &ctx.phase_name);
        let settings = ProjectSettings {
            project_name: project_name.clone(),
            app_name: ctx.app_name.clone(),
            pipeline_name: ctx.pipeline_name.clone(),
            phase_name: ctx.phase_name.clone(),
            account: ctx.account.clone(),
            image: DEFAULT_BUILD_IMAGE.to_string(),
            environment_variables: BTreeMap::new(),
            service_role_arn: role.arn,
            build_spec: Some(buildspec(&parameter)),
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
        ssm::delete_phase_secrets(
            clients.ssm.as_ref(),
            &[naming::ssm_parameter(&ctx.app_name, &ctx.pipeline_name, TOKEN_KEY)],
        )
        .await?;
        iam::delete_role_and_policy(
            clients.iam.as_ref(),
            &ctx.account.account_id,
            &naming::npm_phase_role(&ctx.app_name),
        )
        .await?;
        Ok(true)
    }
}
