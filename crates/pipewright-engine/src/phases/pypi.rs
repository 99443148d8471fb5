//! PyPI publish phase, mirroring the npm phase with twine credentials.

use std::collections::BTreeMap;

use async_trait::async_trait;
use pipewright_aws::{codebuild, iam, ssm, CloudClients};
use pipewright_types::{
    ActionTypeId, PhaseContext, PhaseSpec, ProjectSettings, SecretQuestion, StageDeclaration,
    BUILD_OUTPUT,
};
use serde::Deserialize;

use super::{single_action_stage, DEFAULT_BUILD_IMAGE};
use crate::error::Result;
use crate::phase::{parse_params, question, require_secret, PhaseHandler};
use crate::{common, naming};

pub struct PypiPhase;

const USERNAME_KEY: &str = "pypi_username";
const PASSWORD_KEY: &str = "pypi_password";

#[derive(Deserialize)]
struct PypiParams {
    #[serde(default = "default_repository")]
    repository_url: String,
}

fn default_repository() -> String {
    "https://upload.pypi.org/legacy/".to_string()
}

fn buildspec(username_parameter: &str, password_parameter: &str, repository_url: &str) -> String {
    format!(
        "version: 0.2\n\
         env:\n\
         \x20 parameter-store:\n\
         \x20   TWINE_USERNAME: \"{username_parameter}\"\n\
         \x20   TWINE_PASSWORD: \"{password_parameter}\"\n\
         phases:\n\
         \x20 install:\n\
         \x20   commands:\n\
         \x20     - pip install twine\n\
         \x20 build:\n\
         \x20   commands:\n\
         \x20     - python setup.py sdist\n\
         \x20     - twine upload --repository-url {repository_url} dist/*\n"
    )
}

#[async_trait]
impl PhaseHandler for PypiPhase {
    fn phase_type(&self) -> &'static str {
        "pypi"
    }

    fn check(&self, _spec: &PhaseSpec) -> Vec<String> {
        Vec::new()
    }

    fn secret_questions(&self, spec: &PhaseSpec) -> Vec<SecretQuestion> {
        vec![
            question(spec, USERNAME_KEY, "PyPI username for publishing"),
            question(spec, PASSWORD_KEY, "PyPI password for publishing"),
        ]
    }

    async fn deploy(&self, ctx: &PhaseContext, clients: &CloudClients) -> Result<StageDeclaration> {
        let params: PypiParams = parse_params(ctx)?;
        let username = require_secret(ctx, USERNAME_KEY)?;
        let password = require_secret(ctx, PASSWORD_KEY)?;
        tracing::info!(phase = %ctx.phase_name, "Creating PyPI publish phase");

        let username_parameter =
            naming::ssm_parameter(&ctx.app_name, &ctx.pipeline_name, USERNAME_KEY);
        let password_parameter =
            naming::ssm_parameter(&ctx.app_name, &ctx.pipeline_name, PASSWORD_KEY);
        ssm::put_phase_secret(clients.ssm.as_ref(), &username_parameter, username, "PyPI username")
            .await?;
        ssm::put_phase_secret(clients.ssm.as_ref(), &password_parameter, password, "PyPI password")
            .await?;

        let role = common::ensure_publish_phase_role(
            clients,
            &ctx.account,
            &ctx.app_name,
            &naming::pypi_phase_role(&ctx.app_name),
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
            build_spec: Some(buildspec(
                &username_parameter,
                &password_parameter,
                &params.repository_url,
            )),
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
            &[
                naming::ssm_parameter(&ctx.app_name, &ctx.pipeline_name, USERNAME_KEY),
                naming::ssm_parameter(&ctx.app_name, &ctx.pipeline_name, PASSWORD_KEY),
            ],
        )
        .await?;
        iam::delete_role_and_policy(
            clients.iam.as_ref(),
            &ctx.account.account_id,
            &naming::pypi_phase_role(&ctx.app_name),
        )
        .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::testutil;

    #[tokio::test]
    async fn test_deploy_stores_both_credentials() {
        let (clients, cloud) = pipewright_aws::CloudClients::in_memory();
        let ctx = testutil::ctx(
            "pypi",
            "PublishPypi",
            serde_json::json!({}),
            &[("pypi_username", "me"), ("pypi_password", "s3cret")],
        );
        PypiPhase.deploy(&ctx, &clients).await.unwrap();

        assert_eq!(cloud.parameter("shop.prd.pypi_username").as_deref(), Some("me"));
        assert_eq!(cloud.parameter("shop.prd.pypi_password").as_deref(), Some("s3cret"));
        let spec = cloud.project("shop-prd-PublishPypi").unwrap().build_spec.unwrap();
        assert!(spec.contains("twine upload --repository-url https://upload.pypi.org/legacy/"));
    }

    #[tokio::test]
    async fn test_custom_repository_url() {
        let (clients, cloud) = pipewright_aws::CloudClients::in_memory();
        let ctx = testutil::ctx(
            "pypi",
            "PublishPypi",
            serde_json::json!({"repository_url": "https://pypi.example.com/simple/"}),
            &[("pypi_username", "me"), ("pypi_password", "s3cret")],
        );
        PypiPhase.deploy(&ctx, &clients).await.unwrap();
        let spec = cloud.project("shop-prd-PublishPypi").unwrap().build_spec.unwrap();
        assert!(spec.contains("https://pypi.example.com/simple/"));
    }

    #[tokio::test]
    async fn test_secret_questions_lists_both() {
        let questions =
            PypiPhase.secret_questions(&testutil::spec("pypi", "PublishPypi", serde_json::json!({})));
        let keys: Vec<&str> = questions.iter().map(|q| q.key.as_str()).collect();
        assert_eq!(keys, vec!["pypi_username", "pypi_password"]);
    }
}
