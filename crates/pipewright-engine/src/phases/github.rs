//! GitHub source phase. Provisions nothing; contributes the source stage
//! that watches a repository branch.

use async_trait::async_trait;
use pipewright_aws::CloudClients;
use pipewright_types::{
    ActionTypeId, PhaseContext, PhaseSpec, SecretQuestion, StageDeclaration, SOURCE_OUTPUT,
};
use serde::Deserialize;

use super::single_action_stage;
use crate::error::Result;
use crate::phase::{parse_params, question, require_secret, PhaseHandler};

pub struct GithubPhase;

#[derive(Deserialize)]
struct GithubParams {
    owner: String,
    repo: String,
    #[serde(default = "default_branch")]
    branch: String,
}

fn default_branch() -> String {
    "master".to_string()
}

#[async_trait]
impl PhaseHandler for GithubPhase {
    fn phase_type(&self) -> &'static str {
        "github"
    }

    fn check(&self, spec: &PhaseSpec) -> Vec<String> {
        let mut errors = Vec::new();
        if spec.str_param("owner").is_none() {
            errors.push(format!("Phase '{}' - the 'owner' parameter is required", spec.name));
        }
        if spec.str_param("repo").is_none() {
            errors.push(format!("Phase '{}' - the 'repo' parameter is required", spec.name));
        }
        errors
    }

    fn secret_questions(&self, spec: &PhaseSpec) -> Vec<SecretQuestion> {
        vec![question(
            spec,
            "access_token",
            "GitHub access token with repo scope",
        )]
    }

    async fn deploy(
        &self,
        ctx: &PhaseContext,
        _clients: &CloudClients,
    ) -> Result<StageDeclaration> {
        let params: GithubParams = parse_params(ctx)?;
        let token = require_secret(ctx, "access_token")?;
        tracing::info!(phase = %ctx.phase_name, "Creating source phase");

        Ok(single_action_stage(
            &ctx.phase_name,
            ActionTypeId::new("Source", "ThirdParty", "GitHub"),
            vec![],
            vec![SOURCE_OUTPUT.to_string()],
            vec![
                ("Owner".to_string(), params.owner),
                ("Repo".to_string(), params.repo),
                ("Branch".to_string(), params.branch),
                ("OAuthToken".to_string(), token.to_string()),
            ],
        ))
    }

    async fn delete(&self, ctx: &PhaseContext, _clients: &CloudClients) -> Result<bool> {
        tracing::info!(phase = %ctx.phase_name, "Nothing to delete for source phase");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::testutil;

    #[test]
    fn test_check_requires_owner_and_repo() {
        let errors = GithubPhase.check(&testutil::spec("github", "Source", serde_json::json!({})));
        assert_eq!(errors.len(), 2);
        assert!(GithubPhase
            .check(&testutil::spec(
                "github",
                "Source",
                serde_json::json!({"owner": "byu-oit", "repo": "shop"})
            ))
            .is_empty());
    }

    #[tokio::test]
    async fn test_deploy_builds_source_stage() {
        let (clients, _cloud) = pipewright_aws::CloudClients::in_memory();
        let ctx = testutil::ctx(
            "github",
            "Source",
            serde_json::json!({"owner": "byu-oit", "repo": "shop"}),
            &[("access_token", "gh-token")],
        );
        let stage = GithubPhase.deploy(&ctx, &clients).await.unwrap();

        assert_eq!(stage.name, "Source");
        let action = &stage.actions[0];
        assert_eq!(action.action_type_id.provider, "GitHub");
        assert_eq!(action.output_artifacts, vec![SOURCE_OUTPUT.to_string()]);
        assert!(action.input_artifacts.is_empty());
        // Branch falls back when unset.
        assert_eq!(action.configuration_value("Branch"), Some("master"));
        assert_eq!(action.configuration_value("OAuthToken"), Some("gh-token"));
    }

    #[tokio::test]
    async fn test_deploy_without_token_fails() {
        let (clients, _cloud) = pipewright_aws::CloudClients::in_memory();
        let ctx = testutil::ctx(
            "github",
            "Source",
            serde_json::json!({"owner": "byu-oit", "repo": "shop"}),
            &[],
        );
        let err = GithubPhase.deploy(&ctx, &clients).await.unwrap_err();
        assert!(err.to_string().contains("access_token"));
    }
}
