//! CodeCommit source phase.

use async_trait::async_trait;
use pipewright_aws::CloudClients;
use pipewright_types::{ActionTypeId, PhaseContext, PhaseSpec, StageDeclaration, SOURCE_OUTPUT};
use serde::Deserialize;

use super::single_action_stage;
use crate::error::Result;
use crate::phase::{parse_params, PhaseHandler};

pub struct CodeCommitPhase;

#[derive(Deserialize)]
struct CodeCommitParams {
    repo: String,
    #[serde(default = "default_branch")]
    branch: String,
}

fn default_branch() -> String {
    "master".to_string()
}

#[async_trait]
impl PhaseHandler for CodeCommitPhase {
    fn phase_type(&self) -> &'static str {
        "codecommit"
    }

    fn check(&self, spec: &PhaseSpec) -> Vec<String> {
        let mut errors = Vec::new();
        if spec.str_param("repo").is_none() {
            errors.push(format!("Phase '{}' - the 'repo' parameter is required", spec.name));
        }
        errors
    }

    async fn deploy(
        &self,
        ctx: &PhaseContext,
        _clients: &CloudClients,
    ) -> Result<StageDeclaration> {
        let params: CodeCommitParams = parse_params(ctx)?;
        tracing::info!(phase = %ctx.phase_name, "Creating source phase");

        Ok(single_action_stage(
            &ctx.phase_name,
            ActionTypeId::new("Source", "AWS", "CodeCommit"),
            vec![],
            vec![SOURCE_OUTPUT.to_string()],
            vec![
                ("RepositoryName".to_string(), params.repo),
                ("BranchName".to_string(), params.branch),
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
    fn test_check_requires_repo() {
        let errors =
            CodeCommitPhase.check(&testutil::spec("codecommit", "Source", serde_json::json!({})));
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn test_deploy_builds_codecommit_stage() {
        let (clients, _cloud) = pipewright_aws::CloudClients::in_memory();
        let ctx = testutil::ctx(
            "codecommit",
            "Source",
            serde_json::json!({"repo": "shop", "branch": "main"}),
            &[],
        );
        let stage = CodeCommitPhase.deploy(&ctx, &clients).await.unwrap();
        let action = &stage.actions[0];
        assert_eq!(action.action_type_id.provider, "CodeCommit");
        assert_eq!(action.action_type_id.owner, "AWS");
        assert_eq!(action.configuration_value("RepositoryName"), Some("shop"));
        assert_eq!(action.configuration_value("BranchName"), Some("main"));
    }
}
