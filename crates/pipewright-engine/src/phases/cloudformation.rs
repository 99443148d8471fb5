//! CloudFormation deploy phase. The pipeline itself runs the stack
//! create/update; this handler only provisions the role the action assumes
//! and wires the action configuration.

use async_trait::async_trait;
use pipewright_aws::{iam, CloudClients};
use pipewright_types::{
    ActionTypeId, PhaseContext, PhaseSpec, Role, StageDeclaration, BUILD_OUTPUT,
};
use serde::Deserialize;
use serde_json::json;

use super::single_action_stage;
use crate::error::Result;
use crate::phase::{parse_params, PhaseHandler};
use crate::naming;

pub struct CloudFormationPhase;

#[derive(Deserialize)]
struct CloudFormationParams {
    template_path: String,
    #[serde(default)]
    stack_name: Option<String>,
    #[serde(default)]
    deploy_role: Option<String>,
}

/// CloudFormation can touch anything the template names, so the managed
/// role is unrestricted. Supplying `deploy_role` is the way to scope it.
async fn resolve_role(
    ctx: &PhaseContext,
    clients: &CloudClients,
    deploy_role: Option<&str>,
) -> Result<Role> {
    if let Some(role_name) = deploy_role {
        return Ok(iam::require_role(clients.iam.as_ref(), role_name).await?);
    }
    let role = iam::ensure_role_with_policy(
        clients.iam.as_ref(),
        &ctx.account.account_id,
        &naming::cloudformation_role(&ctx.app_name),
        &["cloudformation.amazonaws.com"],
        &json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Action": "*",
                "Resource": "*"
            }]
        }),
    )
    .await?;
    Ok(role)
}

#[async_trait]
impl PhaseHandler for CloudFormationPhase {
    fn phase_type(&self) -> &'static str {
        "cloudformation"
    }

    fn check(&self, spec: &PhaseSpec) -> Vec<String> {
        let mut errors = Vec::new();
        if spec.str_param("template_path").is_none() {
            errors.push(format!(
                "Phase '{}' - the 'template_path' parameter is required",
                spec.name
            ));
        }
        errors
    }

    async fn deploy(&self, ctx: &PhaseContext, clients: &CloudClients) -> Result<StageDeclaration> {
        let params: CloudFormationParams = parse_params(ctx)?;
        tracing::info!(phase = %ctx.phase_name, "Creating CloudFormation deploy phase");

        let role = resolve_role(ctx, clients, params.deploy_role.as_deref()).await?;
        let stack_name = params.stack_name.unwrap_or_else(|| {
            naming::project(&ctx.app_name, &ctx.pipeline_name, &ctx.phase_name)
        });

        Ok(single_action_stage(
            &ctx.phase_name,
            ActionTypeId::new("Deploy", "AWS", "CloudFormation"),
            vec![BUILD_OUTPUT.to_string()],
            vec![],
            vec![
                ("ActionMode".to_string(), "CREATE_UPDATE".to_string()),
                ("StackName".to_string(), stack_name),
                ("Capabilities".to_string(), "CAPABILITY_NAMED_IAM".to_string()),
                (
                    "TemplatePath".to_string(),
                    format!("{BUILD_OUTPUT}::{}", params.template_path),
                ),
                ("RoleArn".to_string(), role.arn),
            ],
        ))
    }

    async fn delete(&self, ctx: &PhaseContext, clients: &CloudClients) -> Result<bool> {
        // The stack the pipeline deployed is application state and stays.
        // A user-supplied deploy_role is not ours to remove either.
        if ctx.params.contains_key("deploy_role") {
            return Ok(false);
        }
        iam::delete_role_and_policy(
            clients.iam.as_ref(),
            &ctx.account.account_id,
            &naming::cloudformation_role(&ctx.app_name),
        )
        .await?;
        Ok(true)
    }
}
