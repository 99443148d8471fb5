//! Runscope test phase: an Invoke action against a singleton Lambda that
//! triggers the test run and reports its result back to the pipeline.

use async_trait::async_trait;
use pipewright_aws::CloudClients;
use pipewright_types::{ActionTypeId, PhaseContext, PhaseSpec, SecretQuestion, StageDeclaration};
use serde_json::json;

use super::single_action_stage;
use crate::error::Result;
use crate::phase::{question, require_secret, PhaseHandler};
use crate::{common, naming};

pub struct RunscopePhase;

const TRIGGER_URL_KEY: &str = "trigger_url";
const ACCESS_TOKEN_KEY: &str = "access_token";

const TEMPLATE: &str = include_str!("../assets/runscope-lambda.yml");

#[async_trait]
impl PhaseHandler for RunscopePhase {
    fn phase_type(&self) -> &'static str {
        "runscope"
    }

    fn check(&self, _spec: &PhaseSpec) -> Vec<String> {
        Vec::new()
    }

    fn secret_questions(&self, spec: &PhaseSpec) -> Vec<SecretQuestion> {
        vec![
            question(spec, TRIGGER_URL_KEY, "Runscope test trigger URL"),
            question(spec, ACCESS_TOKEN_KEY, "Runscope API access token"),
        ]
    }

    async fn deploy(&self, ctx: &PhaseContext, clients: &CloudClients) -> Result<StageDeclaration> {
        let trigger_url = require_secret(ctx, TRIGGER_URL_KEY)?;
        let access_token = require_secret(ctx, ACCESS_TOKEN_KEY)?;
        tracing::info!(phase = %ctx.phase_name, "Creating Runscope test phase");

        let function_name = common::ensure_invoke_lambda(
            clients,
            &ctx.account,
            naming::RUNSCOPE_STACK,
            TEMPLATE,
        )
        .await?;

        let user_parameters = json!({
            "runscopeTriggerUrl": trigger_url,
            "runscopeAccessToken": access_token,
        });

        Ok(single_action_stage(
            &ctx.phase_name,
            ActionTypeId::new("Invoke", "AWS", "Lambda"),
            vec![],
            vec![],
            vec![
                ("FunctionName".to_string(), function_name),
                ("UserParameters".to_string(), user_parameters.to_string()),
            ],
        ))
    }

    async fn delete(&self, ctx: &PhaseContext, _clients: &CloudClients) -> Result<bool> {
        // The Lambda stack is shared by every pipeline in the account.
        tracing::info!(phase = %ctx.phase_name, "Nothing to delete for Runscope phase");
        Ok(false)
    }
}
