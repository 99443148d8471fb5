//! Invoke an existing Lambda function as a pipeline stage.

use async_trait::async_trait;
use pipewright_aws::CloudClients;
use pipewright_types::{ActionTypeId, PhaseContext, PhaseSpec, StageDeclaration};
use serde::Deserialize;

use super::single_action_stage;
use crate::error::Result;
use crate::phase::{parse_params, PhaseHandler};

pub struct InvokeLambdaPhase;

#[derive(Deserialize)]
struct InvokeLambdaParams {
    function_name: String,
    #[serde(default)]
    function_parameters: Option<serde_json::Value>,
}

#[async_trait]
impl PhaseHandler for InvokeLambdaPhase {
    fn phase_type(&self) -> &'static str {
        "invoke_lambda"
    }

    fn check(&self, spec: &PhaseSpec) -> Vec<String> {
        let mut errors = Vec::new();
        if spec.str_param("function_name").is_none() {
            errors.push(format!(
                "Phase '{}' - the 'function_name' parameter is required",
                spec.name
            ));
        }
        errors
    }

    async fn deploy(
        &self,
        ctx: &PhaseContext,
        _clients: &CloudClients,
    ) -> Result<StageDeclaration> {
        let params: InvokeLambdaParams = parse_params(ctx)?;
        tracing::info!(phase = %ctx.phase_name, "Creating Lambda invoke phase");

        let mut configuration = vec![("FunctionName".to_string(), params.function_name)];
        if let Some(user_parameters) = params.function_parameters {
            configuration.push(("UserParameters".to_string(), user_parameters.to_string()));
        }

        Ok(single_action_stage(
            &ctx.phase_name,
            ActionTypeId::new("Invoke", "AWS", "Lambda"),
            vec![],
            vec![],
            configuration,
        ))
    }

    async fn delete(&self, ctx: &PhaseContext, _clients: &CloudClients) -> Result<bool> {
        tracing::info!(phase = %ctx.phase_name, "Nothing to delete for Lambda invoke phase");
        Ok(false)
    }
}
