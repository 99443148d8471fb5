//! Slack notification phase: an Invoke action against a singleton Lambda
//! that posts to a webhook.

use async_trait::async_trait;
use pipewright_aws::CloudClients;
use pipewright_types::{ActionTypeId, PhaseContext, PhaseSpec, SecretQuestion, StageDeclaration};
use serde::Deserialize;
use serde_json::json;

use super::single_action_stage;
use crate::error::Result;
use crate::phase::{parse_params, question, require_secret, PhaseHandler};
use crate::{common, naming};

pub struct SlackNotifyPhase;

const WEBHOOK_KEY: &str = "webhook_url";
const NOTIFY_USERNAME: &str = "Pipewright Notify";

const TEMPLATE: &str = include_str!("../assets/slack-notify-lambda.yml");

#[derive(Deserialize)]
struct SlackNotifyParams {
    channel: String,
    message: String,
}

#[async_trait]
impl PhaseHandler for SlackNotifyPhase {
    fn phase_type(&self) -> &'static str {
        "slack_notify"
    }

    fn check(&self, spec: &PhaseSpec) -> Vec<String> {
        let mut errors = Vec::new();
        for param in ["channel", "message"] {
            if spec.str_param(param).is_none() {
                errors.push(format!(
                    "Phase '{}' - the '{param}' parameter is required",
                    spec.name
                ));
            }
        }
        errors
    }

    fn secret_questions(&self, spec: &PhaseSpec) -> Vec<SecretQuestion> {
        vec![question(spec, WEBHOOK_KEY, "Slack incoming webhook URL")]
    }

    async fn deploy(&self, ctx: &PhaseContext, clients: &CloudClients) -> Result<StageDeclaration> {
        let params: SlackNotifyParams = parse_params(ctx)?;
        let webhook = require_secret(ctx, WEBHOOK_KEY)?;
        tracing::info!(phase = %ctx.phase_name, "Creating Slack notify phase");

        let function_name = common::ensure_invoke_lambda(
            clients,
            &ctx.account,
            naming::SLACK_NOTIFY_STACK,
            TEMPLATE,
        )
        .await?;

        let user_parameters = json!({
            "webhook": webhook,
            "message": params.message,
            "username": NOTIFY_USERNAME,
            "channel": params.channel,
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
        tracing::info!(phase = %ctx.phase_name, "Nothing to delete for Slack notify phase");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::testutil;

    #[test]
    fn test_check_requires_channel_and_message() {
        let errors = SlackNotifyPhase
            .check(&testutil::spec("slack_notify", "Notify", serde_json::json!({})));
        assert_eq!(errors.len(), 2);
        assert!(SlackNotifyPhase
            .check(&testutil::spec(
                "slack_notify",
                "Notify",
                serde_json::json!({"channel": "#deploys", "message": "shop deployed"})
            ))
            .is_empty());
    }

    #[tokio::test]
    async fn test_deploy_builds_invoke_stage_with_webhook() {
        let (clients, cloud) = pipewright_aws::CloudClients::in_memory();
        let ctx = testutil::ctx(
            "slack_notify",
            "Notify",
            serde_json::json!({"channel": "#deploys", "message": "shop deployed"}),
            &[("webhook_url", "https://hooks.slack.com/services/T0/B0/x")],
        );
        let stage = SlackNotifyPhase.deploy(&ctx, &clients).await.unwrap();

        assert!(cloud.stack("PipewrightSlackNotifyLambda").is_some());
        let action = &stage.actions[0];
        assert_eq!(
            action.configuration_value("FunctionName"),
            Some("PipewrightSlackNotifyLambda")
        );
        let user_params: serde_json::Value =
            serde_json::from_str(action.configuration_value("UserParameters").unwrap()).unwrap();
        assert_eq!(user_params["webhook"], "https://hooks.slack.com/services/T0/B0/x");
        assert_eq!(user_params["channel"], "#deploys");
        assert_eq!(user_params["username"], "Pipewright Notify");
    }
}
