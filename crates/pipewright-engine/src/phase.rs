//! The phase handler contract.

use std::collections::BTreeMap;

use async_trait::async_trait;
use pipewright_aws::CloudClients;
use pipewright_types::{PhaseContext, PhaseSpec, SecretQuestion, StageDeclaration};
use serde::de::DeserializeOwned;

use crate::error::{ProvisionError, Result};

/// One pluggable phase type. `check` and `secret_questions` must stay free
/// of cloud calls; `deploy` returns the stage this phase contributes to the
/// pipeline, `delete` tears down whatever `deploy` provisioned.
#[async_trait]
pub trait PhaseHandler: Send + Sync {
    fn phase_type(&self) -> &'static str;

    /// Validate the phase's own params. Returns human-readable problems,
    /// empty when the phase is deployable.
    fn check(&self, spec: &PhaseSpec) -> Vec<String>;

    /// Secrets this phase needs before deploy. Default: none.
    fn secret_questions(&self, spec: &PhaseSpec) -> Vec<SecretQuestion> {
        let _ = spec;
        Vec::new()
    }

    async fn deploy(&self, ctx: &PhaseContext, clients: &CloudClients)
        -> Result<StageDeclaration>;

    /// Returns true when something was deleted, false when there was
    /// nothing to do. Absent resources are not an error.
    async fn delete(&self, ctx: &PhaseContext, clients: &CloudClients) -> Result<bool>;
}

/// Deploys the `extra_resources` block of a build phase. The actual
/// resource engine is an external collaborator; it hands back the policy
/// statements and env vars the build role and project need.
#[async_trait]
pub trait ExtraResourceDeployer: Send + Sync {
    async fn deploy(
        &self,
        ctx: &PhaseContext,
        resources: &serde_json::Value,
    ) -> anyhow::Result<ExtraResourceOutputs>;

    async fn delete(&self, ctx: &PhaseContext) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct ExtraResourceOutputs {
    /// IAM statements to merge into the build phase role's policy.
    pub policy_statements: Vec<serde_json::Value>,
    /// Environment variables exposing the resources to the build.
    pub environment_variables: BTreeMap<String, String>,
}

/// Deserialize a phase's params into a typed config.
pub(crate) fn parse_params<T: DeserializeOwned>(ctx: &PhaseContext) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(ctx.params.clone())).map_err(|err| {
        ProvisionError::InvalidPhaseConfig {
            phase: ctx.phase_name.clone(),
            message: err.to_string(),
        }
    })
}

pub(crate) fn require_secret<'a>(ctx: &'a PhaseContext, key: &str) -> Result<&'a str> {
    ctx.secrets.get(key).ok_or_else(|| ProvisionError::MissingSecret {
        phase: ctx.phase_name.clone(),
        key: key.to_string(),
    })
}

pub(crate) fn question(spec: &PhaseSpec, key: &str, prompt: &str) -> SecretQuestion {
    SecretQuestion {
        phase_name: spec.name.clone(),
        key: key.to_string(),
        prompt: format!("'{}' phase - {prompt}", spec.name),
    }
}
