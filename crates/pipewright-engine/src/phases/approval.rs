//! Manual approval gate. Pure pipeline structure; no resources.

use async_trait::async_trait;
use pipewright_aws::CloudClients;
use pipewright_types::{ActionTypeId, PhaseContext, PhaseSpec, StageDeclaration};

use super::single_action_stage;
use crate::error::Result;
use crate::phase::PhaseHandler;

pub struct ApprovalPhase;

#[async_trait]
impl PhaseHandler for ApprovalPhase {
    fn phase_type(&self) -> &'static str {
        "approval"
    }

    fn check(&self, _spec: &PhaseSpec) -> Vec<String> {
        Vec::new()
    }

    async fn deploy(
        &self,
        ctx: &PhaseContext,
        _clients: &CloudClients,
    ) -> Result<StageDeclaration> {
        tracing::info!(phase = %ctx.phase_name, "Creating approval phase");
        Ok(single_action_stage(
            &ctx.phase_name,
            ActionTypeId::new("Approval", "AWS", "Manual"),
            vec![],
            vec![],
            vec![],
        ))
    }

    async fn delete(&self, ctx: &PhaseContext, _clients: &CloudClients) -> Result<bool> {
        tracing::info!(phase = %ctx.phase_name, "Nothing to delete for approval phase");
        Ok(false)
    }
}
