use std::path::Path;

use anyhow::Result;
use pipewright_aws::CloudClients;
use pipewright_engine::config::parser;
use pipewright_engine::lifecycle::{self, PipelineSecrets};
use pipewright_engine::result::PhaseStatus;
use pipewright_engine::PhaseRegistry;

use super::load_account;

/// Execute the `delete` command: remove the pipeline and every phase's
/// resources. Already-absent resources count as deleted.
pub async fn execute(file_path: &Path, account_path: &Path, pipeline: &str) -> Result<()> {
    let file = parser::parse_pipeline_file(file_path)?;
    let registry = PhaseRegistry::builtin(None);
    let account = load_account(account_path)?;
    tracing::info!(account = %account.account_id, pipeline, "Deleting pipeline");
    let clients = CloudClients::from_env(&account.region).await;

    let report = lifecycle::delete(
        &file,
        pipeline,
        &account,
        &PipelineSecrets::new(),
        &registry,
        &clients,
    )
    .await?;

    if report.pipeline_existed {
        println!("Deleted pipeline '{}'.", report.pipeline_name);
    } else {
        println!("Pipeline '{}' did not exist.", report.pipeline_name);
    }
    for phase in &report.phases {
        let status = match &phase.status {
            PhaseStatus::Completed => "OK".to_string(),
            PhaseStatus::Failed { error } => format!("FAILED - {error}"),
            PhaseStatus::Skipped => "SKIPPED".to_string(),
        };
        println!("  {:24} {}", format!("{} ({}):", phase.phase_name, phase.phase_type), status);
    }

    if !report.succeeded() {
        anyhow::bail!("One or more phases failed to delete");
    }
    Ok(())
}
