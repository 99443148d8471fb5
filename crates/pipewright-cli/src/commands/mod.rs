pub mod check;
pub mod delete;
pub mod deploy;
pub mod list_secrets;

use std::path::Path;

use anyhow::{Context, Result};
use pipewright_engine::result::{DeployReport, PhaseStatus};
use pipewright_types::AccountConfig;

/// Load the target account from its config YAML.
pub fn load_account(path: &Path) -> Result<AccountConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read account config: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse account config: {}", path.display()))
}

pub fn print_deploy_report(report: &DeployReport) {
    println!("Pipeline '{}':", report.pipeline_name);
    for phase in &report.phases {
        let status = match &phase.status {
            PhaseStatus::Completed => "OK".to_string(),
            PhaseStatus::Failed { error } => format!("FAILED - {error}"),
            PhaseStatus::Skipped => "SKIPPED".to_string(),
        };
        println!("  {:24} {}", format!("{} ({}):", phase.phase_name, phase.phase_type), status);
    }
    match report.pipeline_action {
        Some(action) => println!("  pipeline:                {action:?}"),
        None => println!("  pipeline:                not touched"),
    }
}
