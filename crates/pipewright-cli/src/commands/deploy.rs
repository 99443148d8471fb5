use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use pipewright_aws::CloudClients;
use pipewright_engine::config::parser;
use pipewright_engine::{lifecycle, PhaseRegistry};

use super::{load_account, print_deploy_report};
use crate::secrets;

/// Execute the `deploy` command against one pipeline or the whole file.
pub async fn execute(
    file_path: &Path,
    account_path: &Path,
    pipeline: Option<&str>,
    secret_flags: &[String],
) -> Result<()> {
    let file = parser::parse_pipeline_file(file_path)?;
    let registry = PhaseRegistry::builtin(None);

    let check = lifecycle::check(&file, &registry);
    if !check.is_ok() {
        for error in &check.structural_errors {
            println!("  - {error}");
        }
        for (name, errors) in &check.pipeline_errors {
            for error in errors {
                println!("  - [{name}] {error}");
            }
        }
        anyhow::bail!("Pipeline file has errors; nothing was deployed");
    }

    let flags = secret_flags
        .iter()
        .map(|flag| secrets::parse_flag(flag))
        .collect::<Result<Vec<_>>>()?;

    let account = load_account(account_path)?;
    tracing::info!(account = %account.account_id, region = %account.region, "Deploying to account");
    let clients = CloudClients::from_env(&account.region).await;

    let reports = match pipeline {
        Some(name) => {
            let questions = lifecycle::secret_questions(&file, &registry, name)?;
            let pipeline_secrets = secrets::resolve(&questions, &flags)?;
            vec![
                lifecycle::deploy(&file, name, &account, &pipeline_secrets, &registry, &clients)
                    .await?,
            ]
        }
        None => {
            let mut all_secrets = BTreeMap::new();
            for name in file.pipelines.keys() {
                let questions = lifecycle::secret_questions(&file, &registry, name)?;
                all_secrets.insert(name.clone(), secrets::resolve(&questions, &flags)?);
            }
            lifecycle::deploy_all(
                Arc::new(file),
                account,
                all_secrets,
                Arc::new(registry),
                clients,
            )
            .await?
        }
    };

    let mut failed = false;
    for report in &reports {
        print_deploy_report(report);
        failed |= !report.succeeded();
    }
    if failed {
        anyhow::bail!("One or more pipelines failed to deploy");
    }
    Ok(())
}
