//! The lifecycle orchestrator: check, deploy, and delete.
//!
//! Within one pipeline, phases deploy strictly in order. Across pipelines,
//! deploys fan out concurrently; the per-account singleton locks inside the
//! shared role provisioning keep that safe.

use std::collections::BTreeMap;
use std::sync::Arc;

use pipewright_aws::{codepipeline, s3, CloudClients};
use pipewright_types::{
    AccountConfig, PhaseContext, PhaseSecrets, PipelineFile, SecretQuestion,
};
use tokio::task::JoinSet;

use crate::assembler;
use crate::common;
use crate::config::validator;
use crate::error::{ProvisionError, Result};
use crate::naming;
use crate::phase::PhaseHandler;
use crate::registry::PhaseRegistry;
use crate::result::{CheckReport, DeleteReport, DeployReport, PhaseOutcome, PhaseStatus};

/// Secrets for one pipeline, keyed by phase name.
pub type PipelineSecrets = BTreeMap<String, PhaseSecrets>;

/// Validate the file and every phase's params. Makes no cloud calls.
pub fn check(file: &PipelineFile, registry: &PhaseRegistry) -> CheckReport {
    let mut report = CheckReport {
        structural_errors: validator::validate_pipeline_file(file),
        ..CheckReport::default()
    };

    for (pipeline_name, def) in &file.pipelines {
        let mut errors = Vec::new();
        for spec in &def.phases {
            match registry.get(&spec.phase_type) {
                Some(handler) => errors.extend(handler.check(spec)),
                None => errors.push(format!(
                    "Phase '{}' - unknown phase type '{}'",
                    spec.name, spec.phase_type
                )),
            }
        }
        report.pipeline_errors.insert(pipeline_name.clone(), errors);
    }

    report
}

/// Every secret the named pipeline's phases need.
pub fn secret_questions(
    file: &PipelineFile,
    registry: &PhaseRegistry,
    pipeline_name: &str,
) -> Result<Vec<SecretQuestion>> {
    let def = file
        .pipelines
        .get(pipeline_name)
        .ok_or_else(|| ProvisionError::UnknownPipeline(pipeline_name.to_string()))?;

    let mut questions = Vec::new();
    for spec in &def.phases {
        let handler = registry
            .get(&spec.phase_type)
            .ok_or_else(|| ProvisionError::UnknownPhaseType(spec.phase_type.clone()))?;
        questions.extend(handler.secret_questions(spec));
    }
    Ok(questions)
}

fn phase_context(
    file: &PipelineFile,
    pipeline_name: &str,
    spec: &pipewright_types::PhaseSpec,
    account: &AccountConfig,
    secrets: &PipelineSecrets,
) -> PhaseContext {
    PhaseContext {
        app_name: file.name.clone(),
        pipeline_name: pipeline_name.to_string(),
        phase_name: spec.name.clone(),
        phase_type: spec.phase_type.clone(),
        account: account.clone(),
        params: spec.params.clone(),
        secrets: secrets.get(&spec.name).cloned().unwrap_or_default(),
        artifact_bucket: account.artifact_bucket(),
    }
}

/// Resolve every phase's handler up front so an unknown type aborts before
/// any resource is touched.
fn resolve_handlers<'r>(
    registry: &'r PhaseRegistry,
    def: &pipewright_types::PipelineDef,
) -> Result<Vec<&'r Arc<dyn PhaseHandler>>> {
    def.phases
        .iter()
        .map(|spec| {
            registry
                .get(&spec.phase_type)
                .ok_or_else(|| ProvisionError::UnknownPhaseType(spec.phase_type.clone()))
        })
        .collect()
}

/// Structural gate run by `deploy` and `delete`: a malformed definition is
/// rejected before any cloud call.
fn validated_def<'f>(
    file: &'f PipelineFile,
    pipeline_name: &str,
) -> Result<&'f pipewright_types::PipelineDef> {
    let def = file
        .pipelines
        .get(pipeline_name)
        .ok_or_else(|| ProvisionError::UnknownPipeline(pipeline_name.to_string()))?;
    let errors = validator::validate_pipeline_def(pipeline_name, def);
    if !errors.is_empty() {
        return Err(ProvisionError::InvalidPipeline {
            pipeline: pipeline_name.to_string(),
            errors,
        });
    }
    Ok(def)
}

/// Deploy one pipeline: phases in order, then the pipeline itself.
///
/// A phase failure stops the run, marks the remaining phases skipped, and
/// leaves already-provisioned resources in place; the report says exactly
/// how far the run got.
pub async fn deploy(
    file: &PipelineFile,
    pipeline_name: &str,
    account: &AccountConfig,
    secrets: &PipelineSecrets,
    registry: &PhaseRegistry,
    clients: &CloudClients,
) -> Result<DeployReport> {
    let def = validated_def(file, pipeline_name)?;
    let handlers = resolve_handlers(registry, def)?;

    let bucket = account.artifact_bucket();
    s3::ensure_bucket(clients.s3.as_ref(), &bucket, &account.region).await?;

    let mut outcomes = Vec::with_capacity(def.phases.len());
    let mut stages = Vec::with_capacity(def.phases.len());
    let mut failed = false;

    for (spec, handler) in def.phases.iter().zip(&handlers) {
        if failed {
            outcomes.push(PhaseOutcome {
                phase_name: spec.name.clone(),
                phase_type: spec.phase_type.clone(),
                status: PhaseStatus::Skipped,
            });
            continue;
        }

        let ctx = phase_context(file, pipeline_name, spec, account, secrets);
        tracing::info!(pipeline = pipeline_name, phase = %spec.name, "Deploying phase");
        match handler.deploy(&ctx, clients).await {
            Ok(stage) => {
                stages.push(stage);
                outcomes.push(PhaseOutcome {
                    phase_name: spec.name.clone(),
                    phase_type: spec.phase_type.clone(),
                    status: PhaseStatus::Completed,
                });
            }
            Err(err) => {
                tracing::error!(pipeline = pipeline_name, phase = %spec.name, error = %err, "Phase deploy failed");
                outcomes.push(PhaseOutcome {
                    phase_name: spec.name.clone(),
                    phase_type: spec.phase_type.clone(),
                    status: PhaseStatus::Failed {
                        error: err.to_string(),
                    },
                });
                failed = true;
            }
        }
    }

    if failed {
        return Ok(DeployReport {
            pipeline_name: pipeline_name.to_string(),
            phases: outcomes,
            pipeline_action: None,
        });
    }

    let chain_errors = assembler::validate_artifact_chain(&stages);
    if !chain_errors.is_empty() {
        return Err(ProvisionError::Infrastructure(anyhow::anyhow!(
            "Stage artifact contract violated:\n  - {}",
            chain_errors.join("\n  - ")
        )));
    }

    let service_role = common::ensure_service_role(clients, account).await?;
    let declaration = assembler::assemble(
        &naming::pipeline(&file.name, pipeline_name),
        &bucket,
        &service_role.arn,
        stages,
    );
    let action =
        codepipeline::ensure_pipeline(clients.codepipeline.as_ref(), &clients.retry, &declaration)
            .await?;

    tracing::info!(pipeline = pipeline_name, account = %account.account_id, "Finished deploying pipeline");
    Ok(DeployReport {
        pipeline_name: pipeline_name.to_string(),
        phases: outcomes,
        pipeline_action: Some(action),
    })
}

/// Deploy every pipeline in the file concurrently.
pub async fn deploy_all(
    file: Arc<PipelineFile>,
    account: AccountConfig,
    secrets: BTreeMap<String, PipelineSecrets>,
    registry: Arc<PhaseRegistry>,
    clients: CloudClients,
) -> Result<Vec<DeployReport>> {
    let mut tasks = JoinSet::new();
    for pipeline_name in file.pipelines.keys().cloned() {
        let file = file.clone();
        let account = account.clone();
        let pipeline_secrets = secrets.get(&pipeline_name).cloned().unwrap_or_default();
        let registry = registry.clone();
        let clients = clients.clone();
        tasks.spawn(async move {
            deploy(&file, &pipeline_name, &account, &pipeline_secrets, &registry, &clients).await
        });
    }

    let mut reports = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let report = joined.map_err(|err| {
            ProvisionError::Infrastructure(anyhow::anyhow!("deploy task panicked: {err}"))
        })??;
        reports.push(report);
    }
    reports.sort_by(|a, b| a.pipeline_name.cmp(&b.pipeline_name));
    Ok(reports)
}

/// Delete one pipeline and each phase's resources. Every phase is
/// attempted even when an earlier one fails; absent resources count as
/// already deleted.
pub async fn delete(
    file: &PipelineFile,
    pipeline_name: &str,
    account: &AccountConfig,
    secrets: &PipelineSecrets,
    registry: &PhaseRegistry,
    clients: &CloudClients,
) -> Result<DeleteReport> {
    let def = validated_def(file, pipeline_name)?;
    let handlers = resolve_handlers(registry, def)?;

    let pipeline_existed = codepipeline::delete_pipeline(
        clients.codepipeline.as_ref(),
        &naming::pipeline(&file.name, pipeline_name),
    )
    .await?;

    let mut outcomes = Vec::with_capacity(def.phases.len());
    for (spec, handler) in def.phases.iter().zip(&handlers) {
        let ctx = phase_context(file, pipeline_name, spec, account, secrets);
        tracing::info!(pipeline = pipeline_name, phase = %spec.name, "Deleting phase resources");
        let status = match handler.delete(&ctx, clients).await {
            Ok(_) => PhaseStatus::Completed,
            Err(err) => {
                tracing::error!(pipeline = pipeline_name, phase = %spec.name, error = %err, "Phase delete failed");
                PhaseStatus::Failed {
                    error: err.to_string(),
                }
            }
        };
        outcomes.push(PhaseOutcome {
            phase_name: spec.name.clone(),
            phase_type: spec.phase_type.clone(),
            status,
        });
    }

    Ok(DeleteReport {
        pipeline_name: pipeline_name.to_string(),
        pipeline_existed,
        phases: outcomes,
    })
}
