//! Deterministic names for everything pipewright provisions.
//!
//! All naming decisions live here and get passed explicitly into the cloud
//! layer, so two handlers can never disagree about what a resource is
//! called.

use pipewright_types::AccountConfig;

/// Singleton CodePipeline service role, shared by every pipeline in an
/// account.
pub const SERVICE_ROLE: &str = "PipewrightServiceRole";
/// Singleton deploy role assumed by deployment build phases.
pub const DEPLOY_PHASE_ROLE: &str = "PipewrightDeployPhase";
/// Singleton role assumed by environment-teardown build phases.
pub const DELETE_PHASE_ROLE: &str = "PipewrightDeletePhase";
/// Singleton role for the pipeline-invoked Lambda functions.
pub const LAMBDA_ROLE: &str = "PipewrightLambdaRole";

/// Singleton Lambda stacks backing the Invoke phases.
pub const RUNSCOPE_STACK: &str = "PipewrightRunscopeLambda";
pub const SLACK_NOTIFY_STACK: &str = "PipewrightSlackNotifyLambda";

pub fn pipeline(app: &str, pipeline: &str) -> String {
    format!("{app}-{pipeline}")
}

pub fn project(app: &str, pipeline: &str, phase: &str) -> String {
    format!("{app}-{pipeline}-{phase}")
}

pub fn build_phase_role(app: &str) -> String {
    format!("{app}-PipewrightBuildPhase")
}

pub fn npm_phase_role(app: &str) -> String {
    format!("{app}-PipewrightNpmPhase")
}

pub fn pypi_phase_role(app: &str) -> String {
    format!("{app}-PipewrightPypiPhase")
}

pub fn cloudformation_role(app: &str) -> String {
    format!("{app}-PipewrightCloudFormation")
}

/// S3 location for a phase's build cache.
pub fn cache_location(bucket: &str, app: &str, pipeline: &str, phase: &str) -> String {
    format!("{bucket}/caches/{app}/{pipeline}/{phase}/codeBuildCache")
}

/// Parameter Store name for a phase secret.
pub fn ssm_parameter(app: &str, pipeline: &str, key: &str) -> String {
    format!("{app}.{pipeline}.{key}")
}

/// ARN prefix matching every parameter this app/pipeline pair owns.
pub fn ssm_parameter_arn_prefix(account: &AccountConfig, app: &str) -> String {
    format!(
        "arn:aws:ssm:{}:{}:parameter/{app}.*",
        account.region, account.account_id
    )
}

/// Lock key for a per-account singleton resource.
pub fn singleton_lock_key(resource: &str, account: &AccountConfig) -> String {
    format!("{resource}@{}", account.account_id)
}
