//! Service client traits and the bundle handed to the engine.
//!
//! Every `get_*` normalizes "does not exist" to `Ok(None)`; every `delete_*`
//! reports the raw service error and lets the caller decide whether absence
//! counts as success.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pipewright_types::{
    AwsResult, PipelineDeclaration, Policy, PolicyVersion, ProjectInput, Role,
};

use crate::locks::SingletonLocks;
use crate::memory::InMemoryCloud;
use crate::retry::RetryPolicy;

#[async_trait]
pub trait IamApi: Send + Sync {
    async fn get_role(&self, role_name: &str) -> AwsResult<Option<Role>>;
    async fn create_role(&self, role_name: &str, trust_policy: &str) -> AwsResult<Role>;
    async fn delete_role(&self, role_name: &str) -> AwsResult<()>;

    async fn get_policy(&self, policy_arn: &str) -> AwsResult<Option<Policy>>;
    async fn create_policy(&self, policy_name: &str, path: &str, document: &str)
        -> AwsResult<Policy>;
    async fn delete_policy(&self, policy_arn: &str) -> AwsResult<()>;

    /// Returns the decoded JSON document of one policy version.
    async fn get_policy_version_document(
        &self,
        policy_arn: &str,
        version_id: &str,
    ) -> AwsResult<String>;
    async fn create_policy_version(
        &self,
        policy_arn: &str,
        document: &str,
    ) -> AwsResult<PolicyVersion>;
    async fn list_policy_versions(&self, policy_arn: &str) -> AwsResult<Vec<PolicyVersion>>;
    async fn delete_policy_version(&self, policy_arn: &str, version_id: &str) -> AwsResult<()>;

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> AwsResult<()>;
    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> AwsResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildProject {
    pub name: String,
    pub service_role_arn: String,
}

#[async_trait]
pub trait CodeBuildApi: Send + Sync {
    async fn get_project(&self, name: &str) -> AwsResult<Option<BuildProject>>;
    async fn create_project(&self, project: &ProjectInput) -> AwsResult<()>;
    /// Full replace of the project definition.
    async fn update_project(&self, project: &ProjectInput) -> AwsResult<()>;
    async fn delete_project(&self, name: &str) -> AwsResult<()>;
}

/// What we need to know about an existing pipeline to decide create vs
/// update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub name: String,
    pub role_arn: String,
    pub stage_names: Vec<String>,
}

#[async_trait]
pub trait CodePipelineApi: Send + Sync {
    async fn get_pipeline(&self, name: &str) -> AwsResult<Option<PipelineSummary>>;
    async fn create_pipeline(&self, declaration: &PipelineDeclaration) -> AwsResult<()>;
    async fn update_pipeline(&self, declaration: &PipelineDeclaration) -> AwsResult<()>;
    async fn delete_pipeline(&self, name: &str) -> AwsResult<()>;
}

#[async_trait]
pub trait S3Api: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> AwsResult<bool>;
    async fn create_bucket(&self, bucket: &str, region: &str) -> AwsResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    pub name: String,
    pub status: String,
    pub outputs: BTreeMap<String, String>,
}

impl Stack {
    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(String::as_str)
    }
}

#[async_trait]
pub trait CloudFormationApi: Send + Sync {
    async fn get_stack(&self, name: &str) -> AwsResult<Option<Stack>>;
    async fn create_stack(
        &self,
        name: &str,
        template_body: &str,
        parameters: &[(String, String)],
    ) -> AwsResult<()>;
    async fn delete_stack(&self, name: &str) -> AwsResult<()>;
}

#[async_trait]
pub trait SsmApi: Send + Sync {
    async fn put_secure_parameter(
        &self,
        name: &str,
        value: &str,
        description: &str,
    ) -> AwsResult<()>;
    /// Missing names are ignored, matching the service behavior.
    async fn delete_parameters(&self, names: &[String]) -> AwsResult<()>;
}

/// The full client bundle the engine works with.
#[derive(Clone)]
pub struct CloudClients {
    pub iam: Arc<dyn IamApi>,
    pub codebuild: Arc<dyn CodeBuildApi>,
    pub codepipeline: Arc<dyn CodePipelineApi>,
    pub s3: Arc<dyn S3Api>,
    pub cloudformation: Arc<dyn CloudFormationApi>,
    pub ssm: Arc<dyn SsmApi>,
    /// Serializes provisioning of per-account singleton resources.
    pub locks: SingletonLocks,
    pub retry: RetryPolicy,
    /// Poll interval for CloudFormation stack status.
    pub stack_poll_interval: Duration,
}

impl CloudClients {
    /// Real clients from the ambient AWS credential chain.
    pub async fn from_env(region: &str) -> CloudClients {
        let config = crate::sdk::load_config(region).await;
        CloudClients {
            iam: Arc::new(crate::sdk::iam::SdkIam::new(&config)),
            codebuild: Arc::new(crate::sdk::codebuild::SdkCodeBuild::new(&config)),
            codepipeline: Arc::new(crate::sdk::codepipeline::SdkCodePipeline::new(&config)),
            s3: Arc::new(crate::sdk::s3::SdkS3::new(&config)),
            cloudformation: Arc::new(crate::sdk::cloudformation::SdkCloudFormation::new(&config)),
            ssm: Arc::new(crate::sdk::ssm::SdkSsm::new(&config)),
            locks: SingletonLocks::default(),
            retry: RetryPolicy::default(),
            stack_poll_interval: Duration::from_secs(10),
        }
    }

    /// In-memory double for tests: every service backed by the same
    /// [`InMemoryCloud`], with zero retry delays.
    pub fn in_memory() -> (CloudClients, Arc<InMemoryCloud>) {
        let cloud = Arc::new(InMemoryCloud::new());
        let clients = CloudClients {
            iam: cloud.clone(),
            codebuild: cloud.clone(),
            codepipeline: cloud.clone(),
            s3: cloud.clone(),
            cloudformation: cloud.clone(),
            ssm: cloud.clone(),
            locks: SingletonLocks::default(),
            retry: RetryPolicy {
                max_attempts: 4,
                base_delay: Duration::ZERO,
                max_delay: Duration::ZERO,
            },
            stack_poll_interval: Duration::ZERO,
        };
        (clients, cloud)
    }
}
