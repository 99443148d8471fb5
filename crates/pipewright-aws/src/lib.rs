//! Cloud resource clients for pipewright.
//!
//! The service surface is a set of narrow async traits ([`client`]) with two
//! implementations: the real aws-sdk adapters ([`sdk`]) and an in-memory
//! double for tests ([`memory`]). The idempotent resource managers
//! ([`iam`], [`codebuild`], [`codepipeline`], [`s3`], [`cloudformation`])
//! are written against the traits only.

pub mod client;
pub mod cloudformation;
pub mod codebuild;
pub mod codepipeline;
pub mod iam;
pub mod locks;
pub mod memory;
pub mod retry;
pub mod s3;
pub mod sdk;
pub mod ssm;

pub use client::{
    BuildProject, CloudClients, CloudFormationApi, CodeBuildApi, CodePipelineApi, IamApi,
    PipelineSummary, S3Api, SsmApi, Stack,
};
pub use locks::SingletonLocks;
pub use memory::InMemoryCloud;
pub use retry::RetryPolicy;
