//! Shared data model for the pipewright workspace: pipeline definitions,
//! phase contexts, CodePipeline stage declarations, and the cloud error type.

pub mod account;
pub mod context;
pub mod definition;
pub mod error;
pub mod project;
pub mod stage;

pub use account::AccountConfig;
pub use context::{PhaseContext, PhaseSecrets, SecretQuestion};
pub use definition::{PhaseSpec, PipelineDef, PipelineFile};
pub use error::{AwsError, AwsResult};
pub use project::{Policy, PolicyVersion, ProjectInput, ProjectSettings, Role};
pub use stage::{
    ActionDeclaration, ActionTypeId, ArtifactStore, PipelineAction, PipelineDeclaration,
    StageDeclaration, BUILD_OUTPUT, SOURCE_OUTPUT,
};
