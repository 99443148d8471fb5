//! IAM and CodeBuild resource shapes shared by the cloud client traits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::account::AccountConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub arn: String,
    pub default_version_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyVersion {
    pub version_id: String,
    pub is_default: bool,
}

/// What a phase wants its CodeBuild project to look like. The project
/// manager resolves this into a [`ProjectInput`] by injecting the standard
/// environment variables and rewriting account-relative images.
#[derive(Debug, Clone)]
pub struct ProjectSettings {
    pub project_name: String,
    pub app_name: String,
    pub pipeline_name: String,
    pub phase_name: String,
    pub account: AccountConfig,
    /// Build image; a leading `<account>` is replaced with the account's ECR
    /// registry and the project runs privileged.
    pub image: String,
    /// User-supplied environment variables. These win over injected ones.
    pub environment_variables: BTreeMap<String, String>,
    pub service_role_arn: String,
    pub build_spec: Option<String>,
    /// S3 cache location (`bucket/path`), if build caching is enabled.
    pub cache_location: Option<String>,
}

/// Fully resolved project definition, as handed to the CodeBuild client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInput {
    pub name: String,
    pub description: String,
    pub image: String,
    pub privileged: bool,
    /// Final ordered env var list, injected vars first.
    pub environment_variables: Vec<(String, String)>,
    pub service_role_arn: String,
    pub build_spec: Option<String>,
    pub cache_location: Option<String>,
    pub tags: Vec<(String, String)>,
}
