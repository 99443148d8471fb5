//! CodePipeline declaration shapes.
//!
//! These mirror the CodePipeline API structures (hence the camelCase serde
//! names) but stay SDK-independent so handlers and tests can build them
//! directly.

use serde::{Deserialize, Serialize};

/// Artifact emitted by the source stage and consumed by the build stage.
pub const SOURCE_OUTPUT: &str = "Output_Source";
/// Artifact emitted by the build stage and consumed by everything after it.
pub const BUILD_OUTPUT: &str = "Output_Build";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDeclaration {
    pub name: String,
    pub role_arn: String,
    pub artifact_store: ArtifactStore,
    pub stages: Vec<StageDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactStore {
    /// Always `S3`.
    #[serde(rename = "type")]
    pub store_type: String,
    pub location: String,
}

impl ArtifactStore {
    pub fn s3(bucket: impl Into<String>) -> Self {
        ArtifactStore {
            store_type: "S3".to_string(),
            location: bucket.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDeclaration {
    pub name: String,
    pub actions: Vec<ActionDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDeclaration {
    pub name: String,
    pub action_type_id: ActionTypeId,
    #[serde(default)]
    pub input_artifacts: Vec<String>,
    #[serde(default)]
    pub output_artifacts: Vec<String>,
    /// Provider-specific key/value configuration (keys are the provider's
    /// PascalCase names, e.g. `ProjectName`).
    #[serde(default)]
    pub configuration: Vec<(String, String)>,
    pub run_order: u32,
}

impl ActionDeclaration {
    pub fn configuration_value(&self, key: &str) -> Option<&str> {
        self.configuration
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTypeId {
    pub category: String,
    pub owner: String,
    pub provider: String,
    pub version: String,
}

impl ActionTypeId {
    pub fn new(category: &str, owner: &str, provider: &str) -> Self {
        ActionTypeId {
            category: category.to_string(),
            owner: owner.to_string(),
            provider: provider.to_string(),
            version: "1".to_string(),
        }
    }
}

/// What `ensure_pipeline` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineAction {
    Created,
    Updated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_configuration_lookup() {
        let action = ActionDeclaration {
            name: "Build".to_string(),
            action_type_id: ActionTypeId::new("Build", "AWS", "CodeBuild"),
            input_artifacts: vec![SOURCE_OUTPUT.to_string()],
            output_artifacts: vec![BUILD_OUTPUT.to_string()],
            configuration: vec![("ProjectName".to_string(), "app-main-Build".to_string())],
            run_order: 1,
        };
        assert_eq!(action.configuration_value("ProjectName"), Some("app-main-Build"));
        assert_eq!(action.configuration_value("Missing"), None);
    }

    #[test]
    fn test_declaration_serializes_camel_case() {
        let decl = PipelineDeclaration {
            name: "app-main".to_string(),
            role_arn: "arn:aws:iam::111122223333:role/PipewrightServiceRole".to_string(),
            artifact_store: ArtifactStore::s3("codepipeline-us-west-2-111122223333"),
            stages: vec![],
        };
        let json = serde_json::to_value(&decl).unwrap();
        assert!(json.get("roleArn").is_some());
        assert_eq!(json["artifactStore"]["type"], "S3");
    }
}
