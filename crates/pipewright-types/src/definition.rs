//! The pipeline definition file: an app name plus named pipelines, each an
//! ordered list of phases.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Parsed `pipewright.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineFile {
    pub version: u32,
    /// App name, used as the prefix for every provisioned resource.
    pub name: String,
    pub pipelines: BTreeMap<String, PipelineDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDef {
    pub phases: Vec<PhaseSpec>,
}

/// One phase entry. `type` selects the handler; everything beyond `type` and
/// `name` is handler-specific and captured as free-form params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSpec {
    #[serde(rename = "type", default)]
    pub phase_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl PhaseSpec {
    /// Fetch a string param, treating non-strings as absent.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(serde_json::Value::as_str)
    }

    pub fn bool_param(&self, key: &str) -> Option<bool> {
        self.params.get(key).and_then(serde_json::Value::as_bool)
    }
}
