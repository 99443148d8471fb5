//! Per-phase deployment context and the secrets container.

use std::collections::BTreeMap;
use std::fmt;

use crate::account::AccountConfig;

/// Everything a phase handler needs to deploy or delete one phase of one
/// pipeline. Built fresh for every handler invocation.
#[derive(Debug, Clone)]
pub struct PhaseContext {
    pub app_name: String,
    pub pipeline_name: String,
    pub phase_name: String,
    pub phase_type: String,
    pub account: AccountConfig,
    pub params: serde_json::Map<String, serde_json::Value>,
    pub secrets: PhaseSecrets,
    /// Bucket holding pipeline artifacts for the target account.
    pub artifact_bucket: String,
}

impl PhaseContext {
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(serde_json::Value::as_str)
    }

    pub fn bool_param(&self, key: &str) -> Option<bool> {
        self.params.get(key).and_then(serde_json::Value::as_bool)
    }
}

/// A secret a phase needs before it can be deployed. The CLI resolves these
/// from flags or the environment; values never appear in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretQuestion {
    pub phase_name: String,
    pub key: String,
    pub prompt: String,
}

/// Secret values for one phase. The `Debug` impl redacts values so contexts
/// can be logged without leaking credentials.
#[derive(Clone, Default)]
pub struct PhaseSecrets(BTreeMap<String, String>);

impl PhaseSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Debug for PhaseSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for key in self.0.keys() {
            map.entry(key, &"<redacted>");
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_debug_redacts_values() {
        let mut secrets = PhaseSecrets::new();
        secrets.insert("access_token", "hunter2");
        let rendered = format!("{secrets:?}");
        assert!(rendered.contains("access_token"));
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_secrets_lookup() {
        let mut secrets = PhaseSecrets::new();
        secrets.insert("webhook_url", "https://hooks.example.com/x");
        assert_eq!(secrets.get("webhook_url"), Some("https://hooks.example.com/x"));
        assert_eq!(secrets.get("other"), None);
    }
}
