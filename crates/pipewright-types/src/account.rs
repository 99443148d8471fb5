use serde::{Deserialize, Serialize};

/// Target AWS account for a deploy or delete run, loaded from an account
/// config YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub account_id: String,
    pub region: String,
}

impl AccountConfig {
    /// Bucket holding pipeline artifacts and build caches for this account.
    pub fn artifact_bucket(&self) -> String {
        format!("codepipeline-{}-{}", self.region, self.account_id)
    }

    /// ECR registry hostname for this account.
    pub fn ecr_registry(&self) -> String {
        format!("{}.dkr.ecr.{}.amazonaws.com", self.account_id, self.region)
    }
}
