use async_trait::async_trait;
use aws_config::SdkConfig;
use percent_encoding::percent_decode_str;
use pipewright_types::{AwsError, AwsResult, Policy, PolicyVersion, Role};

use super::map_sdk_err;
use crate::client::IamApi;

pub struct SdkIam {
    client: aws_sdk_iam::Client,
}

impl SdkIam {
    pub fn new(config: &SdkConfig) -> Self {
        SdkIam {
            client: aws_sdk_iam::Client::new(config),
        }
    }
}

fn role_from_sdk(role: aws_sdk_iam::types::Role) -> Role {
    Role {
        name: role.role_name,
        arn: role.arn,
    }
}

/// Normalize a lookup error: not-found becomes `Ok(None)`.
fn optional<T>(result: Result<T, AwsError>) -> AwsResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

#[async_trait]
impl IamApi for SdkIam {
    async fn get_role(&self, role_name: &str) -> AwsResult<Option<Role>> {
        let result = self
            .client
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| map_sdk_err("get role", e))
            .and_then(|out| {
                out.role
                    .map(role_from_sdk)
                    .ok_or_else(|| AwsError::api("MalformedResponse", "GetRole returned no role"))
            });
        optional(result)
    }

    async fn create_role(&self, role_name: &str, trust_policy: &str) -> AwsResult<Role> {
        let out = self
            .client
            .create_role()
            .role_name(role_name)
            .assume_role_policy_document(trust_policy)
            .send()
            .await
            .map_err(|e| map_sdk_err("create role", e))?;
        out.role
            .map(role_from_sdk)
            .ok_or_else(|| AwsError::api("MalformedResponse", "CreateRole returned no role"))
    }

    async fn delete_role(&self, role_name: &str) -> AwsResult<()> {
        self.client
            .delete_role()
            .role_name(role_name)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("delete role", e))
    }

    async fn get_policy(&self, policy_arn: &str) -> AwsResult<Option<Policy>> {
        let result = self
            .client
            .get_policy()
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| map_sdk_err("get policy", e))
            .and_then(|out| {
                let policy = out
                    .policy
                    .ok_or_else(|| AwsError::api("MalformedResponse", "GetPolicy returned no policy"))?;
                Ok(Policy {
                    arn: policy.arn.unwrap_or_else(|| policy_arn.to_string()),
                    default_version_id: policy.default_version_id,
                })
            });
        optional(result)
    }

    async fn create_policy(
        &self,
        policy_name: &str,
        path: &str,
        document: &str,
    ) -> AwsResult<Policy> {
        let out = self
            .client
            .create_policy()
            .policy_name(policy_name)
            .path(path)
            .policy_document(document)
            .send()
            .await
            .map_err(|e| map_sdk_err("create policy", e))?;
        let policy = out
            .policy
            .ok_or_else(|| AwsError::api("MalformedResponse", "CreatePolicy returned no policy"))?;
        Ok(Policy {
            arn: policy
                .arn
                .ok_or_else(|| AwsError::api("MalformedResponse", "CreatePolicy returned no ARN"))?,
            default_version_id: policy.default_version_id,
        })
    }

    async fn delete_policy(&self, policy_arn: &str) -> AwsResult<()> {
        self.client
            .delete_policy()
            .policy_arn(policy_arn)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("delete policy", e))
    }

    async fn get_policy_version_document(
        &self,
        policy_arn: &str,
        version_id: &str,
    ) -> AwsResult<String> {
        let out = self
            .client
            .get_policy_version()
            .policy_arn(policy_arn)
            .version_id(version_id)
            .send()
            .await
            .map_err(|e| map_sdk_err("get policy version", e))?;
        let encoded = out
            .policy_version
            .and_then(|v| v.document)
            .ok_or_else(|| AwsError::api("MalformedResponse", "GetPolicyVersion returned no document"))?;
        // IAM returns the document URL-encoded.
        Ok(percent_decode_str(&encoded).decode_utf8_lossy().into_owned())
    }

    async fn create_policy_version(
        &self,
        policy_arn: &str,
        document: &str,
    ) -> AwsResult<PolicyVersion> {
        let out = self
            .client
            .create_policy_version()
            .policy_arn(policy_arn)
            .policy_document(document)
            .set_as_default(true)
            .send()
            .await
            .map_err(|e| map_sdk_err("create policy version", e))?;
        let version = out.policy_version.ok_or_else(|| {
            AwsError::api("MalformedResponse", "CreatePolicyVersion returned no version")
        })?;
        Ok(PolicyVersion {
            version_id: version.version_id.unwrap_or_default(),
            is_default: version.is_default_version,
        })
    }

    async fn list_policy_versions(&self, policy_arn: &str) -> AwsResult<Vec<PolicyVersion>> {
        let out = self
            .client
            .list_policy_versions()
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| map_sdk_err("list policy versions", e))?;
        Ok(out
            .versions
            .unwrap_or_default()
            .into_iter()
            .map(|v| PolicyVersion {
                version_id: v.version_id.unwrap_or_default(),
                is_default: v.is_default_version,
            })
            .collect())
    }

    async fn delete_policy_version(&self, policy_arn: &str, version_id: &str) -> AwsResult<()> {
        self.client
            .delete_policy_version()
            .policy_arn(policy_arn)
            .version_id(version_id)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("delete policy version", e))
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> AwsResult<()> {
        self.client
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("attach role policy", e))
    }

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> AwsResult<()> {
        self.client
            .detach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("detach role policy", e))
    }
}
