//! In-memory implementation of every service trait, for tests.
//!
//! One [`InMemoryCloud`] backs all six services so cross-service flows (role
//! created here, project referencing it there) can be asserted end to end.
//! Call counts and injectable failures make idempotence and retry behavior
//! observable.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use pipewright_types::{
    AwsError, AwsResult, PipelineDeclaration, Policy, PolicyVersion, ProjectInput, Role,
};

use crate::client::{
    BuildProject, CloudFormationApi, CodeBuildApi, CodePipelineApi, IamApi, PipelineSummary,
    S3Api, SsmApi, Stack,
};

const ACCOUNT_ID: &str = "111122223333";

#[derive(Debug, Clone)]
struct StoredPolicy {
    /// (version id, document, is default)
    versions: Vec<(String, String, bool)>,
    next_version: u32,
}

struct InjectedFailure {
    code: String,
    remaining: usize,
}

#[derive(Default)]
struct State {
    roles: BTreeMap<String, Role>,
    trust_policies: BTreeMap<String, String>,
    policies: BTreeMap<String, StoredPolicy>,
    attachments: BTreeMap<String, BTreeSet<String>>,
    projects: BTreeMap<String, ProjectInput>,
    pipelines: BTreeMap<String, PipelineDeclaration>,
    buckets: BTreeSet<String>,
    stacks: BTreeMap<String, Stack>,
    parameters: BTreeMap<String, String>,
    calls: BTreeMap<&'static str, usize>,
    failures: BTreeMap<String, InjectedFailure>,
}

#[derive(Default)]
pub struct InMemoryCloud {
    state: Mutex<State>,
}

impl InMemoryCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` calls to `op` fail with the given error code.
    pub fn inject_failures(&self, op: &str, code: &str, times: usize) {
        let mut state = self.lock();
        state.failures.insert(
            op.to_string(),
            InjectedFailure {
                code: code.to_string(),
                remaining: times,
            },
        );
    }

    /// How many times a mutating operation has been called.
    pub fn calls(&self, op: &str) -> usize {
        *self.lock().calls.get(op).unwrap_or(&0)
    }

    pub fn role(&self, name: &str) -> Option<Role> {
        self.lock().roles.get(name).cloned()
    }

    pub fn attached_policies(&self, role_name: &str) -> Vec<String> {
        self.lock()
            .attachments
            .get(role_name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn policy_version_count(&self, arn: &str) -> usize {
        self.lock().policies.get(arn).map_or(0, |p| p.versions.len())
    }

    pub fn default_policy_document(&self, arn: &str) -> Option<String> {
        self.lock().policies.get(arn).and_then(|p| {
            p.versions
                .iter()
                .find(|(_, _, is_default)| *is_default)
                .map(|(_, doc, _)| doc.clone())
        })
    }

    pub fn project(&self, name: &str) -> Option<ProjectInput> {
        self.lock().projects.get(name).cloned()
    }

    pub fn pipeline(&self, name: &str) -> Option<PipelineDeclaration> {
        self.lock().pipelines.get(name).cloned()
    }

    pub fn has_bucket(&self, name: &str) -> bool {
        self.lock().buckets.contains(name)
    }

    pub fn stack(&self, name: &str) -> Option<Stack> {
        self.lock().stacks.get(name).cloned()
    }

    pub fn parameter(&self, name: &str) -> Option<String> {
        self.lock().parameters.get(name).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the call and surface any injected failure.
    fn enter(&self, op: &'static str) -> AwsResult<MutexGuard<'_, State>> {
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        if let Some(failure) = state.failures.get_mut(op) {
            if failure.remaining > 0 {
                failure.remaining -= 1;
                let code = failure.code.clone();
                return Err(AwsError::api(code, format!("injected failure for {op}")));
            }
        }
        Ok(state)
    }
}

#[async_trait]
impl IamApi for InMemoryCloud {
    async fn get_role(&self, role_name: &str) -> AwsResult<Option<Role>> {
        Ok(self.enter("get_role")?.roles.get(role_name).cloned())
    }

    async fn create_role(&self, role_name: &str, trust_policy: &str) -> AwsResult<Role> {
        let mut state = self.enter("create_role")?;
        if state.roles.contains_key(role_name) {
            return Err(AwsError::api("EntityAlreadyExists", format!("role {role_name} exists")));
        }
        let role = Role {
            name: role_name.to_string(),
            arn: format!("arn:aws:iam::{ACCOUNT_ID}:role/{role_name}"),
        };
        state.roles.insert(role_name.to_string(), role.clone());
        state
            .trust_policies
            .insert(role_name.to_string(), trust_policy.to_string());
        Ok(role)
    }

    async fn delete_role(&self, role_name: &str) -> AwsResult<()> {
        let mut state = self.enter("delete_role")?;
        if state.attachments.get(role_name).is_some_and(|a| !a.is_empty()) {
            return Err(AwsError::api("DeleteConflict", "role still has attached policies"));
        }
        if state.roles.remove(role_name).is_none() {
            return Err(AwsError::api("NoSuchEntity", format!("role {role_name} not found")));
        }
        state.trust_policies.remove(role_name);
        Ok(())
    }

    async fn get_policy(&self, policy_arn: &str) -> AwsResult<Option<Policy>> {
        let state = self.enter("get_policy")?;
        Ok(state.policies.get(policy_arn).map(|stored| Policy {
            arn: policy_arn.to_string(),
            default_version_id: stored
                .versions
                .iter()
                .find(|(_, _, is_default)| *is_default)
                .map(|(id, _, _)| id.clone()),
        }))
    }

    async fn create_policy(
        &self,
        policy_name: &str,
        path: &str,
        document: &str,
    ) -> AwsResult<Policy> {
        let mut state = self.enter("create_policy")?;
        let arn = format!("arn:aws:iam::{ACCOUNT_ID}:policy{path}{policy_name}");
        if state.policies.contains_key(&arn) {
            return Err(AwsError::api("EntityAlreadyExists", format!("policy {arn} exists")));
        }
        state.policies.insert(
            arn.clone(),
            StoredPolicy {
                versions: vec![("v1".to_string(), document.to_string(), true)],
                next_version: 2,
            },
        );
        Ok(Policy {
            arn,
            default_version_id: Some("v1".to_string()),
        })
    }

    async fn delete_policy(&self, policy_arn: &str) -> AwsResult<()> {
        let mut state = self.enter("delete_policy")?;
        match state.policies.get(policy_arn) {
            None => Err(AwsError::api("NoSuchEntity", format!("policy {policy_arn} not found"))),
            Some(stored) if stored.versions.len() > 1 => Err(AwsError::api(
                "DeleteConflict",
                "policy still has non-default versions",
            )),
            Some(_) => {
                state.policies.remove(policy_arn);
                Ok(())
            }
        }
    }

    async fn get_policy_version_document(
        &self,
        policy_arn: &str,
        version_id: &str,
    ) -> AwsResult<String> {
        let state = self.enter("get_policy_version")?;
        let stored = state
            .policies
            .get(policy_arn)
            .ok_or_else(|| AwsError::api("NoSuchEntity", format!("policy {policy_arn} not found")))?;
        stored
            .versions
            .iter()
            .find(|(id, _, _)| id == version_id)
            .map(|(_, doc, _)| doc.clone())
            .ok_or_else(|| AwsError::api("NoSuchEntity", format!("version {version_id} not found")))
    }

    async fn create_policy_version(
        &self,
        policy_arn: &str,
        document: &str,
    ) -> AwsResult<PolicyVersion> {
        let mut state = self.enter("create_policy_version")?;
        let stored = state
            .policies
            .get_mut(policy_arn)
            .ok_or_else(|| AwsError::api("NoSuchEntity", format!("policy {policy_arn} not found")))?;
        if stored.versions.len() >= 5 {
            return Err(AwsError::api("LimitExceeded", "policy already has five versions"));
        }
        let version_id = format!("v{}", stored.next_version);
        stored.next_version += 1;
        for version in &mut stored.versions {
            version.2 = false;
        }
        stored
            .versions
            .push((version_id.clone(), document.to_string(), true));
        Ok(PolicyVersion {
            version_id,
            is_default: true,
        })
    }

    async fn list_policy_versions(&self, policy_arn: &str) -> AwsResult<Vec<PolicyVersion>> {
        let state = self.enter("list_policy_versions")?;
        let stored = state
            .policies
            .get(policy_arn)
            .ok_or_else(|| AwsError::api("NoSuchEntity", format!("policy {policy_arn} not found")))?;
        Ok(stored
            .versions
            .iter()
            .map(|(id, _, is_default)| PolicyVersion {
                version_id: id.clone(),
                is_default: *is_default,
            })
            .collect())
    }

    async fn delete_policy_version(&self, policy_arn: &str, version_id: &str) -> AwsResult<()> {
        let mut state = self.enter("delete_policy_version")?;
        let stored = state
            .policies
            .get_mut(policy_arn)
            .ok_or_else(|| AwsError::api("NoSuchEntity", format!("policy {policy_arn} not found")))?;
        let before = stored.versions.len();
        stored.versions.retain(|(id, _, _)| id != version_id);
        if stored.versions.len() == before {
            return Err(AwsError::api("NoSuchEntity", format!("version {version_id} not found")));
        }
        Ok(())
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> AwsResult<()> {
        let mut state = self.enter("attach_role_policy")?;
        if !state.roles.contains_key(role_name) {
            return Err(AwsError::api("NoSuchEntity", format!("role {role_name} not found")));
        }
        state
            .attachments
            .entry(role_name.to_string())
            .or_default()
            .insert(policy_arn.to_string());
        Ok(())
    }

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> AwsResult<()> {
        let mut state = self.enter("detach_role_policy")?;
        let removed = state
            .attachments
            .get_mut(role_name)
            .is_some_and(|set| set.remove(policy_arn));
        if !removed {
            return Err(AwsError::api("NoSuchEntity", "attachment not found"));
        }
        Ok(())
    }
}

#[async_trait]
impl CodeBuildApi for InMemoryCloud {
    async fn get_project(&self, name: &str) -> AwsResult<Option<BuildProject>> {
        let state = self.enter("get_project")?;
        Ok(state.projects.get(name).map(|p| BuildProject {
            name: p.name.clone(),
            service_role_arn: p.service_role_arn.clone(),
        }))
    }

    async fn create_project(&self, project: &ProjectInput) -> AwsResult<()> {
        let mut state = self.enter("create_project")?;
        if state.projects.contains_key(&project.name) {
            return Err(AwsError::api(
                "ResourceAlreadyExistsException",
                format!("project {} exists", project.name),
            ));
        }
        state.projects.insert(project.name.clone(), project.clone());
        Ok(())
    }

    async fn update_project(&self, project: &ProjectInput) -> AwsResult<()> {
        let mut state = self.enter("update_project")?;
        if !state.projects.contains_key(&project.name) {
            return Err(AwsError::api(
                "ResourceNotFoundException",
                format!("project {} not found", project.name),
            ));
        }
        state.projects.insert(project.name.clone(), project.clone());
        Ok(())
    }

    async fn delete_project(&self, name: &str) -> AwsResult<()> {
        let mut state = self.enter("delete_project")?;
        if state.projects.remove(name).is_none() {
            return Err(AwsError::api(
                "ResourceNotFoundException",
                format!("project {name} not found"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CodePipelineApi for InMemoryCloud {
    async fn get_pipeline(&self, name: &str) -> AwsResult<Option<PipelineSummary>> {
        let state = self.enter("get_pipeline")?;
        Ok(state.pipelines.get(name).map(|p| PipelineSummary {
            name: p.name.clone(),
            role_arn: p.role_arn.clone(),
            stage_names: p.stages.iter().map(|s| s.name.clone()).collect(),
        }))
    }

    async fn create_pipeline(&self, declaration: &PipelineDeclaration) -> AwsResult<()> {
        let mut state = self.enter("create_pipeline")?;
        if state.pipelines.contains_key(&declaration.name) {
            return Err(AwsError::api(
                "PipelineNameInUseException",
                format!("pipeline {} exists", declaration.name),
            ));
        }
        state
            .pipelines
            .insert(declaration.name.clone(), declaration.clone());
        Ok(())
    }

    async fn update_pipeline(&self, declaration: &PipelineDeclaration) -> AwsResult<()> {
        let mut state = self.enter("update_pipeline")?;
        if !state.pipelines.contains_key(&declaration.name) {
            return Err(AwsError::api(
                "PipelineNotFoundException",
                format!("pipeline {} not found", declaration.name),
            ));
        }
        state
            .pipelines
            .insert(declaration.name.clone(), declaration.clone());
        Ok(())
    }

    async fn delete_pipeline(&self, name: &str) -> AwsResult<()> {
        let mut state = self.enter("delete_pipeline")?;
        if state.pipelines.remove(name).is_none() {
            return Err(AwsError::api(
                "PipelineNotFoundException",
                format!("pipeline {name} not found"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl S3Api for InMemoryCloud {
    async fn bucket_exists(&self, bucket: &str) -> AwsResult<bool> {
        Ok(self.enter("bucket_exists")?.buckets.contains(bucket))
    }

    async fn create_bucket(&self, bucket: &str, _region: &str) -> AwsResult<()> {
        let mut state = self.enter("create_bucket")?;
        if !state.buckets.insert(bucket.to_string()) {
            return Err(AwsError::api("BucketAlreadyOwnedByYou", format!("bucket {bucket} exists")));
        }
        Ok(())
    }
}

#[async_trait]
impl CloudFormationApi for InMemoryCloud {
    async fn get_stack(&self, name: &str) -> AwsResult<Option<Stack>> {
        Ok(self.enter("get_stack")?.stacks.get(name).cloned())
    }

    async fn create_stack(
        &self,
        name: &str,
        _template_body: &str,
        parameters: &[(String, String)],
    ) -> AwsResult<()> {
        let mut state = self.enter("create_stack")?;
        if state.stacks.contains_key(name) {
            return Err(AwsError::api("AlreadyExistsException", format!("stack {name} exists")));
        }
        // Stacks settle instantly here; parameters double as outputs so the
        // templates' FunctionName output is observable.
        state.stacks.insert(
            name.to_string(),
            Stack {
                name: name.to_string(),
                status: "CREATE_COMPLETE".to_string(),
                outputs: parameters.iter().cloned().collect(),
            },
        );
        Ok(())
    }

    async fn delete_stack(&self, name: &str) -> AwsResult<()> {
        // Deleting an unknown stack is a no-op in CloudFormation too.
        self.enter("delete_stack")?.stacks.remove(name);
        Ok(())
    }
}

#[async_trait]
impl SsmApi for InMemoryCloud {
    async fn put_secure_parameter(
        &self,
        name: &str,
        value: &str,
        _description: &str,
    ) -> AwsResult<()> {
        self.enter("put_parameter")?
            .parameters
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_parameters(&self, names: &[String]) -> AwsResult<()> {
        let mut state = self.enter("delete_parameters")?;
        for name in names {
            state.parameters.remove(name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let cloud = InMemoryCloud::new();
        cloud.inject_failures("create_role", "LimitExceeded", 1);

        let err = cloud.create_role("r", "{}").await.unwrap_err();
        assert_eq!(err.code(), "LimitExceeded");
        // Budget spent, next call goes through.
        cloud.create_role("r", "{}").await.unwrap();
        assert_eq!(cloud.calls("create_role"), 2);
    }

    #[tokio::test]
    async fn test_policy_version_cap() {
        let cloud = InMemoryCloud::new();
        let policy = cloud.create_policy("p", "/pipewright/", "{}").await.unwrap();
        for _ in 0..4 {
            cloud.create_policy_version(&policy.arn, "{}").await.unwrap();
        }
        let err = cloud.create_policy_version(&policy.arn, "{}").await.unwrap_err();
        assert_eq!(err.code(), "LimitExceeded");
    }
}
