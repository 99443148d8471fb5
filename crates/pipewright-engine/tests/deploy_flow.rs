//! End-to-end lifecycle runs against the in-memory cloud: fresh deploy,
//! re-deploy, mid-run failure, delete, and the concurrent all-pipelines
//! fan-out.

use std::collections::BTreeMap;
use std::sync::Arc;

use pipewright_aws::CloudClients;
use pipewright_engine::config::parser::parse_pipeline_file_str;
use pipewright_engine::lifecycle::{self, PipelineSecrets};
use pipewright_engine::{PhaseRegistry, PhaseStatus};
use pipewright_types::{AccountConfig, PhaseSecrets, PipelineAction, PipelineFile};

const PIPELINE_FILE: &str = r#"
version: 1
name: shop
pipelines:
  prd:
    phases:
      - type: github
        name: Source
        owner: byu-oit
        repo: shop
        branch: main
      - type: codebuild
        name: Build
        build_image: aws/codebuild/standard:7.0
      - type: handel
        name: Deploy
        environments_to_deploy:
          - prd
"#;

fn file() -> PipelineFile {
    parse_pipeline_file_str(PIPELINE_FILE).unwrap()
}

fn account() -> AccountConfig {
    AccountConfig {
        account_id: "111122223333".to_string(),
        region: "us-west-2".to_string(),
    }
}

fn secrets() -> PipelineSecrets {
    let mut source = PhaseSecrets::new();
    source.insert("access_token", "gh-token");
    BTreeMap::from([("Source".to_string(), source)])
}

#[tokio::test]
async fn test_fresh_account_deploy_provisions_everything() {
    let (clients, cloud) = CloudClients::in_memory();
    let registry = PhaseRegistry::builtin(None);

    let report = lifecycle::deploy(&file(), "prd", &account(), &secrets(), &registry, &clients)
        .await
        .unwrap();

    assert!(report.succeeded(), "{report:?}");
    assert_eq!(report.pipeline_action, Some(PipelineAction::Created));

    // Artifact bucket, roles, and one project per build-backed phase.
    assert!(cloud.has_bucket("codepipeline-us-west-2-111122223333"));
    assert!(cloud.role("shop-PipewrightBuildPhase").is_some());
    assert!(cloud.role("PipewrightDeployPhase").is_some());
    assert!(cloud.role("PipewrightServiceRole").is_some());
    assert_eq!(cloud.calls("create_project"), 2);
    assert_eq!(cloud.calls("create_pipeline"), 1);

    let pipeline = cloud.pipeline("shop-prd").unwrap();
    let stage_names: Vec<&str> = pipeline.stages.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(stage_names, vec!["Source", "Build", "Deploy"]);

    // The stages hand artifacts down the documented chain.
    assert_eq!(pipeline.stages[0].actions[0].output_artifacts, vec!["Output_Source"]);
    assert_eq!(pipeline.stages[1].actions[0].input_artifacts, vec!["Output_Source"]);
    assert_eq!(pipeline.stages[1].actions[0].output_artifacts, vec!["Output_Build"]);
    assert_eq!(pipeline.stages[2].actions[0].input_artifacts, vec!["Output_Build"]);
    assert!(pipeline.stages[2].actions[0].output_artifacts.is_empty());
}

#[tokio::test]
async fn test_redeploy_updates_without_duplicating_resources() {
    let (clients, cloud) = CloudClients::in_memory();
    let registry = PhaseRegistry::builtin(None);

    let first = lifecycle::deploy(&file(), "prd", &account(), &secrets(), &registry, &clients)
        .await
        .unwrap();
    let second = lifecycle::deploy(&file(), "prd", &account(), &secrets(), &registry, &clients)
        .await
        .unwrap();

    assert_eq!(first.pipeline_action, Some(PipelineAction::Created));
    assert_eq!(second.pipeline_action, Some(PipelineAction::Updated));
    assert_eq!(cloud.calls("create_pipeline"), 1);
    assert_eq!(cloud.calls("update_pipeline"), 1);

    // Same roles, and unchanged policy documents create no new versions.
    assert_eq!(cloud.calls("create_role"), 3);
    assert_eq!(cloud.calls("create_policy_version"), 0);
    assert_eq!(
        cloud.policy_version_count(
            "arn:aws:iam::111122223333:policy/pipewright/shop-PipewrightBuildPhase"
        ),
        1
    );
}

#[tokio::test]
async fn test_phase_failure_skips_rest_and_leaves_pipeline_untouched() {
    let (clients, cloud) = CloudClients::in_memory();
    let registry = PhaseRegistry::builtin(None);
    cloud.inject_failures("create_project", "AccessDeniedException", 1);

    let report = lifecycle::deploy(&file(), "prd", &account(), &secrets(), &registry, &clients)
        .await
        .unwrap();

    assert!(!report.succeeded());
    assert_eq!(report.pipeline_action, None);
    assert_eq!(report.phases[0].status, PhaseStatus::Completed);
    assert!(matches!(report.phases[1].status, PhaseStatus::Failed { .. }));
    assert_eq!(report.phases[2].status, PhaseStatus::Skipped);
    assert_eq!(report.failed_phase().unwrap().phase_name, "Build");
    assert_eq!(cloud.calls("create_pipeline"), 0);
    assert!(cloud.pipeline("shop-prd").is_none());
}

#[tokio::test]
async fn test_deploy_rejects_malformed_pipeline_before_any_cloud_call() {
    let file = parse_pipeline_file_str(
        r#"
version: 1
name: shop
pipelines:
  prd:
    phases:
      - type: github
        name: Source
        owner: byu-oit
        repo: shop
      - type: approval
        name: Gate
"#,
    )
    .unwrap();
    let (clients, cloud) = CloudClients::in_memory();
    let registry = PhaseRegistry::builtin(None);

    let err = lifecycle::deploy(&file, "prd", &account(), &secrets(), &registry, &clients)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("codebuild phase as its second phase"), "{err}");
    assert_eq!(cloud.calls("create_bucket"), 0);
    assert_eq!(cloud.calls("create_role"), 0);

    let err = lifecycle::delete(&file, "prd", &account(), &secrets(), &registry, &clients)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("failed validation"), "{err}");
    assert_eq!(cloud.calls("delete_pipeline"), 0);
}

#[tokio::test]
async fn test_delete_tears_down_and_is_idempotent() {
    let (clients, cloud) = CloudClients::in_memory();
    let registry = PhaseRegistry::builtin(None);

    lifecycle::deploy(&file(), "prd", &account(), &secrets(), &registry, &clients)
        .await
        .unwrap();
    let first = lifecycle::delete(&file(), "prd", &account(), &secrets(), &registry, &clients)
        .await
        .unwrap();

    assert!(first.pipeline_existed);
    assert!(first.succeeded(), "{first:?}");
    assert!(cloud.pipeline("shop-prd").is_none());
    assert!(cloud.project("shop-prd-Build").is_none());
    assert!(cloud.project("shop-prd-Deploy").is_none());
    assert!(cloud.role("shop-PipewrightBuildPhase").is_none());
    // Singletons are shared with other apps and stay.
    assert!(cloud.role("PipewrightDeployPhase").is_some());

    let second = lifecycle::delete(&file(), "prd", &account(), &secrets(), &registry, &clients)
        .await
        .unwrap();
    assert!(!second.pipeline_existed);
    assert!(second.succeeded(), "{second:?}");
}

#[tokio::test]
async fn test_deploy_all_runs_every_pipeline() {
    let file = parse_pipeline_file_str(
        r#"
version: 1
name: shop
pipelines:
  prd:
    phases:
      - type: github
        name: Source
        owner: byu-oit
        repo: shop
      - type: codebuild
        name: Build
        build_image: aws/codebuild/standard:7.0
  stg:
    phases:
      - type: github
        name: Source
        owner: byu-oit
        repo: shop
        branch: staging
      - type: codebuild
        name: Build
        build_image: aws/codebuild/standard:7.0
"#,
    )
    .unwrap();
    let (clients, cloud) = CloudClients::in_memory();
    let registry = Arc::new(PhaseRegistry::builtin(None));
    let all_secrets = BTreeMap::from([
        ("prd".to_string(), secrets()),
        ("stg".to_string(), secrets()),
    ]);

    let reports = lifecycle::deploy_all(
        Arc::new(file),
        account(),
        all_secrets,
        registry,
        clients,
    )
    .await
    .unwrap();

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.succeeded()), "{reports:?}");
    assert_eq!(reports[0].pipeline_name, "prd");
    assert_eq!(reports[1].pipeline_name, "stg");
    assert!(cloud.pipeline("shop-prd").is_some());
    assert!(cloud.pipeline("shop-stg").is_some());
    // Both pipelines share the app's build role and the service role.
    assert!(cloud.role("shop-PipewrightBuildPhase").is_some());
    assert!(cloud.role("PipewrightServiceRole").is_some());
    assert_eq!(cloud.calls("create_pipeline"), 2);
}

#[tokio::test]
async fn test_singleton_lambda_stack_created_once_across_pipelines() {
    let file = parse_pipeline_file_str(
        r##"
version: 1
name: shop
pipelines:
  prd:
    phases:
      - type: github
        name: Source
        owner: byu-oit
        repo: shop
      - type: codebuild
        name: Build
        build_image: aws/codebuild/standard:7.0
      - type: slack_notify
        name: Notify
        channel: "#deploys"
        message: "shop prd deployed"
  stg:
    phases:
      - type: github
        name: Source
        owner: byu-oit
        repo: shop
      - type: codebuild
        name: Build
        build_image: aws/codebuild/standard:7.0
      - type: slack_notify
        name: Notify
        channel: "#deploys"
        message: "shop stg deployed"
"##,
    )
    .unwrap();
    let (clients, cloud) = CloudClients::in_memory();
    let registry = Arc::new(PhaseRegistry::builtin(None));

    let mut github = PhaseSecrets::new();
    github.insert("access_token", "gh-token");
    let mut webhook = PhaseSecrets::new();
    webhook.insert("webhook_url", "https://hooks.slack.com/services/T0/B0/x");
    let pipeline_secrets = BTreeMap::from([
        ("Source".to_string(), github),
        ("Notify".to_string(), webhook),
    ]);
    let all_secrets = BTreeMap::from([
        ("prd".to_string(), pipeline_secrets.clone()),
        ("stg".to_string(), pipeline_secrets),
    ]);

    let reports = lifecycle::deploy_all(
        Arc::new(file),
        account(),
        all_secrets,
        registry,
        clients,
    )
    .await
    .unwrap();

    assert!(reports.iter().all(|r| r.succeeded()), "{reports:?}");
    assert_eq!(cloud.calls("create_stack"), 1);
    assert!(cloud.stack("PipewrightSlackNotifyLambda").is_some());
}
