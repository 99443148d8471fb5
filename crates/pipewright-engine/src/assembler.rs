//! Assembles phase stages into a pipeline declaration.
//!
//! Stages wire together purely by artifact name: the source stage emits
//! `Output_Source`, the build stage consumes it and emits `Output_Build`,
//! and every later stage either consumes `Output_Build` or nothing at all
//! (approval and invoke stages carry no artifacts).

use pipewright_types::{
    ArtifactStore, PipelineDeclaration, StageDeclaration, BUILD_OUTPUT, SOURCE_OUTPUT,
};

fn inputs(stage: &StageDeclaration) -> Vec<&str> {
    stage
        .actions
        .iter()
        .flat_map(|a| a.input_artifacts.iter().map(String::as_str))
        .collect()
}

fn outputs(stage: &StageDeclaration) -> Vec<&str> {
    stage
        .actions
        .iter()
        .flat_map(|a| a.output_artifacts.iter().map(String::as_str))
        .collect()
}

/// Check every stage honors the artifact contract. Returns all violations.
pub fn validate_artifact_chain(stages: &[StageDeclaration]) -> Vec<String> {
    let mut errors = Vec::new();

    if stages.len() < 2 {
        errors.push("A pipeline needs at least a source stage and a build stage".to_string());
        return errors;
    }

    let source = &stages[0];
    if !inputs(source).is_empty() {
        errors.push(format!("Source stage '{}' must not consume artifacts", source.name));
    }
    if outputs(source) != vec![SOURCE_OUTPUT] {
        errors.push(format!(
            "Source stage '{}' must emit exactly '{SOURCE_OUTPUT}'",
            source.name
        ));
    }

    let build = &stages[1];
    if inputs(build) != vec![SOURCE_OUTPUT] {
        errors.push(format!(
            "Build stage '{}' must consume exactly '{SOURCE_OUTPUT}'",
            build.name
        ));
    }
    if outputs(build) != vec![BUILD_OUTPUT] {
        errors.push(format!(
            "Build stage '{}' must emit exactly '{BUILD_OUTPUT}'",
            build.name
        ));
    }

    for stage in &stages[2..] {
        for input in inputs(stage) {
            if input != BUILD_OUTPUT {
                errors.push(format!(
                    "Stage '{}' consumes '{input}', but only '{BUILD_OUTPUT}' exists after the build stage",
                    stage.name
                ));
            }
        }
        if !outputs(stage).is_empty() {
            errors.push(format!(
                "Stage '{}' emits artifacts, but nothing downstream can consume them",
                stage.name
            ));
        }
    }

    errors
}

/// Build the full declaration around validated stages.
pub fn assemble(
    pipeline_name: &str,
    artifact_bucket: &str,
    service_role_arn: &str,
    stages: Vec<StageDeclaration>,
) -> PipelineDeclaration {
    PipelineDeclaration {
        name: pipeline_name.to_string(),
        role_arn: service_role_arn.to_string(),
        artifact_store: ArtifactStore::s3(artifact_bucket),
        stages,
    }
}
