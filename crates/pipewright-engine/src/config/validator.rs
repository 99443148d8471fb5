//! Structural validation of the pipeline file.
//!
//! Everything here runs before any cloud call: a definition that fails
//! validation never touches AWS.

use std::collections::BTreeSet;

use pipewright_types::{PipelineDef, PipelineFile};

const SOURCE_TYPES: &[&str] = &["github", "codecommit"];

/// Structural checks for one pipeline definition. Also run by `deploy` and
/// `delete` so a malformed definition is rejected before any cloud call.
pub fn validate_pipeline_def(name: &str, def: &PipelineDef) -> Vec<String> {
    let mut errors = Vec::new();
    if def.phases.len() < 2 {
        errors.push(format!(
            "Pipeline '{name}' must have at least a source phase and a build phase"
        ));
        return errors;
    }

    if !SOURCE_TYPES.contains(&def.phases[0].phase_type.as_str()) {
        errors.push(format!(
            "Pipeline '{name}' must start with a source phase (github or codecommit)"
        ));
    }
    if def.phases[1].phase_type != "codebuild" {
        errors.push(format!(
            "Pipeline '{name}' must have a codebuild phase as its second phase"
        ));
    }

    let mut seen = BTreeSet::new();
    for (i, phase) in def.phases.iter().enumerate() {
        if phase.phase_type.trim().is_empty() {
            errors.push(format!("Pipeline '{name}' phase {i} is missing its 'type'"));
        }
        if phase.name.trim().is_empty() {
            errors.push(format!("Pipeline '{name}' phase {i} is missing its 'name'"));
        } else if !seen.insert(phase.name.clone()) {
            errors.push(format!(
                "Pipeline '{name}' has more than one phase named '{}'",
                phase.name
            ));
        }
    }
    errors
}

/// Validate the whole file. Returns every problem found, empty when the
/// file is structurally sound.
pub fn validate_pipeline_file(file: &PipelineFile) -> Vec<String> {
    let mut errors = Vec::new();

    if file.version != 1 {
        errors.push(format!("Unsupported file version '{}', expected 1", file.version));
    }
    if file.name.trim().is_empty() {
        errors.push("The top-level 'name' (app name) must not be empty".to_string());
    }
    if file.pipelines.is_empty() {
        errors.push("At least one pipeline must be defined".to_string());
    }
    for (name, def) in &file.pipelines {
        errors.extend(validate_pipeline_def(name, def));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_pipeline_file_str;

    fn parse(yaml: &str) -> PipelineFile {
        parse_pipeline_file_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_file_passes() {
        let file = parse(
            r#"
version: 1
name: my-app
pipelines:
  prd:
    phases:
      - type: github
        name: Source
        owner: byu-oit
        repo: my-app
      - type: codebuild
        name: Build
        build_image: aws/codebuild/standard:7.0
"#,
        );
        assert!(validate_pipeline_file(&file).is_empty());
    }

    #[test]
    fn test_too_few_phases() {
        let file = parse(
            r#"
version: 1
name: my-app
pipelines:
  prd:
    phases:
      - type: github
        name: Source
"#,
        );
        let errors = validate_pipeline_file(&file);
        assert!(errors.iter().any(|e| e.contains("at least a source phase and a build phase")));
    }

    #[test]
    fn test_first_phase_must_be_source() {
        let file = parse(
            r#"
version: 1
name: my-app
pipelines:
  prd:
    phases:
      - type: codebuild
        name: Build
      - type: codebuild
        name: Build2
"#,
        );
        let errors = validate_pipeline_file(&file);
        assert!(errors.iter().any(|e| e.contains("must start with a source phase")));
    }

    #[test]
    fn test_second_phase_must_be_codebuild() {
        let file = parse(
            r#"
version: 1
name: my-app
pipelines:
  prd:
    phases:
      - type: github
        name: Source
      - type: approval
        name: Gate
"#,
        );
        let errors = validate_pipeline_file(&file);
        assert!(errors.iter().any(|e| e.contains("codebuild phase as its second phase")));
    }

    #[test]
    fn test_missing_name_and_duplicate_names_reported() {
        let file = parse(
            r#"
version: 1
name: my-app
pipelines:
  prd:
    phases:
      - type: github
        name: Source
      - type: codebuild
        name: Source
      - type: approval
        name: ""
"#,
        );
        let errors = validate_pipeline_file(&file);
        assert!(errors.iter().any(|e| e.contains("more than one phase named 'Source'")));
        assert!(errors.iter().any(|e| e.contains("missing its 'name'")));
    }

    #[test]
    fn test_wrong_version_and_empty_app_name() {
        let file = parse(
            r#"
version: 2
name: " "
pipelines: {}
"#,
        );
        let errors = validate_pipeline_file(&file);
        assert_eq!(errors.len(), 3);
    }
}
