//! Pipeline file parsing with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use pipewright_types::PipelineFile;
use regex::Regex;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    let mut missing = Vec::new();

    for cap in ENV_VAR_RE.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                missing.push(var_name.to_string());
            }
        }
    }

    if !missing.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", missing.join(", "));
    }

    Ok(result)
}

/// Parse a pipeline YAML string (after env var substitution).
///
/// # Errors
///
/// Returns an error if env var substitution fails or the YAML is invalid.
pub fn parse_pipeline_file_str(yaml_str: &str) -> Result<PipelineFile> {
    let substituted = substitute_env_vars(yaml_str)?;
    let file: PipelineFile =
        serde_yaml::from_str(&substituted).context("Failed to parse pipeline file YAML")?;
    Ok(file)
}

/// Parse a pipeline YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn parse_pipeline_file(path: &Path) -> Result<PipelineFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline file: {}", path.display()))?;
    parse_pipeline_file_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PW_TEST_BRANCH", "release");
        let input = "branch: ${PW_TEST_BRANCH}";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "branch: release");
        std::env::remove_var("PW_TEST_BRANCH");
    }

    #[test]
    fn test_missing_env_vars_all_reported() {
        let input = "${PW_MISSING_X} and ${PW_MISSING_Y}";
        let err = substitute_env_vars(input).unwrap_err().to_string();
        assert!(err.contains("PW_MISSING_X"));
        assert!(err.contains("PW_MISSING_Y"));
    }

    #[test]
    fn test_parse_pipeline_file_from_string() {
        std::env::set_var("PW_TEST_OWNER", "byu-oit");
        let yaml = r#"
version: 1
name: my-app
pipelines:
  prd:
    phases:
      - type: github
        name: Source
        owner: ${PW_TEST_OWNER}
        repo: my-app
      - type: codebuild
        name: Build
        build_image: aws/codebuild/standard:7.0
"#;
        let file = parse_pipeline_file_str(yaml).unwrap();
        assert_eq!(file.name, "my-app");
        let phases = &file.pipelines["prd"].phases;
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].str_param("owner"), Some("byu-oit"));
        std::env::remove_var("PW_TEST_OWNER");
    }

    #[test]
    fn test_parse_invalid_yaml_errors() {
        let result = parse_pipeline_file_str("this is not: [valid: yaml: {{{}}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_file_not_found() {
        let err = parse_pipeline_file(Path::new("/nonexistent/pipewright.yml"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("Failed to read pipeline file"));
    }
}
