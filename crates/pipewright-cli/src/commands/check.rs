use std::path::Path;

use anyhow::Result;
use pipewright_engine::config::parser;
use pipewright_engine::{lifecycle, PhaseRegistry};

/// Execute the `check` command: validate the file and every phase's params.
/// Makes no cloud calls.
pub fn execute(file_path: &Path) -> Result<()> {
    let file = parser::parse_pipeline_file(file_path)?;
    let registry = PhaseRegistry::builtin(None);

    let report = lifecycle::check(&file, &registry);
    if report.is_ok() {
        println!("Pipeline file is valid.");
        return Ok(());
    }

    for error in &report.structural_errors {
        println!("  - {error}");
    }
    for (pipeline, errors) in &report.pipeline_errors {
        for error in errors {
            println!("  - [{pipeline}] {error}");
        }
    }
    anyhow::bail!("Pipeline file has errors")
}
