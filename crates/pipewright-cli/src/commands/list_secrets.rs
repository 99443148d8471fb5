use std::path::Path;

use anyhow::Result;
use pipewright_engine::config::parser;
use pipewright_engine::{lifecycle, PhaseRegistry};

use crate::secrets;

/// Execute the `list-secrets` command: show every secret the file's phases
/// need and how to supply it.
pub fn execute(file_path: &Path) -> Result<()> {
    let file = parser::parse_pipeline_file(file_path)?;
    let registry = PhaseRegistry::builtin(None);

    let mut any = false;
    for pipeline_name in file.pipelines.keys() {
        let questions = lifecycle::secret_questions(&file, &registry, pipeline_name)?;
        if questions.is_empty() {
            continue;
        }
        any = true;
        println!("Pipeline '{pipeline_name}':");
        for q in &questions {
            println!(
                "  {} -> --secret {}:{}=... or ${}",
                q.prompt,
                q.phase_name,
                q.key,
                secrets::env_var_name(&q.phase_name, &q.key)
            );
        }
    }
    if !any {
        println!("No secrets needed.");
    }
    Ok(())
}
