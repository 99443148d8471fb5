//! Structured outcomes for check, deploy, and delete runs.
//!
//! A failed phase never hides what already happened: the report carries one
//! outcome per phase, so a partially provisioned pipeline is inspectable.

use std::collections::BTreeMap;

use pipewright_types::PipelineAction;

#[derive(Debug, Default)]
pub struct CheckReport {
    /// Problems with the file itself, independent of any one pipeline.
    pub structural_errors: Vec<String>,
    /// Per-pipeline phase problems.
    pub pipeline_errors: BTreeMap<String, Vec<String>>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.structural_errors.is_empty() && self.pipeline_errors.values().all(Vec::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseStatus {
    Completed,
    Failed { error: String },
    /// Not attempted because an earlier phase failed.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct PhaseOutcome {
    pub phase_name: String,
    pub phase_type: String,
    pub status: PhaseStatus,
}

#[derive(Debug)]
pub struct DeployReport {
    pub pipeline_name: String,
    pub phases: Vec<PhaseOutcome>,
    /// `None` when a phase failure stopped the run before the pipeline
    /// itself was touched.
    pub pipeline_action: Option<PipelineAction>,
}

impl DeployReport {
    pub fn succeeded(&self) -> bool {
        self.pipeline_action.is_some()
            && self.phases.iter().all(|p| p.status == PhaseStatus::Completed)
    }

    pub fn failed_phase(&self) -> Option<&PhaseOutcome> {
        self.phases
            .iter()
            .find(|p| matches!(p.status, PhaseStatus::Failed { .. }))
    }
}

#[derive(Debug)]
pub struct DeleteReport {
    pub pipeline_name: String,
    /// Whether the pipeline resource itself existed before this run.
    pub pipeline_existed: bool,
    pub phases: Vec<PhaseOutcome>,
}

impl DeleteReport {
    pub fn succeeded(&self) -> bool {
        self.phases.iter().all(|p| p.status == PhaseStatus::Completed)
    }
}
