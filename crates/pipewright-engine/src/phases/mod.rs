//! Built-in phase handlers.

pub mod approval;
pub mod cloudformation;
pub mod codebuild;
pub mod codecommit;
pub mod github;
pub mod handel;
pub mod handel_delete;
pub mod invoke_lambda;
pub mod npm;
pub mod pypi;
pub mod runscope;
pub mod slack_notify;

use pipewright_types::{ActionDeclaration, ActionTypeId, StageDeclaration};

/// Image used when a phase does not specify one.
pub(crate) const DEFAULT_BUILD_IMAGE: &str = "aws/codebuild/standard:7.0";

/// Most phases map to a single action named after the phase.
pub(crate) fn single_action_stage(
    phase_name: &str,
    action_type_id: ActionTypeId,
    input_artifacts: Vec<String>,
    output_artifacts: Vec<String>,
    configuration: Vec<(String, String)>,
) -> StageDeclaration {
    StageDeclaration {
        name: phase_name.to_string(),
        actions: vec![ActionDeclaration {
            name: phase_name.to_string(),
            action_type_id,
            input_artifacts,
            output_artifacts,
            configuration,
            run_order: 1,
        }],
    }
}
