//! Static handler registry.
//!
//! Phase types are bound to handlers here at startup. Nothing is discovered
//! from the filesystem; adding a phase type means registering it.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::phase::{ExtraResourceDeployer, PhaseHandler};
use crate::phases;

pub struct PhaseRegistry {
    handlers: BTreeMap<&'static str, Arc<dyn PhaseHandler>>,
}

impl PhaseRegistry {
    pub fn empty() -> Self {
        PhaseRegistry {
            handlers: BTreeMap::new(),
        }
    }

    /// All built-in phase types. Build phases that declare
    /// `extra_resources` will fail `check` unless a deployer is supplied.
    pub fn builtin(extra_resources: Option<Arc<dyn ExtraResourceDeployer>>) -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(phases::github::GithubPhase));
        registry.register(Arc::new(phases::codecommit::CodeCommitPhase));
        registry.register(Arc::new(phases::codebuild::CodeBuildPhase::new(extra_resources)));
        registry.register(Arc::new(phases::handel::HandelPhase));
        registry.register(Arc::new(phases::handel_delete::HandelDeletePhase));
        registry.register(Arc::new(phases::npm::NpmPhase));
        registry.register(Arc::new(phases::pypi::PypiPhase));
        registry.register(Arc::new(phases::approval::ApprovalPhase));
        registry.register(Arc::new(phases::cloudformation::CloudFormationPhase));
        registry.register(Arc::new(phases::invoke_lambda::InvokeLambdaPhase));
        registry.register(Arc::new(phases::runscope::RunscopePhase));
        registry.register(Arc::new(phases::slack_notify::SlackNotifyPhase));
        registry
    }

    /// Register a handler, replacing any existing binding for its type.
    pub fn register(&mut self, handler: Arc<dyn PhaseHandler>) {
        self.handlers.insert(handler.phase_type(), handler);
    }

    pub fn get(&self, phase_type: &str) -> Option<&Arc<dyn PhaseHandler>> {
        self.handlers.get(phase_type)
    }

    pub fn types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }
}
