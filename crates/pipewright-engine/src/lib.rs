//! Pipeline lifecycle engine: definition parsing and validation, phase
//! handler dispatch, stage assembly, and the deploy/delete orchestration
//! that turns a pipeline file into live AWS resources.

pub mod assembler;
pub mod common;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod naming;
pub mod phase;
pub mod phases;
pub mod registry;
pub mod result;

pub use error::{ProvisionError, Result};
pub use phase::{ExtraResourceDeployer, ExtraResourceOutputs, PhaseHandler};
pub use registry::PhaseRegistry;
pub use result::{CheckReport, DeleteReport, DeployReport, PhaseOutcome, PhaseStatus};
