//! Leaf executors
//!
//! - `SimulatedExecutor`: deterministic in-process stand-in
//! - `CommandExecutor`: one external program invocation per leaf

pub mod command;
pub mod simulated;

use std::sync::Arc;

pub use command::CommandExecutor;
pub use simulated::SimulatedExecutor;

use crate::domain::models::{ExecutorConfig, ExecutorKind};
use crate::domain::ports::TaskExecutor;

/// Build the executor selected by `config`.
///
/// `failures` names tasks the simulated executor should fail; the command
/// executor ignores it.
pub fn from_config<I, S>(config: &ExecutorConfig, failures: I) -> Arc<dyn TaskExecutor>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    match config.kind {
        ExecutorKind::Simulated => Arc::new(SimulatedExecutor::new().with_failures(failures)),
        ExecutorKind::Command => Arc::new(CommandExecutor::from_config(config)),
    }
}
