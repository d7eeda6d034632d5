use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::domain::errors::{ReactorError, ReactorResult};
use crate::domain::models::Output;
use crate::domain::ports::{ComplexityScorer, ExecutionContext, TaskExecutor};
use crate::services::complexity_analyzer::HeuristicComplexityAnalyzer;

/// Deterministic stand-in for real leaf work.
///
/// Produces `{"role", "task", "summary", "quality"}` where quality falls as
/// task complexity rises. Tasks named in the failure set always fail.
#[derive(Debug, Clone, Default)]
pub struct SimulatedExecutor {
    failing: HashSet<String>,
    latency: Option<Duration>,
}

impl SimulatedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every execution of the named tasks.
    pub fn with_failures<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.extend(tasks.into_iter().map(Into::into));
        self
    }

    /// Sleep this long before answering.
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl TaskExecutor for SimulatedExecutor {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn execute(&self, ctx: &ExecutionContext) -> ReactorResult<Output> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.contains(&ctx.task.name) {
            debug!(task = %ctx.task.name, attempt = ctx.attempt, "injected failure");
            return Err(ReactorError::ExecutionFailed(format!(
                "simulated failure for task '{}'",
                ctx.task.name
            )));
        }

        let complexity = HeuristicComplexityAnalyzer::new().score(&ctx.task);
        let quality = ((1.0 - complexity / 2.0) * 100.0).round() / 100.0;

        Ok(json!({
            "role": ctx.role,
            "task": ctx.task.name,
            "summary": format!("{} completed '{}' ({})", ctx.role, ctx.task.name, ctx.task.kind),
            "quality": quality,
        }))
    }
}
