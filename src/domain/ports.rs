//! Seams the host application plugs into the reactor.

use async_trait::async_trait;
use uuid::Uuid;

use super::errors::{ReactorError, ReactorResult};
use super::models::{Agent, Blueprint, ChildResult, Output, Role, Task};

/// Everything a leaf executor gets to know about the agent it runs for.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub agent_id: Uuid,
    pub role: Role,
    pub task: Task,
    pub depth: usize,
    /// 1-based attempt number within the current retry cycle
    pub attempt: u32,
}

impl ExecutionContext {
    pub fn for_agent(agent: &Agent) -> Self {
        Self {
            agent_id: agent.id,
            role: agent.role,
            task: agent.task.clone(),
            depth: agent.depth,
            attempt: 1,
        }
    }
}

/// Leaf work unit: the place real work (an LLM call, a build step) plugs in.
///
/// Implementations must be safe to retry.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    async fn execute(&self, ctx: &ExecutionContext) -> ReactorResult<Output>;
}

/// Degraded path used once retries are exhausted or the circuit is open.
///
/// Must be infallible and must not spawn agents.
pub trait FallbackExecutor: Send + Sync {
    fn fallback(&self, ctx: &ExecutionContext, reason: &ReactorError) -> Output;
}

/// Scores how worthwhile decomposing a task is, in `[0, 1]`.
///
/// Must be pure and monotonic in the number of requirements.
pub trait ComplexityScorer: Send + Sync {
    fn score(&self, task: &Task) -> f64;
}

/// Custom per-role decomposition. Must be deterministic.
pub trait DecompositionStrategy: Send + Sync {
    fn decompose(&self, task: &Task, blueprint: &Blueprint) -> Vec<Task>;
}

/// Custom per-role synthesis. Must tolerate failed children.
pub trait SynthesisStrategy: Send + Sync {
    fn synthesize(&self, parent: &Agent, children: &[ChildResult]) -> Output;
}
