//! The agent state machine: spawn, decompose, recurse, synthesize.
//!
//! Each propagation runs under its own timeout. Ceilings reached while
//! decomposing only stop further spawning; errors inside a child are
//! recorded on that child and never unwind into its parent.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, BoxFuture, FutureExt};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::errors::{ReactorError, ReactorResult};
use crate::domain::models::{Agent, AgentStatus, Blueprint, ChildResult, Output, Role, Subtask, Task};
use crate::domain::ports::{ComplexityScorer, ExecutionContext, TaskExecutor};
use crate::services::reaction_state::ReactionState;
use crate::services::recovery_manager::RecoveryManager;
use crate::services::result_synthesizer::ResultSynthesizer;
use crate::services::role_catalog::RoleCatalog;
use crate::services::task_decomposer::TaskDecomposer;
use crate::services::validation_engine::{PreconditionContext, PreconditionKind, ValidationEngine};

/// A decomposed subtask that either got its own agent or runs inline under
/// the parent's role.
enum ChildSlot {
    Spawned(Agent),
    Inline(Subtask),
}

pub struct ChainPropagator {
    catalog: Arc<RoleCatalog>,
    decomposer: TaskDecomposer,
    synthesizer: ResultSynthesizer,
    validator: ValidationEngine,
    recovery: RecoveryManager,
    executor: Arc<dyn TaskExecutor>,
    scorer: Arc<dyn ComplexityScorer>,
    propagation_timeout: Duration,
}

impl ChainPropagator {
    pub fn new(
        catalog: Arc<RoleCatalog>,
        executor: Arc<dyn TaskExecutor>,
        scorer: Arc<dyn ComplexityScorer>,
        recovery: RecoveryManager,
        propagation_timeout: Duration,
    ) -> Self {
        Self {
            decomposer: TaskDecomposer::new(Arc::clone(&catalog)),
            synthesizer: ResultSynthesizer::new(Arc::clone(&catalog)),
            validator: ValidationEngine::new(),
            catalog,
            recovery,
            executor,
            scorer,
            propagation_timeout,
        }
    }

    pub const fn propagation_timeout(&self) -> Duration {
        self.propagation_timeout
    }

    /// Create an agent under `parent_id` (or a root when `None`).
    ///
    /// A child past the depth ceiling fails with `DepthExceeded`, other
    /// preconditions with `ValidationFailed`, and a spent budget with
    /// `ResourceExhausted`. On success the agent is registered and linked
    /// under its parent in one registry write.
    pub async fn spawn(
        &self,
        state: &ReactionState,
        role: Role,
        task: Task,
        parent_id: Option<Uuid>,
    ) -> ReactorResult<Agent> {
        let parent = match parent_id {
            Some(id) => Some(state.registry.get(id).await?),
            None => None,
        };
        let depth = parent.as_ref().map_or(0, |p| p.depth + 1);
        state.governor.check_depth(depth)?;

        self.validator
            .validate_preconditions(
                PreconditionKind::Spawn,
                &PreconditionContext {
                    role,
                    task: &task,
                    parent: parent.as_ref().map(|p| (p.role, self.catalog.blueprint(p.role))),
                    depth,
                    max_depth: state.governor.max_depth(),
                },
            )
            .into_result(ReactorError::ValidationFailed)?;

        state
            .breaker
            .call(|| async move {
                let spawned = state.governor.try_reserve()?;
                let agent = Agent::new(role, task, parent_id, depth);
                if let Err(err) = state.registry.register(agent.clone()).await {
                    state.governor.release();
                    return Err(err);
                }
                state.governor.record_depth(depth);
                debug!(agent_id = %agent.id, %role, depth, spawned, "agent spawned");
                Ok(agent)
            })
            .await
    }

    /// Drive `agent` to a terminal state and report how it settled.
    pub fn propagate<'a>(&'a self, state: &'a ReactionState, agent: Agent) -> BoxFuture<'a, ChildResult> {
        let span = info_span!("agent", agent_id = %agent.id, role = %agent.role, depth = agent.depth);

        async move {
            let id = agent.id;
            match tokio::time::timeout(self.propagation_timeout, self.run(state, &agent)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => Self::fail(state, &agent, &err).await,
                Err(_) => {
                    let after = self.propagation_timeout;
                    let failed = state
                        .registry
                        .fail_subtree(id, |agent_id| {
                            if agent_id == id {
                                ReactorError::Timeout { agent_id, after }
                            } else {
                                ReactorError::AncestorTimedOut { agent_id, ancestor: id }
                            }
                        })
                        .await;
                    warn!(failed = failed.len(), "propagation timed out");
                    for node in &failed {
                        let reason = node.error.as_deref().unwrap_or("timed out");
                        state
                            .note(format!("{} agent {} failed: {reason}", node.role, node.id))
                            .await;
                    }
                }
            }

            state.registry.get(id).await.map_or_else(
                |err| ChildResult {
                    agent_id: Some(id),
                    role: agent.role,
                    status: AgentStatus::Failed,
                    output: None,
                    error: Some(err.to_string()),
                },
                |settled| ChildResult::from_agent(&settled),
            )
        }
        .instrument(span)
        .boxed()
    }

    async fn run(&self, state: &ReactionState, agent: &Agent) -> ReactorResult<()> {
        Self::transition(state, agent.id, AgentStatus::Active).await?;

        let blueprint = self.catalog.blueprint(agent.role);
        let complexity = self.scorer.score(&agent.task);
        debug!(
            complexity,
            threshold = blueprint.auto_spawn_threshold,
            spawn_probability = blueprint.spawn_probability,
            "task scored"
        );

        let output = if Self::should_decompose(state, agent, blueprint, complexity) {
            Self::transition(state, agent.id, AgentStatus::Decomposing).await?;
            match self.decompose_and_join(state, agent, blueprint).await? {
                Some(children) => {
                    Self::transition(state, agent.id, AgentStatus::Synthesizing).await?;
                    let parent = state.registry.get(agent.id).await?;
                    self.synthesizer.synthesize(&parent, &children)
                }
                None => {
                    info!("nothing spawned, executing directly");
                    Self::transition(state, agent.id, AgentStatus::Executing).await?;
                    self.execute_leaf(state, agent).await?
                }
            }
        } else {
            Self::transition(state, agent.id, AgentStatus::Executing).await?;
            self.execute_leaf(state, agent).await?
        };

        state.registry.update(agent.id, |a| a.complete(output)).await?;
        debug!("agent complete");
        Ok(())
    }

    fn should_decompose(state: &ReactionState, agent: &Agent, blueprint: &Blueprint, complexity: f64) -> bool {
        complexity > blueprint.auto_spawn_threshold
            && !blueprint.is_leaf()
            && state.governor.has_capacity()
            && state.governor.allows_children_at(agent.depth)
    }

    /// Spawn children for the decomposed subtasks and wait for all of them.
    ///
    /// Returns `None` when nothing was spawned and no inline subtask produced
    /// output, so the caller can fall back to direct execution.
    async fn decompose_and_join(
        &self,
        state: &ReactionState,
        agent: &Agent,
        blueprint: &Blueprint,
    ) -> ReactorResult<Option<Vec<ChildResult>>> {
        let subtasks = self.decomposer.decompose(agent.role, &agent.task, blueprint);
        debug!(subtasks = subtasks.len(), max_children = blueprint.max_children, "decomposed");

        let mut slots = Vec::new();
        for subtask in subtasks.into_iter().take(blueprint.max_children) {
            match self.catalog.assign_role(&subtask, blueprint) {
                Ok(role) => {
                    let name = subtask.task.name.clone();
                    match self.spawn(state, role, subtask.task, Some(agent.id)).await {
                        Ok(child) => slots.push(ChildSlot::Spawned(child)),
                        Err(err) => Self::skip_spawn(state, agent, role, &name, &err).await,
                    }
                }
                Err(ReactorError::NoRoleAvailable(name)) => {
                    debug!(subtask = %name, "no role available, running inline");
                    slots.push(ChildSlot::Inline(subtask));
                }
                Err(err) => return Err(err),
            }
        }

        let spawned_any = slots.iter().any(|slot| matches!(slot, ChildSlot::Spawned(_)));

        let results = if blueprint.parallel_execution {
            join_all(slots.into_iter().map(|slot| self.settle(state, agent, slot))).await
        } else {
            let mut results = Vec::with_capacity(slots.len());
            for slot in slots {
                results.push(self.settle(state, agent, slot).await);
            }
            results
        };

        if !spawned_any && !results.iter().any(ChildResult::succeeded) {
            return Ok(None);
        }
        Ok(Some(results))
    }

    async fn skip_spawn(state: &ReactionState, parent: &Agent, role: Role, subtask: &str, err: &ReactorError) {
        match err {
            ReactorError::ResourceExhausted { .. } | ReactorError::DepthExceeded { .. } => {
                debug!(%role, subtask, error = %err, "spawn skipped");
            }
            _ => warn!(%role, subtask, error = %err, "spawn failed"),
        }
        state
            .note(format!(
                "skipped {role} spawn for '{subtask}' under {} {}: {err}",
                parent.role, parent.id
            ))
            .await;
    }

    fn settle<'a>(&'a self, state: &'a ReactionState, parent: &'a Agent, slot: ChildSlot) -> BoxFuture<'a, ChildResult> {
        match slot {
            ChildSlot::Spawned(child) => self.propagate(state, child),
            ChildSlot::Inline(subtask) => async move {
                let ctx = ExecutionContext {
                    agent_id: parent.id,
                    role: parent.role,
                    task: subtask.task,
                    depth: parent.depth,
                    attempt: 1,
                };
                let outcome = self.execute_with_recovery(state, &ctx).await;
                if let Err(err) = &outcome {
                    state
                        .note(format!("inline subtask '{}' under {} failed: {err}", ctx.task.name, parent.id))
                        .await;
                }
                ChildResult::inline(parent.role, outcome.map_err(|err| err.to_string()))
            }
            .boxed(),
        }
    }

    async fn execute_leaf(&self, state: &ReactionState, agent: &Agent) -> ReactorResult<Output> {
        self.validator
            .validate_preconditions(
                PreconditionKind::Execute,
                &PreconditionContext {
                    role: agent.role,
                    task: &agent.task,
                    parent: None,
                    depth: agent.depth,
                    max_depth: state.governor.max_depth(),
                },
            )
            .into_result(ReactorError::ValidationFailed)?;

        self.execute_with_recovery(state, &ExecutionContext::for_agent(agent)).await
    }

    async fn execute_with_recovery(&self, state: &ReactionState, ctx: &ExecutionContext) -> ReactorResult<Output> {
        let schema = &self.catalog.blueprint(ctx.role).output_schema;

        let recovered = self
            .recovery
            .execute(&state.breaker, ctx, |attempt| async move {
                let output = self.executor.execute(&attempt).await?;
                self.validator
                    .validate_output(&output, schema)
                    .into_result(ReactorError::InvalidOutput)?;
                Ok(output)
            })
            .await?;

        if recovered.via_fallback {
            state
                .note(format!(
                    "{} '{}' completed via fallback",
                    ctx.role, ctx.task.name
                ))
                .await;
        }
        Ok(recovered.output)
    }

    async fn transition(state: &ReactionState, id: Uuid, status: AgentStatus) -> ReactorResult<()> {
        state.registry.update(id, |a| a.transition_to(status)).await
    }

    async fn fail(state: &ReactionState, agent: &Agent, err: &ReactorError) {
        warn!(error = %err, kind = err.kind(), "agent failed");
        if let Err(update_err) = state.registry.update(agent.id, |a| a.fail(err)).await {
            debug!(error = %update_err, "agent already settled");
        }
        state
            .note(format!("{} agent {} failed: {err}", agent.role, agent.id))
            .await;
    }
}
