use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::role::Role;
use super::task::Task;
use crate::domain::errors::{ReactorError, ReactorResult};

/// Opaque result payload produced by an agent.
pub type Output = Value;

/// Agent lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Created,
    Active,
    Executing,
    Decomposing,
    Synthesizing,
    Complete,
    Failed,
}

impl AgentStatus {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub const fn can_transition_to(&self, next: Self) -> bool {
        use AgentStatus::{Active, Complete, Created, Decomposing, Executing, Failed, Synthesizing};
        match (*self, next) {
            (from, Failed) => !from.is_terminal(),
            (Created, Active)
            | (Active, Executing | Decomposing)
            // Decomposition that spawned nothing falls through to execution
            | (Decomposing, Synthesizing | Executing)
            | (Executing | Synthesizing, Complete) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Active => write!(f, "active"),
            Self::Executing => write!(f, "executing"),
            Self::Decomposing => write!(f, "decomposing"),
            Self::Synthesizing => write!(f, "synthesizing"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for AgentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(Self::Created),
            "active" => Ok(Self::Active),
            "executing" => Ok(Self::Executing),
            "decomposing" => Ok(Self::Decomposing),
            "synthesizing" => Ok(Self::Synthesizing),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            _ => Err(anyhow::anyhow!("Invalid agent status: {s}")),
        }
    }
}

/// One node of the task tree.
///
/// Agents live in a flat registry keyed by `id`; `parent_id` and `child_ids`
/// are lookup keys only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique agent identifier
    pub id: Uuid,

    pub role: Role,

    pub task: Task,

    pub parent_id: Option<Uuid>,

    /// Children in spawn order
    pub child_ids: Vec<Uuid>,

    /// Distance from the root (root = 0)
    pub depth: usize,

    pub status: AgentStatus,

    /// Set exactly once, on transition to Complete or Failed
    pub output: Option<Output>,

    /// Failure reason when status is Failed
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,

    pub completed_at: Option<DateTime<Utc>>,
}

impl Agent {
    pub fn new(role: Role, task: Task, parent_id: Option<Uuid>, depth: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            task,
            parent_id,
            child_ids: Vec::new(),
            depth,
            status: AgentStatus::Created,
            output: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn transition_to(&mut self, next: AgentStatus) -> ReactorResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(ReactorError::InvalidStateTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Record the final output and mark the agent complete.
    pub fn complete(&mut self, output: Output) -> ReactorResult<()> {
        if self.output.is_some() {
            return Err(ReactorError::OutputAlreadySet(self.id));
        }
        self.transition_to(AgentStatus::Complete)?;
        self.output = Some(output);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Mark the agent failed, recording the error in its output.
    pub fn fail(&mut self, error: &ReactorError) -> ReactorResult<()> {
        if self.output.is_some() {
            return Err(ReactorError::OutputAlreadySet(self.id));
        }
        self.transition_to(AgentStatus::Failed)?;
        self.output = Some(serde_json::json!({
            "error": error.to_string(),
            "kind": error.kind(),
        }));
        self.error = Some(error.to_string());
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

/// Settled state of a child as seen by its parent's synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildResult {
    pub agent_id: Option<Uuid>,
    pub role: Role,
    pub status: AgentStatus,
    pub output: Option<Output>,
    pub error: Option<String>,
}

impl ChildResult {
    pub fn from_agent(agent: &Agent) -> Self {
        Self {
            agent_id: Some(agent.id),
            role: agent.role,
            status: agent.status,
            output: agent.output.clone(),
            error: agent.error.clone(),
        }
    }

    /// Result of a subtask run inline under the parent's role.
    pub fn inline(role: Role, outcome: Result<Output, String>) -> Self {
        match outcome {
            Ok(output) => Self {
                agent_id: None,
                role,
                status: AgentStatus::Complete,
                output: Some(output),
                error: None,
            },
            Err(error) => Self {
                agent_id: None,
                role,
                status: AgentStatus::Failed,
                output: None,
                error: Some(error),
            },
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == AgentStatus::Complete
    }
}
