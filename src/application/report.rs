//! Aggregate outcome of one chain reaction.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::models::{Agent, AgentStatus, Output, Role};
use crate::services::circuit_breaker::CircuitStats;

/// Overall reaction outcome. Only a failed root fails the reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionStatus {
    Success,
    Failed,
}

impl ReactionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ReactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the agent tree as reported to callers.
#[derive(Debug, Clone, Serialize)]
pub struct AgentSummary {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub child_ids: Vec<Uuid>,
    pub role: Role,
    pub task: String,
    pub depth: usize,
    pub status: AgentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Agent> for AgentSummary {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            parent_id: agent.parent_id,
            child_ids: agent.child_ids.clone(),
            role: agent.role,
            task: agent.task.name.clone(),
            depth: agent.depth,
            status: agent.status,
            error: agent.error.clone(),
            created_at: agent.created_at,
            completed_at: agent.completed_at,
        }
    }
}

/// Final report for a reaction.
#[derive(Debug, Clone, Serialize)]
pub struct ReactionReport {
    pub status: ReactionStatus,

    /// `None` when the root could not be spawned
    pub root_agent_id: Option<Uuid>,

    pub total_spawned: usize,

    pub agents_by_role: BTreeMap<Role, usize>,

    pub max_depth_reached: usize,

    /// Root output (synthesized or executed)
    pub result: Option<Output>,

    /// Diagnostics from failed agents and skipped spawns, in order
    pub errors: Vec<String>,

    pub circuit: CircuitStats,

    /// Every agent, ordered by depth then creation
    pub agents: Vec<AgentSummary>,

    pub duration_ms: u64,
}

impl ReactionReport {
    pub fn is_success(&self) -> bool {
        self.status == ReactionStatus::Success
    }

    /// Number of agents that ended `Failed`.
    pub fn failed_agents(&self) -> usize {
        self.agents
            .iter()
            .filter(|agent| agent.status == AgentStatus::Failed)
            .count()
    }

    pub fn root(&self) -> Option<&AgentSummary> {
        let root_id = self.root_agent_id?;
        self.agents.iter().find(|agent| agent.id == root_id)
    }

    pub fn agent(&self, id: Uuid) -> Option<&AgentSummary> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    /// Summaries of `id`'s children in spawn order.
    pub fn children_of(&self, id: Uuid) -> Vec<&AgentSummary> {
        self.agent(id)
            .map(|parent| parent.child_ids.iter().filter_map(|child| self.agent(*child)).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Task;
    use crate::services::circuit_breaker::CircuitBreaker;

    async fn report(agents: &[Agent], root: Option<Uuid>) -> ReactionReport {
        ReactionReport {
            status: ReactionStatus::Success,
            root_agent_id: root,
            total_spawned: agents.len(),
            agents_by_role: BTreeMap::from([(Role::Manager, 1), (Role::Tester, 1)]),
            max_depth_reached: 1,
            result: Some(serde_json::json!({"ok": true})),
            errors: Vec::new(),
            circuit: CircuitBreaker::with_defaults().stats().await,
            agents: agents.iter().map(AgentSummary::from).collect(),
            duration_ms: 12,
        }
    }

    #[tokio::test]
    async fn test_tree_navigation() {
        let mut root = Agent::new(Role::Manager, Task::new("root", "orchestrate"), None, 0);
        let child = Agent::new(Role::Tester, Task::new("check", "testing"), Some(root.id), 1);
        root.child_ids.push(child.id);

        let report = report(&[root.clone(), child.clone()], Some(root.id)).await;

        assert_eq!(report.root().unwrap().id, root.id);
        let children = report.children_of(root.id);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].task, "check");
        assert_eq!(report.failed_agents(), 0);
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_serializes_snake_case() {
        let root = Agent::new(Role::Manager, Task::new("root", "orchestrate"), None, 0);
        let report = report(std::slice::from_ref(&root), Some(root.id)).await;

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["agents_by_role"]["manager"], 1);
        assert_eq!(value["circuit"]["state"], "closed");
        assert_eq!(value["agents"][0]["role"], "manager");
        assert!(value["agents"][0].get("error").is_none());
    }
}
