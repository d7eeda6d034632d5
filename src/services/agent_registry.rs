//! Flat agent registry keyed by id.
//!
//! Tree edges are plain id lists, so the registry is the only owner of agent
//! state and no parent/child reference cycles exist.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{ReactorError, ReactorResult};
use crate::domain::models::{Agent, Role};

#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<Uuid, Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent and link it under its parent in one write.
    pub async fn register(&self, agent: Agent) -> ReactorResult<()> {
        let mut agents = self.agents.write().await;
        if let Some(parent_id) = agent.parent_id {
            let parent = agents
                .get_mut(&parent_id)
                .ok_or(ReactorError::AgentNotFound(parent_id))?;
            parent.child_ids.push(agent.id);
        }
        agents.insert(agent.id, agent);
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> ReactorResult<Agent> {
        self.agents
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ReactorError::AgentNotFound(id))
    }

    /// Apply `mutate` to an agent under the write lock.
    pub async fn update<F, T>(&self, id: Uuid, mutate: F) -> ReactorResult<T>
    where
        F: FnOnce(&mut Agent) -> ReactorResult<T>,
    {
        let mut agents = self.agents.write().await;
        let agent = agents.get_mut(&id).ok_or(ReactorError::AgentNotFound(id))?;
        mutate(agent)
    }

    /// Children of `id` in spawn order.
    pub async fn children(&self, id: Uuid) -> ReactorResult<Vec<Agent>> {
        let agents = self.agents.read().await;
        let parent = agents.get(&id).ok_or(ReactorError::AgentNotFound(id))?;
        Ok(parent
            .child_ids
            .iter()
            .filter_map(|child| agents.get(child).cloned())
            .collect())
    }

    /// Mark `id` and every non-terminal descendant as failed.
    ///
    /// `error_for` supplies each agent's own error. Returns the agents that
    /// were transitioned, in the state they were left in.
    pub async fn fail_subtree<F>(&self, id: Uuid, mut error_for: F) -> Vec<Agent>
    where
        F: FnMut(Uuid) -> ReactorError,
    {
        let mut agents = self.agents.write().await;
        let mut failed = Vec::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            let Some(agent) = agents.get_mut(&current) else {
                continue;
            };
            stack.extend(agent.child_ids.iter().copied());
            if !agent.status.is_terminal() && agent.fail(&error_for(current)).is_ok() {
                failed.push(agent.clone());
            }
        }

        failed
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }

    pub async fn count_by_role(&self) -> BTreeMap<Role, usize> {
        let agents = self.agents.read().await;
        let mut counts = BTreeMap::new();
        for agent in agents.values() {
            *counts.entry(agent.role).or_insert(0) += 1;
        }
        counts
    }

    /// Copy of every agent, ordered by depth then creation time.
    pub async fn snapshot(&self) -> Vec<Agent> {
        let mut agents: Vec<Agent> = self.agents.read().await.values().cloned().collect();
        agents.sort_by(|a, b| a.depth.cmp(&b.depth).then(a.created_at.cmp(&b.created_at)));
        agents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AgentStatus, Task};
    use std::time::Duration;

    fn agent(role: Role, parent: Option<Uuid>, depth: usize) -> Agent {
        Agent::new(role, Task::new("work", "implementation"), parent, depth)
    }

    #[tokio::test]
    async fn test_register_links_parent() {
        let registry = AgentRegistry::new();
        let root = agent(Role::Manager, None, 0);
        let root_id = root.id;
        registry.register(root).await.unwrap();

        let child = agent(Role::Builder, Some(root_id), 1);
        let child_id = child.id;
        registry.register(child).await.unwrap();

        let root = registry.get(root_id).await.unwrap();
        assert_eq!(root.child_ids, vec![child_id]);
        assert_eq!(registry.len().await, 2);

        let children = registry.children(root_id).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].parent_id, Some(root_id));
    }

    #[tokio::test]
    async fn test_register_with_unknown_parent_fails() {
        let registry = AgentRegistry::new();
        let orphan = agent(Role::Tester, Some(Uuid::new_v4()), 1);

        let err = registry.register(orphan).await.unwrap_err();
        assert!(matches!(err, ReactorError::AgentNotFound(_)));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_and_missing_agent() {
        let registry = AgentRegistry::new();
        let root = agent(Role::Manager, None, 0);
        let id = root.id;
        registry.register(root).await.unwrap();

        registry
            .update(id, |a| a.transition_to(AgentStatus::Active))
            .await
            .unwrap();
        assert_eq!(registry.get(id).await.unwrap().status, AgentStatus::Active);

        let missing = registry.update(Uuid::new_v4(), |_| Ok(())).await;
        assert!(matches!(missing, Err(ReactorError::AgentNotFound(_))));
    }

    #[tokio::test]
    async fn test_fail_subtree_skips_terminal_agents() {
        let registry = AgentRegistry::new();
        let root = agent(Role::Manager, None, 0);
        let root_id = root.id;
        registry.register(root).await.unwrap();

        let done = agent(Role::Builder, Some(root_id), 1);
        let done_id = done.id;
        registry.register(done).await.unwrap();
        registry
            .update(done_id, |a| {
                a.transition_to(AgentStatus::Active)?;
                a.transition_to(AgentStatus::Executing)?;
                a.complete(serde_json::json!("ok"))
            })
            .await
            .unwrap();

        let running = agent(Role::Builder, Some(root_id), 1);
        let running_id = running.id;
        registry.register(running).await.unwrap();

        let failed = registry
            .fail_subtree(root_id, |agent_id| {
                if agent_id == root_id {
                    ReactorError::Timeout {
                        agent_id,
                        after: Duration::from_secs(60),
                    }
                } else {
                    ReactorError::AncestorTimedOut {
                        agent_id,
                        ancestor: root_id,
                    }
                }
            })
            .await;
        let failed_ids: Vec<Uuid> = failed.iter().map(|a| a.id).collect();

        assert_eq!(failed.len(), 2);
        assert!(failed_ids.contains(&root_id));
        assert!(failed_ids.contains(&running_id));
        assert!(failed.iter().all(|a| a.status == AgentStatus::Failed));

        let running = registry.get(running_id).await.unwrap();
        let error = running.error.unwrap();
        assert!(error.contains(&running_id.to_string()));
        assert!(error.contains(&format!("cancelled by ancestor {root_id}")));
        assert_eq!(registry.get(done_id).await.unwrap().status, AgentStatus::Complete);
        assert_eq!(registry.get(running_id).await.unwrap().status, AgentStatus::Failed);
    }

    #[tokio::test]
    async fn test_count_by_role() {
        let registry = AgentRegistry::new();
        let root = agent(Role::Manager, None, 0);
        let root_id = root.id;
        registry.register(root).await.unwrap();
        registry.register(agent(Role::Tester, Some(root_id), 1)).await.unwrap();
        registry.register(agent(Role::Tester, Some(root_id), 1)).await.unwrap();

        let counts = registry.count_by_role().await;
        assert_eq!(counts.get(&Role::Manager), Some(&1));
        assert_eq!(counts.get(&Role::Tester), Some(&2));

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot[0].id, root_id);
    }
}
