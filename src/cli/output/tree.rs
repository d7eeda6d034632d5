//! Agent tree rendering with box-drawing characters.

use console::style;
use uuid::Uuid;

use crate::application::{AgentSummary, ReactionReport};
use crate::domain::models::AgentStatus;

use super::table::status_icon;
use super::truncate;

/// Unicode box-drawing characters for tree visualization
const TREE_BRANCH: &str = "├── ";
const TREE_LAST: &str = "└── ";
const TREE_PIPE: &str = "│   ";
const TREE_SPACE: &str = "    ";

/// Render the whole agent tree of a reaction, root first.
///
/// Returns an empty string when the root was never spawned.
pub fn render_agent_tree(report: &ReactionReport, use_colors: bool) -> String {
    let mut output = String::new();
    if let Some(root) = report.root() {
        render_node(report, root, 0, true, "", use_colors, &mut output);
    }
    output
}

fn render_node(
    report: &ReactionReport,
    agent: &AgentSummary,
    depth: usize,
    is_last: bool,
    prefix: &str,
    use_colors: bool,
    output: &mut String,
) {
    let connector = if depth == 0 {
        ""
    } else if is_last {
        TREE_LAST
    } else {
        TREE_BRANCH
    };

    let icon = status_icon(agent.status);
    let icon = if use_colors {
        match agent.status {
            AgentStatus::Complete => style(icon).green().to_string(),
            AgentStatus::Failed => style(icon).red().to_string(),
            _ => style(icon).yellow().to_string(),
        }
    } else {
        icon.to_string()
    };

    let role = if use_colors {
        style(agent.role.as_str()).bold().to_string()
    } else {
        agent.role.as_str().to_string()
    };

    output.push_str(&format!(
        "{prefix}{connector}{icon} {role} {} [{}]",
        truncate(&agent.task, 48),
        short_id(agent.id)
    ));
    if let Some(ref error) = agent.error {
        let error = truncate(error, 60);
        if use_colors {
            output.push_str(&format!(" {}", style(error).red().dim()));
        } else {
            output.push_str(&format!(" ({error})"));
        }
    }
    output.push('\n');

    let child_prefix = if depth == 0 {
        String::new()
    } else if is_last {
        format!("{prefix}{TREE_SPACE}")
    } else {
        format!("{prefix}{TREE_PIPE}")
    };

    let children = report.children_of(agent.id);
    let last = children.len().saturating_sub(1);
    for (index, child) in children.into_iter().enumerate() {
        render_node(
            report,
            child,
            depth + 1,
            index == last,
            &child_prefix,
            use_colors,
            output,
        );
    }
}

fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ChainReactor;
    use crate::domain::models::{Config, Role, Task};
    use crate::infrastructure::executors::SimulatedExecutor;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_tree_shows_every_agent() {
        let reactor = ChainReactor::new(Config::default(), Arc::new(SimulatedExecutor::new()));
        let task = Task::new("ship release", "orchestrate")
            .with_attribute("scope", "large")
            .with_requirements(["build", "test", "document"]);
        let report = reactor.initiate_chain_reaction(Role::Manager, task, 10, 3).await;

        let rendered = render_agent_tree(&report, false);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), report.total_spawned);
        assert!(lines[0].starts_with("✓ manager ship release"));
        assert!(lines[1..].iter().all(|line| line.contains("── ")));
        assert!(lines.last().unwrap().contains(TREE_LAST));
    }

    #[tokio::test]
    async fn test_missing_root_renders_nothing() {
        let reactor = ChainReactor::new(Config::default(), Arc::new(SimulatedExecutor::new()));
        let report = reactor
            .initiate_chain_reaction(Role::Manager, Task::new("x", "orchestrate"), 0, 3)
            .await;

        assert!(render_agent_tree(&report, false).is_empty());
    }
}
