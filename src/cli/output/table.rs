//! Table output formatting for CLI commands
//!
//! Renders reaction summaries and role blueprints with comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::application::{AgentSummary, ReactionReport};
use crate::domain::models::{AgentStatus, Role};
use crate::services::role_catalog::RoleCatalog;

use super::truncate;

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub const fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Per-role counts of spawned, completed and failed agents.
    pub fn format_role_breakdown(&self, report: &ReactionReport) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Role", "Spawned", "Complete", "Failed"]));

        for (role, spawned) in &report.agents_by_role {
            let of_role: Vec<&AgentSummary> =
                report.agents.iter().filter(|a| a.role == *role).collect();
            let complete = count(&of_role, AgentStatus::Complete);
            let failed = count(&of_role, AgentStatus::Failed);

            let failed_cell = if self.use_colors && failed > 0 {
                Cell::new(failed).fg(Color::Red)
            } else {
                Cell::new(failed)
            };

            table.add_row(vec![
                Cell::new(role.as_str()),
                Cell::new(spawned),
                Cell::new(complete),
                failed_cell,
            ]);
        }

        table.to_string()
    }

    /// Every agent with its depth, status and task.
    pub fn format_agents(&self, agents: &[AgentSummary]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["ID", "Role", "Depth", "Status", "Task"]));

        for agent in agents {
            let status_cell = if self.use_colors {
                Cell::new(agent.status.to_string()).fg(status_color(agent.status))
            } else {
                Cell::new(format!("{} {}", status_icon(agent.status), agent.status))
            };

            table.add_row(vec![
                Cell::new(&agent.id.to_string()[..8]),
                Cell::new(agent.role.as_str()),
                Cell::new(agent.depth),
                status_cell,
                Cell::new(truncate(&agent.task, 40)),
            ]);
        }

        table.to_string()
    }

    /// One row per role describing its blueprint and strategies.
    pub fn format_blueprints(&self, catalog: &RoleCatalog) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&[
            "Role",
            "Max children",
            "Threshold",
            "Parallel",
            "Spawns",
            "Decomposition",
            "Synthesis",
        ]));

        for role in Role::ALL {
            let blueprint = catalog.blueprint(role);
            let strategies = catalog.strategies(role);
            let spawns = if blueprint.spawn_permissions.is_empty() {
                "-".to_string()
            } else {
                blueprint
                    .spawn_permissions
                    .iter()
                    .map(Role::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            };

            let role_cell = if self.use_colors && blueprint.is_leaf() {
                Cell::new(role.as_str()).fg(Color::DarkGrey)
            } else {
                Cell::new(role.as_str())
            };

            table.add_row(vec![
                role_cell,
                Cell::new(blueprint.max_children),
                Cell::new(format!("{:.2}", blueprint.auto_spawn_threshold)),
                Cell::new(if blueprint.parallel_execution { "yes" } else { "no" }),
                Cell::new(spawns),
                Cell::new(strategies.decomposition.as_str()),
                Cell::new(strategies.synthesis.as_str()),
            ]);
        }

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|title| Cell::new(title).add_attribute(Attribute::Bold))
        .collect()
}

fn count(agents: &[&AgentSummary], status: AgentStatus) -> usize {
    agents.iter().filter(|a| a.status == status).count()
}

/// Check if color output is supported
pub fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    console::colors_enabled()
}

const fn status_color(status: AgentStatus) -> Color {
    match status {
        AgentStatus::Complete => Color::Green,
        AgentStatus::Failed => Color::Red,
        AgentStatus::Executing | AgentStatus::Decomposing | AgentStatus::Synthesizing => {
            Color::Cyan
        }
        AgentStatus::Active => Color::Yellow,
        AgentStatus::Created => Color::White,
    }
}

/// Map agent status to icon
pub const fn status_icon(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Complete => "✓",
        AgentStatus::Failed => "✗",
        AgentStatus::Executing | AgentStatus::Decomposing | AgentStatus::Synthesizing => "⟳",
        AgentStatus::Active => "●",
        AgentStatus::Created => "○",
    }
}
