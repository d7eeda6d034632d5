//! Implementation of the `chain-reactor react` command.

use anyhow::{bail, Result};
use clap::Args;
use console::style;
use serde::Serialize;
use serde_json::Value;

use crate::application::{ChainReactor, ReactionReport, ReactionStatus};
use crate::cli::output::{
    create_spinner, output, render_agent_tree, supports_color, CommandOutput, ProgressBarExt,
    TableFormatter,
};
use crate::domain::models::{Config, Role, Task};
use crate::infrastructure::executors;

#[derive(Args, Debug)]
pub struct ReactArgs {
    /// Name of the root task
    #[arg(short, long)]
    pub name: String,

    /// Role of the root agent
    #[arg(short, long, default_value = "manager")]
    pub role: Role,

    /// Task kind, used to infer roles for subtasks
    #[arg(short, long, default_value = "orchestrate")]
    pub kind: String,

    /// Task attribute as KEY=VALUE; VALUE is parsed as JSON when possible
    #[arg(short, long = "attr", value_name = "KEY=VALUE", value_parser = parse_attribute)]
    pub attributes: Vec<(String, Value)>,

    /// Requirement of the root task (repeatable)
    #[arg(long = "req", value_name = "TEXT")]
    pub requirements: Vec<String>,

    /// Override the configured agent budget
    #[arg(long)]
    pub max_agents: Option<usize>,

    /// Override the configured depth limit
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Make the simulated executor fail tasks with this name (repeatable)
    #[arg(long = "fail", value_name = "TASK")]
    pub failures: Vec<String>,

    /// Disable the degraded fallback after retries are exhausted
    #[arg(long)]
    pub no_fallback: bool,
}

impl ReactArgs {
    fn root_task(&self) -> Task {
        let task = Task::new(&self.name, &self.kind).with_requirements(self.requirements.clone());
        self.attributes
            .iter()
            .fold(task, |task, (key, value)| task.with_attribute(key, value.clone()))
    }
}

fn parse_attribute(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected KEY=VALUE, got '{raw}'");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("attribute key cannot be empty");
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[derive(Debug, Serialize)]
pub struct ReactOutput {
    #[serde(flatten)]
    pub report: ReactionReport,
}

impl CommandOutput for ReactOutput {
    fn to_human(&self) -> String {
        let report = &self.report;
        let use_colors = supports_color();
        let status = match report.status {
            ReactionStatus::Success if use_colors => style("success").green().bold().to_string(),
            ReactionStatus::Failed if use_colors => style("failed").red().bold().to_string(),
            other => other.to_string(),
        };

        let mut lines = vec![
            format!("Reaction {status}"),
            format!(
                "  Agents: {} spawned, {} failed, max depth {}",
                report.total_spawned,
                report.failed_agents(),
                report.max_depth_reached
            ),
            format!(
                "  Circuit: {} ({} failures, {} rejected)",
                report.circuit.state.as_str(),
                report.circuit.total_failures,
                report.circuit.rejected_calls
            ),
            format!("  Duration: {}ms", report.duration_ms),
        ];

        if !report.agents_by_role.is_empty() {
            lines.push(String::new());
            lines.push(TableFormatter::new().format_role_breakdown(report));
        }

        let tree = render_agent_tree(report, use_colors);
        if !tree.is_empty() {
            lines.push(String::new());
            lines.push(tree.trim_end().to_string());
        }

        if !report.errors.is_empty() {
            lines.push(String::new());
            lines.push(format!("Errors ({}):", report.errors.len()));
            for error in &report.errors {
                lines.push(format!("  - {error}"));
            }
        }

        if let Some(ref result) = report.result {
            lines.push(String::new());
            lines.push("Result:".to_string());
            lines.push(serde_json::to_string_pretty(result).unwrap_or_default());
        }

        lines.join("\n")
    }
}

pub async fn execute(args: ReactArgs, mut config: Config, json_mode: bool) -> Result<ReactionStatus> {
    if args.no_fallback {
        config.retry.fallback_enabled = false;
    }
    let max_agents = args.max_agents.unwrap_or(config.reactor.max_agents);
    let max_depth = args.max_depth.unwrap_or(config.reactor.max_depth);

    let executor = executors::from_config(&config.executor, args.failures.iter().cloned());
    let reactor = ChainReactor::new(config, executor);

    let spinner = (!json_mode).then(|| create_spinner(format!("Reacting on '{}'...", args.name)));
    let report = reactor
        .initiate_chain_reaction(args.role, args.root_task(), max_agents, max_depth)
        .await;

    if let Some(spinner) = spinner {
        let message = format!("{} agent(s) spawned", report.total_spawned);
        if report.is_success() {
            spinner.finish_success(message);
        } else {
            spinner.finish_error(message);
        }
    }

    let status = report.status;
    let result = ReactOutput { report };
    output(&result, json_mode);

    Ok(status)
}
