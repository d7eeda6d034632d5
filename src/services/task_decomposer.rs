//! Splits a task into ordered subtasks and suggests a role for each.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::models::{Blueprint, Role, Subtask, Task};
use crate::services::role_catalog::{DecompositionStyle, RoleCatalog};

/// Upper bound on subtasks produced for one task. The propagator further
/// truncates to the blueprint's `max_children`.
pub const MAX_SUBTASKS: usize = 12;

/// Keyword -> kind rules applied to requirement text, first match wins.
const REQUIREMENT_KINDS: [(&str, &str); 7] = [
    ("design", "design"),
    ("architect", "design"),
    ("test", "testing"),
    ("doc", "documentation"),
    ("deploy", "deployment"),
    ("review", "review"),
    ("analy", "analysis"),
];

/// Deterministic, role-aware task decomposition.
#[derive(Debug, Clone)]
pub struct TaskDecomposer {
    catalog: Arc<RoleCatalog>,
}

impl TaskDecomposer {
    pub const fn new(catalog: Arc<RoleCatalog>) -> Self {
        Self { catalog }
    }

    /// Decompose `task` as an agent of `role` would.
    ///
    /// Identical inputs always yield identical subtasks and suggested roles.
    pub fn decompose(&self, role: Role, task: &Task, blueprint: &Blueprint) -> Vec<Subtask> {
        let strategies = self.catalog.strategies(role);

        let mut tasks = match &strategies.custom_decomposer {
            Some(custom) => custom.decompose(task, blueprint),
            None => builtin(strategies.decomposition, task),
        };
        tasks.truncate(MAX_SUBTASKS);

        tasks
            .into_iter()
            .map(|child| {
                let suggested = self.catalog.kinds().resolve(&child.kind);
                Subtask::new(child, suggested)
            })
            .collect()
    }
}

fn builtin(style: DecompositionStyle, task: &Task) -> Vec<Task> {
    match style {
        DecompositionStyle::Architecture => ["design", "interface", "integration"]
            .into_iter()
            .map(|kind| child_of(task, format!("{} {kind}", task.name), kind, Vec::new()))
            .collect(),
        DecompositionStyle::PerRequirement if !task.requirements.is_empty() => task
            .requirements
            .iter()
            .map(|req| child_of(task, req.clone(), requirement_kind(req), vec![req.clone()]))
            .collect(),
        DecompositionStyle::PerRequirement => ["design", "implementation", "testing"]
            .into_iter()
            .map(|kind| child_of(task, format!("{} {kind}", task.name), kind, Vec::new()))
            .collect(),
        DecompositionStyle::BuildAndVerify => vec![
            child_of(task, format!("{} implementation", task.name), "implementation", task.requirements.clone()),
            child_of(task, format!("{} testing", task.name), "testing", task.requirements.clone()),
        ],
        DecompositionStyle::AnalyzeAndReport => vec![
            child_of(task, format!("{} analysis", task.name), "analysis", task.requirements.clone()),
            child_of(task, format!("{} documentation", task.name), "documentation", Vec::new()),
        ],
        DecompositionStyle::Halves => {
            let split = task.requirements.len().div_ceil(2);
            let (first, second) = task.requirements.split_at(split);
            vec![
                child_of(task, format!("{} (part 1/2)", task.name), &task.kind, first.to_vec()),
                child_of(task, format!("{} (part 2/2)", task.name), &task.kind, second.to_vec()),
            ]
        }
    }
}

/// Children inherit attributes minus `scope` and remember their parent.
fn child_of(parent: &Task, name: String, kind: &str, requirements: Vec<String>) -> Task {
    let mut child = Task::new(name, kind).with_requirements(requirements);
    child.attributes = parent.attributes.clone();
    child.attributes.remove("scope");
    child
        .attributes
        .insert("parent_task".to_string(), Value::String(parent.name.clone()));
    child
}

fn requirement_kind(requirement: &str) -> &'static str {
    let lowered = requirement.to_lowercase();
    REQUIREMENT_KINDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map_or("implementation", |(_, kind)| *kind)
}
