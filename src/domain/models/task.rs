use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::role::Role;

/// Unit of work handed to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Human-readable task name
    pub name: String,

    /// Free-form kind used for role inference (e.g. "design", "testing")
    pub kind: String,

    /// Arbitrary attributes consulted by complexity scoring and decomposition
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,

    /// Ordered requirements
    #[serde(default)]
    pub requirements: Vec<String>,
}

impl Task {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            attributes: BTreeMap::new(),
            requirements: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_requirements<I, S>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements = requirements.into_iter().map(Into::into).collect();
        self
    }

    /// String value of an attribute, if present and a string.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Problems that make this task unfit to hand to an agent.
    pub fn well_formed_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("task name cannot be empty".to_string());
        }
        if self.kind.trim().is_empty() {
            errors.push(format!("task '{}' has an empty kind", self.name));
        }
        errors
    }
}

/// A decomposed piece of a parent task plus the role its kind suggests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub task: Task,

    /// Role resolved from the kind table at decomposition time, if any.
    pub suggested_role: Option<Role>,
}

impl Subtask {
    pub const fn new(task: Task, suggested_role: Option<Role>) -> Self {
        Self {
            task,
            suggested_role,
        }
    }
}
