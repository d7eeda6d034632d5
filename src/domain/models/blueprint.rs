use serde::{Deserialize, Serialize};

use super::role::Role;

/// Shape a leaf output must have before it is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSchema {
    /// Fields the output object must contain. Empty means any non-null value.
    #[serde(default)]
    pub required_fields: Vec<String>,
}

impl OutputSchema {
    pub fn requiring<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// Per-role spawn configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Maximum children an agent of this role may spawn. Zero marks a leaf.
    pub max_children: usize,

    /// Recorded for reporting only; never consulted when deciding to spawn.
    pub spawn_probability: f64,

    /// Complexity score above which decomposition is attempted.
    pub auto_spawn_threshold: f64,

    /// Propagate children concurrently instead of in spawn order.
    #[serde(default)]
    pub parallel_execution: bool,

    /// Roles this role may create, in preference order.
    #[serde(default)]
    pub spawn_permissions: Vec<Role>,

    #[serde(default)]
    pub output_schema: OutputSchema,
}

impl Blueprint {
    /// A role that never decomposes.
    pub fn leaf() -> Self {
        Self {
            max_children: 0,
            spawn_probability: 0.0,
            auto_spawn_threshold: 1.0,
            parallel_execution: false,
            spawn_permissions: Vec::new(),
            output_schema: OutputSchema::default(),
        }
    }

    pub const fn is_leaf(&self) -> bool {
        self.max_children == 0
    }

    pub fn permits(&self, role: Role) -> bool {
        self.spawn_permissions.contains(&role)
    }

    pub fn with_max_children(mut self, max_children: usize) -> Self {
        self.max_children = max_children;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.auto_spawn_threshold = threshold;
        self
    }

    pub fn with_parallel_execution(mut self, parallel: bool) -> Self {
        self.parallel_execution = parallel;
        self
    }

    pub fn with_permissions(mut self, roles: impl Into<Vec<Role>>) -> Self {
        self.spawn_permissions = roles.into();
        self
    }

    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = schema;
        self
    }
}
