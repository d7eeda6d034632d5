//! Role catalog: per-role blueprints, the kind table, and strategy lookup.
//!
//! Strategies are resolved once when the catalog is built, so the propagator
//! dispatches on a closed set of styles instead of inspecting tasks at run
//! time.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::domain::errors::{ReactorError, ReactorResult};
use crate::domain::models::{Blueprint, OutputSchema, Role, Subtask};
use crate::domain::ports::{DecompositionStrategy, SynthesisStrategy};

/// Built-in decomposition styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompositionStyle {
    /// Always {design, interface, integration}
    Architecture,
    /// One subtask per requirement
    PerRequirement,
    /// {implementation, testing}
    BuildAndVerify,
    /// {analysis, documentation}
    AnalyzeAndReport,
    /// Two synthetic halves of the same kind
    Halves,
}

impl DecompositionStyle {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::PerRequirement => "per_requirement",
            Self::BuildAndVerify => "build_and_verify",
            Self::AnalyzeAndReport => "analyze_and_report",
            Self::Halves => "halves",
        }
    }
}

/// Built-in synthesis styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisStyle {
    /// Ordered list of child outputs tagged with the parent role
    Aggregate,
    /// Highest `quality` child wins
    BestQuality,
    /// Unique child outputs in order
    Deduplicate,
    /// Child outputs joined as text
    Concatenate,
}

impl SynthesisStyle {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Aggregate => "aggregate",
            Self::BestQuality => "best_quality",
            Self::Deduplicate => "deduplicate",
            Self::Concatenate => "concatenate",
        }
    }
}

/// Strategies bound to one role.
#[derive(Clone)]
pub struct RoleStrategies {
    pub decomposition: DecompositionStyle,
    pub synthesis: SynthesisStyle,
    pub custom_decomposer: Option<Arc<dyn DecompositionStrategy>>,
    pub custom_synthesizer: Option<Arc<dyn SynthesisStrategy>>,
}

impl std::fmt::Debug for RoleStrategies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleStrategies")
            .field("decomposition", &self.decomposition)
            .field("synthesis", &self.synthesis)
            .field("custom_decomposer", &self.custom_decomposer.is_some())
            .field("custom_synthesizer", &self.custom_synthesizer.is_some())
            .finish()
    }
}

impl RoleStrategies {
    const fn builtin(decomposition: DecompositionStyle, synthesis: SynthesisStyle) -> Self {
        Self {
            decomposition,
            synthesis,
            custom_decomposer: None,
            custom_synthesizer: None,
        }
    }
}

/// Static `kind -> Role` table used for role inference.
#[derive(Debug, Clone)]
pub struct KindTable {
    entries: HashMap<String, Role>,
}

impl Default for KindTable {
    fn default() -> Self {
        let entries = [
            ("design", Role::Architect),
            ("architecture", Role::Architect),
            ("interface", Role::Architect),
            ("integration", Role::Builder),
            ("implementation", Role::Builder),
            ("build", Role::Builder),
            ("analysis", Role::Analyzer),
            ("research", Role::Analyzer),
            ("testing", Role::Tester),
            ("test", Role::Tester),
            ("review", Role::Reviewer),
            ("deployment", Role::Deployer),
            ("deploy", Role::Deployer),
            ("documentation", Role::Documenter),
            ("docs", Role::Documenter),
            ("orchestrate", Role::Manager),
        ]
        .into_iter()
        .map(|(kind, role)| (kind.to_string(), role))
        .collect();

        Self { entries }
    }
}

impl KindTable {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, kind: impl AsRef<str>, role: Role) {
        self.entries.insert(normalize(kind.as_ref()), role);
    }

    pub fn resolve(&self, kind: &str) -> Option<Role> {
        self.entries.get(&normalize(kind)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(kind: &str) -> String {
    kind.trim().to_lowercase()
}

#[derive(Debug, Clone)]
struct RoleEntry {
    blueprint: Blueprint,
    strategies: RoleStrategies,
}

/// Blueprints and strategies for every role.
#[derive(Debug, Clone)]
pub struct RoleCatalog {
    /// Indexed by `Role as usize`; always holds every role.
    entries: Vec<RoleEntry>,
    kinds: KindTable,
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl RoleCatalog {
    /// The stock catalog.
    pub fn standard() -> Self {
        use DecompositionStyle::{AnalyzeAndReport, Architecture, BuildAndVerify, Halves, PerRequirement};
        use SynthesisStyle::{Aggregate, BestQuality, Concatenate, Deduplicate};

        let entries = Role::ALL
            .into_iter()
            .map(|role| {
                let (blueprint, strategies) = match role {
                    Role::Manager => (
                        Blueprint {
                            max_children: 10,
                            spawn_probability: 0.9,
                            auto_spawn_threshold: 0.5,
                            parallel_execution: true,
                            spawn_permissions: Role::ALL.to_vec(),
                            output_schema: OutputSchema::default(),
                        },
                        RoleStrategies::builtin(PerRequirement, Aggregate),
                    ),
                    Role::Architect => (
                        Blueprint {
                            max_children: 3,
                            spawn_probability: 0.7,
                            auto_spawn_threshold: 0.6,
                            parallel_execution: false,
                            spawn_permissions: vec![Role::Analyzer, Role::Builder, Role::Documenter],
                            output_schema: OutputSchema::default(),
                        },
                        RoleStrategies::builtin(Architecture, BestQuality),
                    ),
                    Role::Analyzer => (
                        Blueprint {
                            max_children: 2,
                            spawn_probability: 0.5,
                            auto_spawn_threshold: 0.7,
                            parallel_execution: true,
                            spawn_permissions: vec![Role::Documenter],
                            output_schema: OutputSchema::default(),
                        },
                        RoleStrategies::builtin(AnalyzeAndReport, Aggregate),
                    ),
                    Role::Builder => (
                        Blueprint {
                            max_children: 2,
                            spawn_probability: 0.6,
                            auto_spawn_threshold: 0.7,
                            parallel_execution: false,
                            spawn_permissions: vec![Role::Tester],
                            output_schema: OutputSchema::default(),
                        },
                        RoleStrategies::builtin(BuildAndVerify, Concatenate),
                    ),
                    Role::Tester => (Blueprint::leaf(), RoleStrategies::builtin(Halves, Deduplicate)),
                    Role::Reviewer => (Blueprint::leaf(), RoleStrategies::builtin(Halves, BestQuality)),
                    Role::Deployer | Role::Documenter => {
                        (Blueprint::leaf(), RoleStrategies::builtin(Halves, Concatenate))
                    }
                };
                RoleEntry {
                    blueprint,
                    strategies,
                }
            })
            .collect();

        Self {
            entries,
            kinds: KindTable::default(),
        }
    }

    fn entry(&self, role: Role) -> &RoleEntry {
        &self.entries[role as usize]
    }

    fn entry_mut(&mut self, role: Role) -> &mut RoleEntry {
        &mut self.entries[role as usize]
    }

    pub fn blueprint(&self, role: Role) -> &Blueprint {
        &self.entry(role).blueprint
    }

    pub fn strategies(&self, role: Role) -> &RoleStrategies {
        &self.entry(role).strategies
    }

    pub const fn kinds(&self) -> &KindTable {
        &self.kinds
    }

    /// Replace a role's blueprint.
    pub fn with_blueprint(mut self, role: Role, blueprint: Blueprint) -> Self {
        self.entry_mut(role).blueprint = blueprint;
        self
    }

    /// Map an additional task kind to a role.
    pub fn with_kind(mut self, kind: impl AsRef<str>, role: Role) -> Self {
        self.kinds.insert(kind, role);
        self
    }

    /// Replace the whole kind table.
    pub fn with_kind_table(mut self, kinds: KindTable) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn with_decomposer(mut self, role: Role, strategy: Arc<dyn DecompositionStrategy>) -> Self {
        self.entry_mut(role).strategies.custom_decomposer = Some(strategy);
        self
    }

    pub fn with_synthesizer(mut self, role: Role, strategy: Arc<dyn SynthesisStrategy>) -> Self {
        self.entry_mut(role).strategies.custom_synthesizer = Some(strategy);
        self
    }

    pub fn with_synthesis_style(mut self, role: Role, style: SynthesisStyle) -> Self {
        self.entry_mut(role).strategies.synthesis = style;
        self
    }

    /// Pick the role a subtask will be spawned under.
    ///
    /// The kind table is consulted first; a role the parent may not spawn
    /// falls back to the parent's first permitted role. A parent with no
    /// permissions yields `NoRoleAvailable`.
    pub fn assign_role(&self, subtask: &Subtask, parent: &Blueprint) -> ReactorResult<Role> {
        let resolved = subtask
            .suggested_role
            .or_else(|| self.kinds.resolve(&subtask.task.kind));

        if let Some(role) = resolved.filter(|role| parent.permits(*role)) {
            return Ok(role);
        }

        match parent.spawn_permissions.first() {
            Some(&fallback) => {
                debug!(
                    subtask = %subtask.task.name,
                    kind = %subtask.task.kind,
                    resolved = ?resolved,
                    fallback = %fallback,
                    "resolved role not permitted, using parent's first permitted role"
                );
                Ok(fallback)
            }
            None => Err(ReactorError::NoRoleAvailable(subtask.task.name.clone())),
        }
    }
}
