//! Pre- and post-condition checks at the spawn and execution boundaries.

use serde::Serialize;
use serde_json::Value;

use crate::domain::errors::ReactorError;
use crate::domain::models::{Blueprint, Output, OutputSchema, Role, Task};

/// Outcome of a validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub const fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Convert into a `Result`, wrapping errors with `wrap` when invalid.
    pub fn into_result(self, wrap: fn(Vec<String>) -> ReactorError) -> Result<(), ReactorError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(wrap(self.errors))
        }
    }
}

/// Which boundary is being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionKind {
    Spawn,
    Execute,
}

/// What the engine needs to know about a prospective spawn or execution.
#[derive(Debug, Clone, Copy)]
pub struct PreconditionContext<'a> {
    pub role: Role,
    pub task: &'a Task,
    /// Parent role and blueprint; `None` for the root.
    pub parent: Option<(Role, &'a Blueprint)>,
    pub depth: usize,
    pub max_depth: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationEngine;

impl ValidationEngine {
    pub const fn new() -> Self {
        Self
    }

    pub fn validate_preconditions(&self, kind: PreconditionKind, ctx: &PreconditionContext<'_>) -> ValidationResult {
        let mut errors = ctx.task.well_formed_errors();

        if ctx.depth > ctx.max_depth {
            errors.push(format!("depth {} exceeds max depth {}", ctx.depth, ctx.max_depth));
        }

        if kind == PreconditionKind::Spawn {
            if let Some((parent_role, blueprint)) = ctx.parent {
                if blueprint.is_leaf() {
                    errors.push(format!("{parent_role} is a leaf role and cannot spawn"));
                } else if !blueprint.permits(ctx.role) {
                    errors.push(format!("{parent_role} is not permitted to spawn {}", ctx.role));
                }
            }
        }

        ValidationResult::from_errors(errors)
    }

    pub fn validate_output(&self, output: &Output, schema: &OutputSchema) -> ValidationResult {
        if output.is_null() {
            return ValidationResult::from_errors(vec!["output is null".to_string()]);
        }
        if schema.required_fields.is_empty() {
            return ValidationResult::valid();
        }

        let Value::Object(fields) = output else {
            return ValidationResult::from_errors(vec![format!(
                "output must be an object with fields: {}",
                schema.required_fields.join(", ")
            )]);
        };

        let errors = schema
            .required_fields
            .iter()
            .filter(|field| fields.get(field.as_str()).is_none_or(Value::is_null))
            .map(|field| format!("missing required field '{field}'"))
            .collect();
        ValidationResult::from_errors(errors)
    }
}
