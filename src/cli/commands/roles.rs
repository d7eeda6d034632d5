//! Implementation of the `chain-reactor roles` command.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::Role;
use crate::services::role_catalog::RoleCatalog;

#[derive(Debug, Serialize)]
pub struct RoleRow {
    pub role: Role,
    pub max_children: usize,
    pub spawn_probability: f64,
    pub auto_spawn_threshold: f64,
    pub parallel_execution: bool,
    pub spawn_permissions: Vec<Role>,
    pub required_output_fields: Vec<String>,
    pub decomposition: &'static str,
    pub synthesis: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RolesOutput {
    pub roles: Vec<RoleRow>,
    #[serde(skip)]
    catalog: RoleCatalog,
}

impl RolesOutput {
    pub fn from_catalog(catalog: RoleCatalog) -> Self {
        let roles = Role::ALL
            .into_iter()
            .map(|role| {
                let blueprint = catalog.blueprint(role);
                let strategies = catalog.strategies(role);
                RoleRow {
                    role,
                    max_children: blueprint.max_children,
                    spawn_probability: blueprint.spawn_probability,
                    auto_spawn_threshold: blueprint.auto_spawn_threshold,
                    parallel_execution: blueprint.parallel_execution,
                    spawn_permissions: blueprint.spawn_permissions.clone(),
                    required_output_fields: blueprint.output_schema.required_fields.clone(),
                    decomposition: strategies.decomposition.as_str(),
                    synthesis: strategies.synthesis.as_str(),
                }
            })
            .collect();
        Self { roles, catalog }
    }
}

impl CommandOutput for RolesOutput {
    fn to_human(&self) -> String {
        TableFormatter::new().format_blueprints(&self.catalog)
    }
}

pub fn execute(json_mode: bool) -> Result<()> {
    output(&RolesOutput::from_catalog(RoleCatalog::standard()), json_mode);
    Ok(())
}
