//! Implementation of the `chain-reactor config` command.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

/// The effective configuration after every layer was merged.
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    #[serde(flatten)]
    pub config: Config,
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config)
            .unwrap_or_else(|e| format!("# failed to render configuration: {e}"))
    }
}

pub fn execute(config: Config, json_mode: bool) -> Result<()> {
    if !json_mode {
        // Surface serializer failures as errors instead of a comment line
        serde_yaml::to_string(&config).context("Failed to render configuration")?;
    }
    output(&ConfigOutput { config }, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_output_is_yaml() {
        let rendered = ConfigOutput {
            config: Config::default(),
        };
        let yaml = rendered.to_human();

        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.reactor.max_agents, 100);
        assert_eq!(parsed.retry.max_retries, 3);
    }

    #[test]
    fn test_json_output_is_flat() {
        let json = ConfigOutput {
            config: Config::default(),
        }
        .to_json();
        assert_eq!(json["reactor"]["max_depth"], 10);
        assert_eq!(json["executor"]["kind"], "simulated");
    }
}
