use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of agent roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Manager,
    Architect,
    Analyzer,
    Builder,
    Tester,
    Reviewer,
    Deployer,
    Documenter,
}

impl Role {
    /// Every role, in catalog order.
    pub const ALL: [Self; 8] = [
        Self::Manager,
        Self::Architect,
        Self::Analyzer,
        Self::Builder,
        Self::Tester,
        Self::Reviewer,
        Self::Deployer,
        Self::Documenter,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Architect => "architect",
            Self::Analyzer => "analyzer",
            Self::Builder => "builder",
            Self::Tester => "tester",
            Self::Reviewer => "reviewer",
            Self::Deployer => "deployer",
            Self::Documenter => "documenter",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == wanted)
            .ok_or_else(|| anyhow::anyhow!("Invalid role: {s}"))
    }
}
