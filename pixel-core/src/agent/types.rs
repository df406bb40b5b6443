//! Role definitions for the migration team
//!
//! The team always has the same three members:
//! - Analyzer: inspects the Next.js project
//! - Architect: turns the analysis into a migration plan
//! - Developer: writes the Nuxt files and fixes type errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// A member of the migration team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Analyzes the project structure and dependencies
    Analyzer,
    /// Designs the migration plan
    Architect,
    /// Executes the migration
    Developer,
}

impl Role {
    /// All roles in pipeline order
    pub fn all() -> &'static [Role] {
        &[Role::Analyzer, Role::Architect, Role::Developer]
    }

    /// Short name, also used as the session turn role
    pub fn name(&self) -> &'static str {
        match self {
            Role::Analyzer => "analyzer",
            Role::Architect => "architect",
            Role::Developer => "developer",
        }
    }

    /// One-line job description, placed in the role's system prompt
    pub fn description(&self) -> &'static str {
        match self {
            Role::Analyzer => "Analyze Next.js project structure and dependencies",
            Role::Architect => "Design the Nuxt.js migration plan",
            Role::Developer => "Execute the migration by writing Nuxt.js files",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "analyzer" | "analysis" => Ok(Role::Analyzer),
            "architect" | "planner" => Ok(Role::Architect),
            "developer" | "dev" => Ok(Role::Developer),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}
