//! Pixel-Perfect core library
//!
//! A team of three LLM agents migrates a Next.js project to Nuxt: an
//! analyzer inspects the source tree, an architect plans the migration and a
//! developer writes the Nuxt files. Provider credentials rotate round-robin
//! across the team, and every turn can be persisted so a run can resume.

pub mod agent;
pub mod config;
pub mod error;
pub mod git;
pub mod knowledge;
pub mod llm;
pub mod plan;
pub mod project;
pub mod providers;
pub mod rotation;
pub mod settings;
pub mod tools;
pub mod workflow;

pub use config::{ConfigStore, ConfigView, EnvSource, UserConfig};
pub use error::{Error, Result};
pub use knowledge::KnowledgeClient;
pub use llm::{ModelResolver, Resolution, ResolvedModel};
pub use plan::{FileMigration, MigrationAction, MigrationPlan};
pub use project::ProjectInventory;
pub use rotation::KeyRotationManager;
pub use settings::{Settings, SettingsOverrides};
pub use workflow::{MigrationReport, MigrationTeam};
