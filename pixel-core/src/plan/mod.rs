//! Migration plan schema and validation
//!
//! The planning role answers with a JSON [`MigrationPlan`]. Before anything is
//! written, [`MigrationPlan::validate`] checks every entry against the scanned
//! project so the execution role only ever touches files that exist.

mod parser;

use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::project::{normalize, ProjectInventory};

pub use parser::{extract_json, json_values, parse_plan};

/// What to do with one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationAction {
    /// Rewrite the source for Nuxt
    Convert,
    /// Copy unchanged
    Copy,
    /// Write a new file with no Next.js counterpart
    Create,
}

impl fmt::Display for MigrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MigrationAction::Convert => "convert",
            MigrationAction::Copy => "copy",
            MigrationAction::Create => "create",
        };
        write!(f, "{}", s)
    }
}

/// A single file migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMigration {
    /// Path of the Next.js file, relative to the project root
    #[serde(default)]
    pub source_path: String,
    /// Path of the Nuxt file, relative to the output directory
    pub target_path: String,
    pub action: MigrationAction,
    #[serde(default)]
    pub description: String,
}

/// Complete plan produced by the planning role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub files_to_migrate: Vec<FileMigration>,
    /// Free-text changes for nuxt.config.ts and friends
    #[serde(default)]
    pub config_changes: Vec<String>,
}

/// Why an entry was dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// `source_path` is not in the scanned file set
    UnknownSource { path: String },
    /// `convert` or `copy` without a source
    MissingSource,
    /// `target_path` is empty, absolute or climbs out of the output directory
    UnsafeTarget { path: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::UnknownSource { path } => {
                write!(f, "source '{}' was not found by the analysis", path)
            }
            RejectReason::MissingSource => write!(f, "no source path given"),
            RejectReason::UnsafeTarget { path } => {
                write!(f, "target '{}' is outside the output directory", path)
            }
        }
    }
}

/// An entry removed during validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedEntry {
    pub entry: FileMigration,
    pub reason: RejectReason,
}

/// Whether a target path stays inside the directory it is joined to
pub fn is_safe_target(path: &str) -> bool {
    let path = path.trim();
    // drive letters count as absolute
    if path.is_empty() || path.starts_with('/') || path.starts_with('\\') || path.contains(':') {
        return false;
    }
    Path::new(&path.replace('\\', "/"))
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

impl MigrationPlan {
    /// Split the plan into entries that can run and entries that cannot
    ///
    /// Accepted entries keep their order and get normalized paths.
    pub fn validate(
        &self,
        inventory: &ProjectInventory,
    ) -> (Vec<FileMigration>, Vec<RejectedEntry>) {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for entry in &self.files_to_migrate {
            let source = normalize(&entry.source_path);

            let reason = if !is_safe_target(&entry.target_path) {
                Some(RejectReason::UnsafeTarget {
                    path: entry.target_path.clone(),
                })
            } else if source.is_empty() {
                (entry.action != MigrationAction::Create).then_some(RejectReason::MissingSource)
            } else if !inventory.contains(&source) {
                Some(RejectReason::UnknownSource { path: source.clone() })
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    tracing::warn!(
                        source = %entry.source_path,
                        target = %entry.target_path,
                        %reason,
                        "Rejected plan entry"
                    );
                    rejected.push(RejectedEntry {
                        entry: entry.clone(),
                        reason,
                    });
                }
                None => accepted.push(FileMigration {
                    source_path: source,
                    target_path: normalize(&entry.target_path),
                    ..entry.clone()
                }),
            }
        }

        (accepted, rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn inventory() -> (TempDir, ProjectInventory) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/app")).unwrap();
        std::fs::write(dir.path().join("src/app/page.tsx"), "x").unwrap();
        std::fs::write(dir.path().join("tailwind.config.js"), "x").unwrap();
        let inventory = ProjectInventory::scan(dir.path()).unwrap();
        (dir, inventory)
    }

    fn entry(source: &str, target: &str, action: MigrationAction) -> FileMigration {
        FileMigration {
            source_path: source.to_string(),
            target_path: target.to_string(),
            action,
            description: String::new(),
        }
    }

    #[test]
    fn test_accepts_analysed_sources() {
        let (_dir, inventory) = inventory();
        let plan = MigrationPlan {
            files_to_migrate: vec![
                entry("./src/app/page.tsx", "pages/index.vue", MigrationAction::Convert),
                entry("tailwind.config.js", "tailwind.config.js", MigrationAction::Copy),
            ],
            ..Default::default()
        };

        let (accepted, rejected) = plan.validate(&inventory);
        assert!(rejected.is_empty());
        assert_eq!(accepted[0].source_path, "src/app/page.tsx");
        assert_eq!(accepted.len(), 2);
    }

    #[test]
    fn test_rejects_unknown_source() {
        let (_dir, inventory) = inventory();
        let plan = MigrationPlan {
            files_to_migrate: vec![entry(
                "src/pages/Home.jsx",
                "pages/index.vue",
                MigrationAction::Convert,
            )],
            ..Default::default()
        };

        let (accepted, rejected) = plan.validate(&inventory);
        assert!(accepted.is_empty());
        assert_eq!(
            rejected[0].reason,
            RejectReason::UnknownSource {
                path: "src/pages/Home.jsx".to_string()
            }
        );
    }

    #[test]
    fn test_create_without_source_is_exempt() {
        let (_dir, inventory) = inventory();
        let plan = MigrationPlan {
            files_to_migrate: vec![
                entry("", "nuxt.config.ts", MigrationAction::Create),
                entry("", "pages/about.vue", MigrationAction::Convert),
            ],
            ..Default::default()
        };

        let (accepted, rejected) = plan.validate(&inventory);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].target_path, "nuxt.config.ts");
        assert_eq!(rejected[0].reason, RejectReason::MissingSource);
    }

    #[test]
    fn test_create_with_unknown_source_is_rejected() {
        let (_dir, inventory) = inventory();
        let plan = MigrationPlan {
            files_to_migrate: vec![entry("ghost.ts", "app.vue", MigrationAction::Create)],
            ..Default::default()
        };
        let (accepted, _) = plan.validate(&inventory);
        assert!(accepted.is_empty());
    }

    #[test]
    fn test_rejects_escaping_targets() {
        let (_dir, inventory) = inventory();
        let plan = MigrationPlan {
            files_to_migrate: vec![
                entry("src/app/page.tsx", "../evil.vue", MigrationAction::Convert),
                entry("src/app/page.tsx", "/etc/passwd", MigrationAction::Convert),
                entry("src/app/page.tsx", "", MigrationAction::Convert),
            ],
            ..Default::default()
        };
        let (accepted, rejected) = plan.validate(&inventory);
        assert!(accepted.is_empty());
        assert_eq!(rejected.len(), 3);
    }

    #[test]
    fn test_is_safe_target() {
        assert!(is_safe_target("pages/index.vue"));
        assert!(is_safe_target("./app.vue"));
        assert!(!is_safe_target("a/../../b"));
        assert!(!is_safe_target("C:\\x"));
    }

    #[test]
    fn test_action_serde() {
        let parsed: FileMigration = serde_json::from_str(
            r#"{"source_path": "a", "target_path": "b", "action": "copy", "description": "d"}"#,
        )
        .unwrap();
        assert_eq!(parsed.action, MigrationAction::Copy);
        assert!(serde_json::from_str::<FileMigration>(
            r#"{"target_path": "b", "action": "delete"}"#
        )
        .is_err());
    }
}
