//! Next.js project inventory
//!
//! Walks a source tree and records what the analysis and planning roles need:
//! the file list, which router the app uses, the Next.js version and the
//! declared dependencies.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{Error, Result};

/// Directories never listed
pub const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".next",
    "dist",
    "out",
    ".nuxt",
    ".output",
];

/// Which Next.js router the project is built on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterKind {
    /// `app/` directory router
    App,
    /// `pages/` directory router
    Pages,
    /// Both routers present
    Mixed,
    /// Neither found
    Unknown,
}

impl fmt::Display for RouterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouterKind::App => "App Router",
            RouterKind::Pages => "Pages Router",
            RouterKind::Mixed => "App Router and Pages Router",
            RouterKind::Unknown => "unknown router",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    name: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, String>,
}

/// Everything the scan found
#[derive(Debug, Clone, Serialize)]
pub struct ProjectInventory {
    pub root: PathBuf,
    /// Relative `/`-separated paths, sorted
    pub files: Vec<String>,
    pub router: RouterKind,
    pub next_version: Option<String>,
    pub project_name: Option<String>,
    /// Runtime and dev dependencies from package.json
    pub dependencies: BTreeMap<String, String>,
    #[serde(skip)]
    index: BTreeSet<String>,
}

/// Normalize a project-relative path for comparison
///
/// Converts backslashes, strips `./` prefixes, drops empty and `.` segments.
pub fn normalize(path: &str) -> String {
    path.trim()
        .replace('\\', "/")
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn detect_router(files: &[String]) -> RouterKind {
    let is_route = |prefix: &str| {
        files.iter().any(|f| {
            ["", "src/"].iter().any(|base| {
                f.strip_prefix(&format!("{}{}", base, prefix))
                    .is_some_and(|rest| !rest.is_empty())
            })
        })
    };

    match (is_route("app/"), is_route("pages/")) {
        (true, true) => RouterKind::Mixed,
        (true, false) => RouterKind::App,
        (false, true) => RouterKind::Pages,
        (false, false) => RouterKind::Unknown,
    }
}

fn walk(root: &Path, dir: &Path, files: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if file_type.is_dir() {
            if SKIPPED_DIRS.contains(&name.as_ref()) {
                continue;
            }
            walk(root, &entry.path(), files)?;
        } else if file_type.is_file() {
            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(&path);
            files.push(normalize(&relative.to_string_lossy()));
        }
    }
    Ok(())
}

impl ProjectInventory {
    /// Scan a project directory
    #[instrument]
    pub fn scan(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::Other(format!(
                "Project directory not found: {}",
                root.display()
            )));
        }

        let mut files = Vec::new();
        walk(root, root, &mut files)?;
        files.sort();

        let package = match std::fs::read_to_string(root.join("package.json")) {
            Ok(raw) => serde_json::from_str::<PackageJson>(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Could not parse package.json");
                PackageJson::default()
            }),
            Err(_) => PackageJson::default(),
        };

        let next_version = package
            .dependencies
            .get("next")
            .or_else(|| package.dev_dependencies.get("next"))
            .cloned();

        let mut dependencies = package.dependencies;
        dependencies.extend(package.dev_dependencies);

        let router = detect_router(&files);
        debug!(files = files.len(), %router, "Scanned project");

        Ok(Self {
            root: root.to_path_buf(),
            index: files.iter().cloned().collect(),
            files,
            router,
            next_version,
            project_name: package.name,
            dependencies,
        })
    }

    /// Whether `path` was found by the scan
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains(&normalize(path))
    }

    /// Whether the project declares a dependency on `next`
    pub fn is_next_project(&self) -> bool {
        self.next_version.is_some()
    }

    /// Read a scanned file
    pub fn read(&self, path: &str) -> Result<String> {
        let path = normalize(path);
        if !self.index.contains(&path) {
            return Err(Error::Plan(format!("{} is not part of the project", path)));
        }
        Ok(std::fs::read_to_string(self.root.join(&path))?)
    }

    /// Markdown digest used in prompts
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Project: {}\n",
            self.project_name.as_deref().unwrap_or("(unnamed)")
        ));
        out.push_str(&format!(
            "Next.js version: {}\n",
            self.next_version.as_deref().unwrap_or("(not declared)")
        ));
        out.push_str(&format!("Router: {}\n", self.router));

        out.push_str("\nDependencies:\n");
        if self.dependencies.is_empty() {
            out.push_str("(none)\n");
        }
        for (name, version) in &self.dependencies {
            out.push_str(&format!("- {} {}\n", name, version));
        }

        out.push_str(&format!("\nFiles ({}):\n", self.files.len()));
        out.push_str(&self.file_list());
        out
    }

    /// One `- path` line per file
    pub fn file_list(&self) -> String {
        self.files
            .iter()
            .map(|f| format!("- {}", f))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, path: &str, contents: &str) {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, contents).unwrap();
    }

    fn app_router_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "package.json",
            r#"{"name": "shop", "dependencies": {"next": "14.2.3", "react": "18.3.1"}, "devDependencies": {"tailwindcss": "3.4.0"}}"#,
        );
        write(dir.path(), "src/app/page.tsx", "export default function Page() {}");
        write(dir.path(), "src/app/layout.tsx", "");
        write(dir.path(), "public/logo.svg", "<svg/>");
        write(dir.path(), "node_modules/react/index.js", "");
        write(dir.path(), ".next/cache/x", "");
        write(dir.path(), ".git/HEAD", "");
        dir
    }

    #[test]
    fn test_scan_lists_files_and_skips_build_dirs() {
        let dir = app_router_project();
        let inventory = ProjectInventory::scan(dir.path()).unwrap();

        assert_eq!(
            inventory.files,
            vec![
                "package.json",
                "public/logo.svg",
                "src/app/layout.tsx",
                "src/app/page.tsx"
            ]
        );
    }

    #[test]
    fn test_scan_reads_package_json() {
        let dir = app_router_project();
        let inventory = ProjectInventory::scan(dir.path()).unwrap();

        assert_eq!(inventory.router, RouterKind::App);
        assert_eq!(inventory.next_version.as_deref(), Some("14.2.3"));
        assert_eq!(inventory.project_name.as_deref(), Some("shop"));
        assert!(inventory.dependencies.contains_key("tailwindcss"));
        assert!(inventory.is_next_project());
    }

    #[test]
    fn test_pages_router() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pages/index.js", "");
        write(dir.path(), "pages/about.js", "");
        let inventory = ProjectInventory::scan(dir.path()).unwrap();
        assert_eq!(inventory.router, RouterKind::Pages);
        assert!(!inventory.is_next_project());
    }

    #[test]
    fn test_contains_normalizes() {
        let dir = app_router_project();
        let inventory = ProjectInventory::scan(dir.path()).unwrap();

        assert!(inventory.contains("./src/app/page.tsx"));
        assert!(inventory.contains("src\\app\\page.tsx"));
        assert!(!inventory.contains("src/pages/Home.jsx"));
    }

    #[test]
    fn test_read_only_scanned_files() {
        let dir = app_router_project();
        let inventory = ProjectInventory::scan(dir.path()).unwrap();

        assert!(inventory.read("src/app/page.tsx").unwrap().contains("Page"));
        assert!(inventory.read("node_modules/react/index.js").is_err());
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(ProjectInventory::scan(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("./a//b/./c.ts"), "a/b/c.ts");
        assert_eq!(normalize(" a\\b "), "a/b");
    }

    #[test]
    fn test_summary() {
        let dir = app_router_project();
        let summary = ProjectInventory::scan(dir.path()).unwrap().summary();
        assert!(summary.contains("Router: App Router"));
        assert!(summary.contains("- next 14.2.3"));
        assert!(summary.contains("- src/app/page.tsx"));
    }
}
