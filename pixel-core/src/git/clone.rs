//! Fetching the Next.js source from a remote repository

use std::path::{Path, PathBuf};

use git2::Repository;
use tracing::{info, warn};

use crate::{Error, Result};

/// Where the migration reads the Next.js project from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSource {
    /// A directory on disk
    Local(PathBuf),
    /// An HTTP(S) repository URL
    Remote { url: String, name: String },
}

impl RepoSource {
    /// Classify a `--repo` argument
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if is_remote(input) {
            let name = repo_name_from_url(input)?;
            Ok(RepoSource::Remote {
                url: input.to_string(),
                name,
            })
        } else {
            Ok(RepoSource::Local(PathBuf::from(input)))
        }
    }
}

/// Whether `input` is an HTTP(S) URL
pub fn is_remote(input: &str) -> bool {
    url::Url::parse(input.trim())
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Directory name for a clone: the last path segment without `.git`
pub fn repo_name_from_url(input: &str) -> Result<String> {
    let url = url::Url::parse(input.trim())
        .map_err(|e| Error::Git(format!("Invalid repository URL {}: {}", input, e)))?;

    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(|s| s.trim_end_matches(".git").to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Git(format!("Repository URL has no name: {}", input)))
}

/// Get the default clones directory
///
/// Returns `~/.cache/pixel-perfect/repos`
pub fn default_clones_dir() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .ok_or_else(|| Error::Config("Could not determine cache directory".to_string()))?;

    Ok(cache_dir.join("pixel-perfect").join("repos"))
}

/// Clone `url` into `<cache_dir>/<name>`, or fetch if it is already there
///
/// Blocking; call from `spawn_blocking` in async code.
pub fn clone_repo(url: &str, name: &str, cache_dir: Option<&Path>) -> Result<PathBuf> {
    let base_dir = match cache_dir {
        Some(dir) => dir.to_path_buf(),
        None => default_clones_dir()?,
    };
    let target_dir = base_dir.join(name);

    if target_dir.join(".git").exists() {
        fetch_repo(&target_dir);
        return Ok(target_dir);
    }

    std::fs::create_dir_all(&base_dir)
        .map_err(|e| Error::Git(format!("Failed to create clones directory: {}", e)))?;

    info!(url, target = %target_dir.display(), "Cloning repository");
    Repository::clone(url, &target_dir).map_err(|e| {
        let message = e.message().to_lowercase();
        if e.code() == git2::ErrorCode::Auth || message.contains("authentication") {
            Error::Git(format!(
                "Authentication failed for {}. Check your credentials or repository access.",
                url
            ))
        } else if message.contains("not found") || message.contains("404") {
            Error::Git(format!("Repository not found: {}. Check the URL is correct.", url))
        } else {
            Error::Git(format!("Clone of {} failed: {}", url, e.message()))
        }
    })?;

    Ok(target_dir)
}

/// Fetch origin for a cached clone
///
/// Fetch errors are logged; the cached copy stays usable.
pub fn fetch_repo(repo_path: &Path) {
    let result = Repository::open(repo_path).and_then(|repo| {
        let mut remote = repo.find_remote("origin")?;
        remote.fetch(&[] as &[&str], None, None)
    });

    match result {
        Ok(()) => info!(path = %repo_path.display(), "Fetched cached clone"),
        Err(e) => warn!(path = %repo_path.display(), error = %e.message(), "git fetch failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo(dir: &Path) {
        let repo = Repository::init(dir).unwrap();
        std::fs::write(dir.join("package.json"), "{}").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("package.json")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
            .unwrap();
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://github.com/acme/shop"));
        assert!(is_remote("http://example.com/x.git"));
        assert!(!is_remote("./localapp"));
        assert!(!is_remote("/abs/path"));
        assert!(!is_remote("git@github.com:acme/shop.git"));
    }

    #[test]
    fn test_repo_name_from_url() {
        assert_eq!(
            repo_name_from_url("https://github.com/acme/shop.git").unwrap(),
            "shop"
        );
        assert_eq!(
            repo_name_from_url("https://github.com/acme/shop/").unwrap(),
            "shop"
        );
        assert!(repo_name_from_url("https://github.com/").is_err());
    }

    #[test]
    fn test_parse_source() {
        assert_eq!(
            RepoSource::parse("./app").unwrap(),
            RepoSource::Local(PathBuf::from("./app"))
        );
        assert_eq!(
            RepoSource::parse("https://github.com/acme/site.git").unwrap(),
            RepoSource::Remote {
                url: "https://github.com/acme/site.git".to_string(),
                name: "site".to_string()
            }
        );
    }

    #[test]
    fn test_clone_then_reuse() {
        let origin = TempDir::new().unwrap();
        init_repo(origin.path());
        let cache = TempDir::new().unwrap();
        let url = origin.path().to_string_lossy().to_string();

        let cloned = clone_repo(&url, "site", Some(cache.path())).unwrap();
        assert!(cloned.join("package.json").exists());

        // second call finds the clone and only fetches
        let again = clone_repo(&url, "site", Some(cache.path())).unwrap();
        assert_eq!(cloned, again);
    }

    #[test]
    fn test_clone_missing_repo() {
        let cache = TempDir::new().unwrap();
        let missing = cache.path().join("no-such-repo");
        let result = clone_repo(&missing.to_string_lossy(), "x", Some(cache.path()));
        assert!(matches!(result, Err(Error::Git(_))));
    }
}
