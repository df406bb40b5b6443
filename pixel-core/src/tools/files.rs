//! File tools scoped to a base directory

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::plan::is_safe_target;
use crate::{Error, Result};

/// Join `relative` onto `base`, refusing anything that would leave `base`
pub fn resolve_within(base: &Path, relative: &str) -> Result<PathBuf> {
    if !is_safe_target(relative) {
        return Err(Error::Plan(format!(
            "Refusing to write outside {}: {}",
            base.display(),
            relative
        )));
    }
    Ok(base.join(relative.trim().replace('\\', "/")))
}

/// Write `contents` to `base/relative`, creating parent directories
pub fn write_file(base: &Path, relative: &str, contents: &str) -> Result<PathBuf> {
    let path = resolve_within(base, relative)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, contents)?;
    debug!(path = %path.display(), bytes = contents.len(), "Wrote file");
    Ok(path)
}

/// Copy `source_root/source` to `base/target` byte for byte
pub fn copy_file(source_root: &Path, source: &str, base: &Path, target: &str) -> Result<PathBuf> {
    let from = resolve_within(source_root, source)?;
    let to = resolve_within(base, target)?;
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(&from, &to)?;
    debug!(from = %from.display(), to = %to.display(), "Copied file");
    Ok(to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "pages/blog/[slug].vue", "<template/>").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<template/>");
    }

    #[test]
    fn test_write_rejects_escape() {
        let dir = TempDir::new().unwrap();
        assert!(write_file(dir.path(), "../outside.txt", "x").is_err());
        assert!(write_file(dir.path(), "/tmp/abs.txt", "x").is_err());
    }

    #[test]
    fn test_copy_is_byte_exact() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let bytes = [0u8, 159, 146, 150, 255];
        std::fs::create_dir_all(src.path().join("public")).unwrap();
        std::fs::write(src.path().join("public/favicon.ico"), bytes).unwrap();

        let to = copy_file(src.path(), "public/favicon.ico", out.path(), "public/favicon.ico")
            .unwrap();
        assert_eq!(std::fs::read(to).unwrap(), bytes);
    }
}
