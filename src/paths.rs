//! Project root discovery and logical-name path resolution.
//!
//! This module provides:
//! - `dir_search`/`locate_project_root`: walk parent directories looking for a marker file
//! - `resolve_path`: turn a dotted or slashed logical name into a concrete file path
//!
//! `resolve_path` is pure path manipulation (no filesystem I/O). It is shared by
//! job-argument lookup and job-file lookup, which differ only in the subfolders
//! and extension they supply.

use crate::error::{PkitError, Result};
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// Marker file identifying a project root.
pub const PKIT_CONFIG_FILENAME: &str = ".pkit";

/// Maximum number of directories inspected by `dir_search`.
pub const MAX_DIR_SEARCH_DEPTH: usize = 6;

/// Extension pattern for YAML documents.
pub const YAML_EXT_PATTERN: &str = r"\.(yaml|yml)$";

/// Default extension for YAML documents.
pub const YAML_EXT: &str = "yaml";

/// Extension pattern for job files.
pub const JOB_EXT_PATTERN: &str = r"\.py$";

/// Default extension for job files.
pub const JOB_EXT: &str = "py";

/// Search `start` and its parents for a directory containing one of `search_names`.
///
/// At most `max_depth` directories are inspected. The true filesystem root is not
/// detected; once the parent of a directory is itself, the same directory is
/// simply inspected again until the budget runs out.
///
/// Returns `default` when nothing matches, or `ProjectNotFound` if no default is given.
pub fn dir_search(
    start: &Path,
    search_names: &[&str],
    max_depth: usize,
    default: Option<PathBuf>,
) -> Result<PathBuf> {
    let mut directory = start.to_path_buf();
    for _ in 0..max_depth {
        if contains_any(&directory, search_names)? {
            debug!(dir = %directory.display(), "Found project marker");
            return Ok(directory);
        }
        directory = match directory.parent() {
            Some(parent) => parent.to_path_buf(),
            None => directory,
        };
    }

    match default {
        Some(default) => Ok(default),
        None => Err(PkitError::ProjectNotFound {
            markers: search_names.iter().map(|s| s.to_string()).collect(),
            depth: max_depth,
        }),
    }
}

fn contains_any(directory: &Path, search_names: &[&str]) -> Result<bool> {
    let entries = std::fs::read_dir(directory).map_err(|e| PkitError::io(directory, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| PkitError::io(directory, e))?;
        let name = entry.file_name();
        if search_names.iter().any(|n| name.as_os_str() == *n) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Locate the project root (the directory holding `.pkit`) starting at `start`.
pub fn locate_project_root(start: &Path) -> Result<PathBuf> {
    dir_search(start, &[PKIT_CONFIG_FILENAME], MAX_DIR_SEARCH_DEPTH, None)
}

/// Locate the project root starting at the current working directory.
pub fn locate_project_root_from_cwd() -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(|e| PkitError::io(".", e))?;
    locate_project_root(&cwd)
}

static YAML_EXT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(YAML_EXT_PATTERN).expect("YAML_EXT_PATTERN is a valid regex"));

static JOB_EXT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(JOB_EXT_PATTERN).expect("JOB_EXT_PATTERN is a valid regex"));

/// `YAML_EXT_PATTERN`, compiled once.
pub fn yaml_ext_regex() -> &'static Regex {
    &YAML_EXT_REGEX
}

/// `JOB_EXT_PATTERN`, compiled once.
pub fn job_ext_regex() -> &'static Regex {
    &JOB_EXT_REGEX
}

/// Compile a caller-supplied extension pattern.
pub fn ext_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| PkitError::invalid_argument(format!("bad pattern {pattern}: {e}")))
}

/// Resolve a logical `name` to a file path under `project_root`.
///
/// - A name starting with `/` is returned unchanged.
/// - If `ext_pattern` matches the end of the name, the matched suffix becomes the
///   extension and is stripped from the name; otherwise `ext` is used.
/// - Every `.` left in the name becomes a path separator (`a.b.job` -> `a/b/job`).
/// - The result is `<project_root>/<subfolders..>/<name>.<ext>`.
pub fn resolve_path(
    name: &str,
    project_root: &Path,
    subfolders: &[&str],
    ext: &str,
    ext_pattern: Option<&Regex>,
) -> Result<PathBuf> {
    if name.starts_with('/') {
        return Ok(PathBuf::from(name));
    }

    let (stem, ext) = match ext_pattern.and_then(|p| p.find(name)) {
        Some(m) => (&name[..m.start()], m.as_str()),
        None => (name, ext),
    };
    let ext = ext.trim_start_matches('.');

    let stem = stem.replace('.', "/");
    let stem = stem.trim_matches('/');
    if stem.is_empty() || stem.split('/').any(|part| part.is_empty() || part == "..") {
        return Err(PkitError::invalid_argument(format!(
            "malformed name '{name}'"
        )));
    }

    let mut path = project_root.to_path_buf();
    for folder in subfolders.iter().filter(|f| !f.is_empty()) {
        path.push(folder);
    }
    path.push(stem);

    if ext.is_empty() {
        return Ok(path);
    }
    let mut file = path.into_os_string();
    file.push(".");
    file.push(ext);
    Ok(PathBuf::from(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn yaml() -> Regex {
        yaml_ext_regex().clone()
    }

    #[test]
    fn test_dotted_and_slashed_names_agree() {
        let root = Path::new("/p");
        let dotted = resolve_path("a.b.job", root, &["config", "args"], YAML_EXT, Some(&yaml())).unwrap();
        let slashed = resolve_path("a/b/job", root, &["config", "args"], YAML_EXT, Some(&yaml())).unwrap();
        assert_eq!(dotted, slashed);
        assert_eq!(dotted, PathBuf::from("/p/config/args/a/b/job.yaml"));
    }

    #[test]
    fn test_absolute_name_passthrough() {
        let path = resolve_path("/x/y", Path::new("/p"), &["config", "args"], YAML_EXT, Some(&yaml())).unwrap();
        assert_eq!(path, PathBuf::from("/x/y"));
    }

    #[test]
    fn test_matching_extension_is_kept() {
        let root = Path::new("/p");
        let yml = resolve_path("a.job.yml", root, &["config"], YAML_EXT, Some(&yaml())).unwrap();
        assert_eq!(yml, PathBuf::from("/p/config/a/job.yml"));

        let yaml_ext = resolve_path("a.job.yaml", root, &["config"], YAML_EXT, Some(&yaml())).unwrap();
        assert_eq!(yaml_ext, PathBuf::from("/p/config/a/job.yaml"));
    }

    #[test]
    fn test_job_extension() {
        let pattern = job_ext_regex();
        let root = Path::new("/p");
        let with_ext = resolve_path("etl.load.py", root, &["jobs"], JOB_EXT, Some(pattern)).unwrap();
        let without = resolve_path("etl.load", root, &["jobs"], JOB_EXT, Some(pattern)).unwrap();
        assert_eq!(with_ext, PathBuf::from("/p/jobs/etl/load.py"));
        assert_eq!(with_ext, without);
    }

    #[test]
    fn test_no_pattern_uses_default_ext() {
        let path = resolve_path("job", Path::new("/p"), &[], ".yaml", None).unwrap();
        assert_eq!(path, PathBuf::from("/p/job.yaml"));
    }

    #[test]
    fn test_malformed_names_rejected() {
        let root = Path::new("/p");
        assert!(resolve_path("", root, &[], YAML_EXT, None).is_err());
        assert!(resolve_path("a..b", root, &[], YAML_EXT, None).is_err());
        assert!(resolve_path(".yaml", root, &[], YAML_EXT, Some(&yaml())).is_err());
    }

    #[test]
    fn test_dir_search_walks_up() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(PKIT_CONFIG_FILENAME), "").unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = locate_project_root(&nested).unwrap();
        assert_eq!(found, temp.path());
    }

    #[test]
    fn test_dir_search_respects_depth() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("marker"), "").unwrap();
        let nested = temp.path().join("a").join("b").join("c");
        std::fs::create_dir_all(&nested).unwrap();

        // Three levels below the marker needs four inspections.
        let err = dir_search(&nested, &["marker"], 3, None).unwrap_err();
        assert!(matches!(err, PkitError::ProjectNotFound { depth: 3, .. }));

        let found = dir_search(&nested, &["marker"], 4, None).unwrap();
        assert_eq!(found, temp.path());
    }

    #[test]
    fn test_dir_search_default() {
        let temp = TempDir::new().unwrap();
        let fallback = PathBuf::from("/fallback");
        let found = dir_search(temp.path(), &["no-such-marker-xyz"], 1, Some(fallback.clone())).unwrap();
        assert_eq!(found, fallback);
    }

    #[test]
    fn test_shared_extension_regexes() {
        assert!(std::ptr::eq(yaml_ext_regex(), yaml_ext_regex()));
        assert!(yaml_ext_regex().is_match("a/b.yml"));
        assert!(!yaml_ext_regex().is_match("a/b.yaml.bak"));
        assert!(job_ext_regex().is_match("etl.load.py"));
        assert!(ext_pattern(r"\.(").is_err());
    }
}
