//! Project descriptor and handler options.
//!
//! The descriptor is the `.pkit` file at the project root. It names the
//! folders and conventions used to find configuration, job arguments and jobs.

use crate::config::files::read_yaml;
use crate::error::{PkitError, Result};
use crate::paths::PKIT_CONFIG_FILENAME;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Program used to run job files when the descriptor does not name one.
pub const DEFAULT_JOB_RUNNER: &str = "python3";

/// Layout conventions of a project, loaded once from `<root>/.pkit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    /// Name of the constants document inside the constants package folder.
    pub constants_module_name: String,

    /// Folder (relative to the root) holding configuration files.
    pub config_folder: String,

    /// Base configuration filename inside `config_folder`.
    pub config_filename: String,

    /// Base-config key naming the default environment. Stripped from the config.
    pub default_env_key: String,

    /// Process environment variable that selects the active environment.
    #[serde(alias = "project_kit_env_var_name")]
    pub environment_variable_name: String,

    /// Folder (inside `config_folder`) holding job argument files.
    pub args_config_folder: String,

    /// Folder (relative to the root) holding job files.
    pub jobs_folder: String,

    /// Directory for job logs. `~/` expands to the home directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Package folder holding the constants document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constants_package_name: Option<String>,

    /// Program used to execute job files (default: `python3`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_runner: Option<String>,
}

impl Default for ProjectDescriptor {
    fn default() -> Self {
        Self {
            constants_module_name: "constants".to_string(),
            config_folder: "config".to_string(),
            config_filename: "config.yaml".to_string(),
            default_env_key: "DEFAULT_ENV".to_string(),
            environment_variable_name: "PKIT_ENV".to_string(),
            args_config_folder: "args".to_string(),
            jobs_folder: "jobs".to_string(),
            log_dir: None,
            constants_package_name: None,
            job_runner: None,
        }
    }
}

impl ProjectDescriptor {
    /// Path of the descriptor file for a project root.
    pub fn file_path(root: &Path) -> PathBuf {
        root.join(PKIT_CONFIG_FILENAME)
    }

    /// Load the descriptor at `<root>/.pkit`. A missing descriptor is fatal.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::file_path(root);
        let value = read_yaml(&path, &[], false)?;
        serde_json::from_value(value).map_err(|e| PkitError::invalid_document(&path, e))
    }

    /// Serialize to YAML text, as written by `pkit init`.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| PkitError::invalid_argument(e.to_string()))
    }

    /// Active environment from the process environment, if set and non-empty.
    ///
    /// This is the only place the process environment selects an environment;
    /// the handler itself takes the environment as an explicit option.
    pub fn environment_from_process(&self) -> Option<String> {
        std::env::var(&self.environment_variable_name)
            .ok()
            .filter(|v| !v.is_empty())
    }

    /// Log directory with `~/` expanded, relative paths anchored at `root`.
    pub fn resolved_log_dir(&self, root: &Path) -> Option<PathBuf> {
        let dir = self.log_dir.as_deref()?;
        if let Some(rest) = dir.strip_prefix("~/") {
            return dirs::home_dir().map(|h| h.join(rest));
        }
        let path = Path::new(dir);
        Some(if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        })
    }

    /// Program used to run job files.
    pub fn job_runner(&self) -> &str {
        self.job_runner.as_deref().unwrap_or(DEFAULT_JOB_RUNNER)
    }

    /// `<root>/<config_folder>`
    pub fn config_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.config_folder)
    }
}

/// Inputs to `ConfigHandler` construction.
///
/// Everything the handler would otherwise pick up from process state is an
/// explicit field here: where to start searching, which environment is active,
/// and where constants come from.
#[derive(Debug, Clone, Default)]
pub struct HandlerOptions {
    /// Directory the project search starts from (default: current directory).
    pub start_dir: Option<PathBuf>,
    /// Known project root; skips the search entirely.
    pub project_root: Option<PathBuf>,
    /// Active environment. Falls back to the base config's default environment.
    pub environment: Option<String>,
    /// Path inside the project whose top-level folder holds the constants document.
    pub constants_hint: Option<PathBuf>,
    /// Explicit constants; takes the place of the hint lookup.
    pub constants: Option<Map<String, Value>>,
}

impl HandlerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.start_dir = Some(dir.into());
        self
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    pub fn with_environment(mut self, env: Option<String>) -> Self {
        self.environment = env;
        self
    }

    pub fn with_constants_hint(mut self, hint: impl Into<PathBuf>) -> Self {
        self.constants_hint = Some(hint.into());
        self
    }

    pub fn with_constants(mut self, constants: Map<String, Value>) -> Self {
        self.constants = Some(constants);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DESCRIPTOR: &str = r#"
constants_module_name: constants
config_folder: config
config_filename: config.yaml
default_env_key: DEFAULT_ENV
environment_variable_name: MYENV
args_config_folder: args
jobs_folder: jobs
"#;

    #[test]
    fn test_load_descriptor() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".pkit"), DESCRIPTOR).unwrap();

        let descriptor = ProjectDescriptor::load(temp.path()).unwrap();
        assert_eq!(descriptor.environment_variable_name, "MYENV");
        assert_eq!(descriptor.jobs_folder, "jobs");
        assert_eq!(descriptor.log_dir, None);
        assert_eq!(descriptor.job_runner(), DEFAULT_JOB_RUNNER);
        assert_eq!(descriptor.config_dir(temp.path()), temp.path().join("config"));
    }

    #[test]
    fn test_legacy_env_var_key() {
        let temp = TempDir::new().unwrap();
        let legacy = DESCRIPTOR.replace("environment_variable_name", "project_kit_env_var_name");
        std::fs::write(temp.path().join(".pkit"), legacy).unwrap();

        let descriptor = ProjectDescriptor::load(temp.path()).unwrap();
        assert_eq!(descriptor.environment_variable_name, "MYENV");
    }

    #[test]
    fn test_missing_descriptor_is_fatal() {
        let temp = TempDir::new().unwrap();
        let err = ProjectDescriptor::load(temp.path()).unwrap_err();
        assert!(matches!(err, PkitError::FileNotFound(_)));
    }

    #[test]
    fn test_missing_required_key_is_invalid() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".pkit"), "config_folder: config\n").unwrap();
        let err = ProjectDescriptor::load(temp.path()).unwrap_err();
        assert!(matches!(err, PkitError::InvalidDocument { .. }));
    }

    #[test]
    fn test_default_round_trips_through_yaml() {
        let descriptor = ProjectDescriptor {
            log_dir: Some("logs".into()),
            ..Default::default()
        };
        let yaml = descriptor.to_yaml().unwrap();
        assert!(!yaml.contains("job_runner"));
        let parsed: ProjectDescriptor = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, descriptor);
    }

    #[test]
    fn test_resolved_log_dir() {
        let root = Path::new("/p");
        let mut descriptor = ProjectDescriptor::default();
        assert_eq!(descriptor.resolved_log_dir(root), None);

        descriptor.log_dir = Some("logs".into());
        assert_eq!(descriptor.resolved_log_dir(root), Some(PathBuf::from("/p/logs")));

        descriptor.log_dir = Some("/var/log/pkit".into());
        assert_eq!(descriptor.resolved_log_dir(root), Some(PathBuf::from("/var/log/pkit")));
    }
}
