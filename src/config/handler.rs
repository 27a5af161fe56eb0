//! Layered project configuration.
//!
//! `ConfigHandler` owns the merged configuration of one project:
//!
//! 1. Base config `<root>/<config_folder>/<config_filename>` (optional file)
//! 2. Environment overlay `<root>/<config_folder>/<env>.yaml` (optional file)
//! 3. Updates merged in later by callers
//!
//! Every layer is a shallow merge. After each merge, values that name another
//! key are substituted once, and no key may collide with a protected constant.
//!
//! Lookups check constants first, then configuration, then the caller's
//! default. A resolved string that is an upper-case key is followed exactly
//! one hop.

use crate::config::constants::Constants;
use crate::config::files::{kind, read_mapping};
use crate::config::merge::{shallow_merge, substitute_map};
use crate::config::types::{HandlerOptions, ProjectDescriptor};
use crate::error::{PkitError, Result};
use crate::paths::{YAML_EXT, locate_project_root};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One input to `ConfigHandler::update`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Merged as-is.
    Mapping(Map<String, Value>),
    /// YAML file, absolute or relative to the project root. A missing file contributes nothing.
    File(PathBuf),
}

impl TryFrom<Value> for ConfigSource {
    type Error = PkitError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(ConfigSource::Mapping(map)),
            Value::String(path) => Ok(ConfigSource::File(PathBuf::from(path))),
            other => Err(PkitError::invalid_argument(format!(
                "update expects a mapping or a file path, got {}",
                kind(&other)
            ))),
        }
    }
}

impl From<Map<String, Value>> for ConfigSource {
    fn from(map: Map<String, Value>) -> Self {
        ConfigSource::Mapping(map)
    }
}

impl From<PathBuf> for ConfigSource {
    fn from(path: PathBuf) -> Self {
        ConfigSource::File(path)
    }
}

impl From<&Path> for ConfigSource {
    fn from(path: &Path) -> Self {
        ConfigSource::File(path.to_path_buf())
    }
}

/// Merged configuration and protected constants for one project.
#[derive(Debug, Clone)]
pub struct ConfigHandler {
    project_root: PathBuf,
    descriptor: ProjectDescriptor,
    constants: Option<Constants>,
    config: Map<String, Value>,
    environment: Option<String>,
}

impl ConfigHandler {
    /// Build a handler for the project containing the current directory.
    pub fn new() -> Result<Self> {
        Self::with_options(HandlerOptions::default())
    }

    /// Build a handler from explicit options.
    pub fn with_options(options: HandlerOptions) -> Result<Self> {
        let project_root = match options.project_root {
            Some(root) => root,
            None => {
                let start = match options.start_dir {
                    Some(dir) => dir,
                    None => std::env::current_dir().map_err(|e| PkitError::io(".", e))?,
                };
                locate_project_root(&start)?
            }
        };
        let descriptor = ProjectDescriptor::load(&project_root)?;

        let constants = match options.constants {
            Some(values) => Some(Constants::new(values)),
            None => match (&options.constants_hint, &descriptor.constants_package_name) {
                (Some(hint), _) => Constants::from_hint(&project_root, &descriptor, hint),
                (None, Some(package)) => {
                    Constants::from_package(&project_root, &descriptor, Path::new(package))
                }
                (None, None) => None,
            },
        };

        let (config, environment) =
            Self::load_config(&project_root, &descriptor, options.environment)?;
        let config = substitute_map(&config, &config);

        let handler = Self {
            project_root,
            descriptor,
            constants,
            config,
            environment,
        };
        handler.check_protected_keys(&handler.config)?;

        info!(
            root = %handler.project_root.display(),
            environment = handler.environment.as_deref().unwrap_or("-"),
            keys = handler.config.len(),
            "Configuration loaded"
        );
        Ok(handler)
    }

    /// Assemble a handler from already-resolved parts.
    ///
    /// No files are read and no substitution pass runs; only the constants
    /// protection is checked.
    pub fn from_parts(
        project_root: impl Into<PathBuf>,
        descriptor: ProjectDescriptor,
        config: Map<String, Value>,
        constants: Option<Map<String, Value>>,
        environment: Option<String>,
    ) -> Result<Self> {
        let handler = Self {
            project_root: project_root.into(),
            descriptor,
            constants: constants.map(Constants::new),
            config,
            environment,
        };
        handler.check_protected_keys(&handler.config)?;
        Ok(handler)
    }

    /// Read the base config, pick the environment, and merge its overlay.
    fn load_config(
        root: &Path,
        descriptor: &ProjectDescriptor,
        environment: Option<String>,
    ) -> Result<(Map<String, Value>, Option<String>)> {
        let config_dir = descriptor.config_dir(root);
        let mut config = read_mapping(&config_dir.join(&descriptor.config_filename), true)?;

        let default_env = match config.remove(&descriptor.default_env_key) {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        let environment = environment.or(default_env).filter(|e| !e.is_empty());

        if let Some(ref env) = environment {
            let overlay_path = config_dir.join(format!("{env}.{YAML_EXT}"));
            let overlay = read_mapping(&overlay_path, true)?;
            debug!(environment = %env, keys = overlay.len(), "Merging environment overlay");
            shallow_merge(&mut config, overlay);
        }
        Ok((config, environment))
    }

    /// Merge `sources` in order, then `overrides`, re-substitute and re-check constants.
    ///
    /// The update is all-or-nothing: on error the configuration is unchanged.
    pub fn update<I>(&mut self, sources: I, overrides: Map<String, Value>) -> Result<()>
    where
        I: IntoIterator<Item = ConfigSource>,
    {
        let mut config = self.config.clone();
        for source in sources {
            match source {
                ConfigSource::Mapping(map) => shallow_merge(&mut config, map),
                ConfigSource::File(path) => {
                    let path = self.project_path(&path);
                    let values = read_mapping(&path, true)?;
                    debug!(path = %path.display(), keys = values.len(), "Merging config file");
                    shallow_merge(&mut config, values);
                }
            }
        }
        shallow_merge(&mut config, overrides);

        let config = substitute_map(&config, &config);
        self.check_protected_keys(&config)?;
        self.config = config;
        Ok(())
    }

    /// `update` for loosely-typed inputs: each value must be a mapping or a path string.
    pub fn update_values<I>(&mut self, values: I, overrides: Map<String, Value>) -> Result<()>
    where
        I: IntoIterator<Item = Value>,
    {
        let sources = values
            .into_iter()
            .map(ConfigSource::try_from)
            .collect::<Result<Vec<_>>>()?;
        self.update(sources, overrides)
    }

    /// Set a single key.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        let mut overrides = Map::new();
        overrides.insert(key.into(), value);
        self.update(Vec::new(), overrides)
    }

    fn project_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Ensure the configuration does not overwrite constants.
    fn check_protected_keys(&self, config: &Map<String, Value>) -> Result<()> {
        if let Some(ref constants) = self.constants {
            let keys = constants.conflicts(config);
            if !keys.is_empty() {
                return Err(PkitError::ConfigurationConflict { keys });
            }
        }
        Ok(())
    }

    fn raw(&self, key: &str) -> Option<&Value> {
        self.constants
            .as_ref()
            .and_then(|c| c.get(key))
            .or_else(|| self.config.get(key))
    }

    /// Follow one alias hop: an all-upper-case string naming a known key.
    fn resolve_alias<'a>(&'a self, value: &'a Value) -> &'a Value {
        if let Value::String(s) = value
            && is_upper(s)
            && let Some(target) = self.raw(s)
        {
            return target;
        }
        value
    }

    /// Look up `key`: constants, then configuration.
    ///
    /// Configuration loaded through `with_options` or `update` has already been
    /// through one substitution pass, so with `{FOO: BAR, BAR: BAZ, BAZ: 9}` the
    /// stored `FOO` is `"BAZ"` and the alias hop here yields `9`. Handlers built
    /// with `from_parts` skip that pass and `FOO` yields `"BAZ"`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.raw(key).map(|v| self.resolve_alias(v).clone())
    }

    /// Look up `key`, falling back to `default`. The default is alias-resolved too.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        match self.raw(key) {
            Some(value) => self.resolve_alias(value).clone(),
            None => self.resolve_alias(&default).clone(),
        }
    }

    /// Look up `key`, failing with `KeyNotFound` when absent.
    pub fn require(&self, key: &str) -> Result<Value> {
        self.get(key).ok_or_else(|| PkitError::key_not_found(key))
    }

    /// Look up `key` and deserialize it.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.require(key)?;
        serde_json::from_value(value)
            .map_err(|e| PkitError::invalid_argument(format!("{key}: {e}")))
    }

    /// True if `key` is a configuration key or a constant.
    pub fn contains(&self, key: &str) -> bool {
        self.config.contains_key(key)
            || self.constants.as_ref().is_some_and(|c| c.contains(key))
    }

    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub fn constants(&self) -> Option<&Constants> {
        self.constants.as_ref()
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn descriptor(&self) -> &ProjectDescriptor {
        &self.descriptor
    }

    /// Constants layered over configuration, as seen by lookups (before alias resolution).
    pub fn effective(&self) -> Map<String, Value> {
        let mut merged = self.config.clone();
        if let Some(ref constants) = self.constants {
            shallow_merge(&mut merged, constants.as_map().clone());
        }
        merged
    }
}

impl fmt::Display for ConfigHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let constants = self
            .constants
            .as_ref()
            .map(|c| Value::Object(c.as_map().clone()))
            .unwrap_or(Value::Null);
        writeln!(f, "ConfigHandler:")?;
        writeln!(f, "- constants: {}", constants)?;
        write!(f, "- config: {}", Value::Object(self.config.clone()))
    }
}

/// At least one cased character and none of them lower case.
fn is_upper(s: &str) -> bool {
    s.chars().any(char::is_uppercase) && !s.chars().any(char::is_lowercase)
}
