//! Job argument resolution.
//!
//! A job named `etl.load` has an argument file at
//! `<root>/<config_folder>/<args_config_folder>/etl/load.yaml`:
//!
//! ```yaml
//! job: etl.loader          # optional, defaults to the job name
//! config:                  # optional, merged into the configuration
//!   batch_size: 500
//! env:                     # optional, blocks keyed by environment name
//!   prod:
//!     batch_size: 5000
//! extract:                 # every other key is an argument group
//!   args: [SOURCE_TABLE]
//!   kwargs: {limit: 10}
//! ```

use crate::config::files::{kind, read_mapping};
use crate::config::handler::{ConfigHandler, ConfigSource};
use crate::config::merge::substitute_map;
use crate::config::types::HandlerOptions;
use crate::error::{PkitError, Result};
use crate::jobs::{Job, JobLoader};
use crate::paths::{JOB_EXT, YAML_EXT, job_ext_regex, resolve_path, yaml_ext_regex};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Argument-file key naming the job file.
pub const JOB_KEY: &str = "job";
/// Argument-file key holding configuration to merge.
pub const CONFIG_KEY: &str = "config";
/// Argument-file key holding per-environment configuration.
pub const ENV_KEY: &str = "env";

/// Keys of an argument file that are not argument groups.
pub const RESERVED_KEYS: [&str; 3] = [JOB_KEY, CONFIG_KEY, ENV_KEY];

/// Positional and keyword values for one named argument group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArgGroup {
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl ArgGroup {
    /// Derive a group from a config value.
    ///
    /// - A mapping whose keys are all `args`/`kwargs` is split accordingly.
    /// - Any other mapping is keyword values.
    /// - A sequence is positional values.
    /// - Anything else is the single positional value.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(mut map)
                if map.keys().all(|k| k == "args" || k == "kwargs") =>
            {
                let args = match map.remove("args") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(items)) => items,
                    Some(other) => vec![other],
                };
                let kwargs = match map.remove("kwargs") {
                    None | Some(Value::Null) => Map::new(),
                    Some(Value::Object(kwargs)) => kwargs,
                    Some(other) => {
                        return Err(PkitError::invalid_argument(format!(
                            "kwargs must be a mapping, got {}",
                            kind(&other)
                        )));
                    }
                };
                Ok(Self { args, kwargs })
            }
            Value::Object(kwargs) => Ok(Self {
                args: Vec::new(),
                kwargs,
            }),
            Value::Array(args) => Ok(Self {
                args,
                kwargs: Map::new(),
            }),
            other => Ok(Self {
                args: vec![other],
                kwargs: Map::new(),
            }),
        }
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.kwargs.get(name)
    }

    /// Deserialize the keyword values into a typed struct.
    pub fn kwargs_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.kwargs.clone()))
            .map_err(|e| PkitError::invalid_argument(format!("kwargs: {e}")))
    }

    /// Deserialize the positional values into a typed tuple or sequence.
    pub fn args_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Array(self.args.clone()))
            .map_err(|e| PkitError::invalid_argument(format!("args: {e}")))
    }
}

/// A job resolved to its file and argument groups, with the configuration it runs under.
#[derive(Debug, Clone)]
pub struct ConfigArgs {
    name: String,
    handler: ConfigHandler,
    args_path: PathBuf,
    job_path: PathBuf,
    groups: BTreeMap<String, ArgGroup>,
}

impl ConfigArgs {
    /// Resolve `name` in the project selected by `options`.
    pub fn new(
        name: &str,
        options: HandlerOptions,
        overrides: Option<Map<String, Value>>,
    ) -> Result<Self> {
        let handler = ConfigHandler::with_options(options)?;
        Self::with_handler(name, handler, overrides)
    }

    /// Resolve `name` against an existing handler, which is then owned by the result.
    pub fn with_handler(
        name: &str,
        mut handler: ConfigHandler,
        overrides: Option<Map<String, Value>>,
    ) -> Result<Self> {
        let yaml = yaml_ext_regex();
        let job_ext = job_ext_regex();
        let root = handler.project_root().to_path_buf();
        let descriptor = handler.descriptor().clone();

        let args_path = resolve_path(
            name,
            &root,
            &[&descriptor.config_folder, &descriptor.args_config_folder],
            YAML_EXT,
            Some(yaml),
        )?;
        let mut content = read_mapping(&args_path, false)?;

        let job = content.remove(JOB_KEY);
        let job_config = content.remove(CONFIG_KEY);
        let env_blocks = content.remove(ENV_KEY);

        let job_name = match job {
            Some(Value::String(job)) => job,
            None | Some(Value::Null) => yaml.replace(name, "").into_owned(),
            Some(other) => {
                return Err(PkitError::invalid_argument(format!(
                    "{JOB_KEY} must be a string, got {}",
                    kind(&other)
                )));
            }
        };
        let job_path = resolve_path(
            &job_name,
            &root,
            &[&descriptor.jobs_folder],
            JOB_EXT,
            Some(job_ext),
        )?;

        let mut sources = Vec::new();
        if let Some(values) = section(CONFIG_KEY, job_config)? {
            sources.push(ConfigSource::Mapping(values));
        }
        if let Some(values) = env_section(env_blocks, handler.environment())? {
            sources.push(ConfigSource::Mapping(values));
        }
        if let Some(values) = overrides {
            sources.push(ConfigSource::Mapping(values));
        }
        handler.update(sources, Map::new())?;

        let content = substitute_map(&content, handler.config());
        let groups = content
            .into_iter()
            .map(|(key, value)| Ok((key, ArgGroup::from_value(value)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        debug!(
            job = %name,
            args_path = %args_path.display(),
            job_path = %job_path.display(),
            groups = groups.len(),
            "Resolved job arguments"
        );

        Ok(Self {
            name: name.to_string(),
            handler,
            args_path,
            job_path,
            groups,
        })
    }

    /// Name the job was requested by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved job file.
    pub fn job_path(&self) -> &Path {
        &self.job_path
    }

    /// Argument file the job was resolved from.
    pub fn args_path(&self) -> &Path {
        &self.args_path
    }

    pub fn handler(&self) -> &ConfigHandler {
        &self.handler
    }

    pub fn group(&self, name: &str) -> Option<&ArgGroup> {
        self.groups.get(name)
    }

    /// Like `group`, failing with `KeyNotFound` when absent.
    pub fn require_group(&self, name: &str) -> Result<&ArgGroup> {
        self.group(name).ok_or_else(|| PkitError::key_not_found(name))
    }

    pub fn groups(&self) -> &BTreeMap<String, ArgGroup> {
        &self.groups
    }

    /// Hand the job file to `loader`.
    pub fn load_job(&self, loader: &dyn JobLoader) -> Result<Box<dyn Job>> {
        loader.load(&self.job_path)
    }

    /// Everything a job process needs, as JSON.
    pub fn payload(&self) -> Value {
        json!({
            "job": self.name,
            "job_path": self.job_path,
            "environment": self.handler.environment(),
            "config": self.handler.effective(),
            "args": self.groups,
        })
    }
}

/// A reserved section that must be a mapping when present.
fn section(key: &str, value: Option<Value>) -> Result<Option<Map<String, Value>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(PkitError::invalid_argument(format!(
            "{key} must be a mapping, got {}",
            kind(&other)
        ))),
    }
}

/// The `env` block for the active environment, if there is one.
fn env_section(
    env_blocks: Option<Value>,
    environment: Option<&str>,
) -> Result<Option<Map<String, Value>>> {
    let Some(mut blocks) = section(ENV_KEY, env_blocks)? else {
        return Ok(None);
    };
    match environment {
        Some(env) => section(&format!("{ENV_KEY}.{env}"), blocks.remove(env)),
        None => Ok(None),
    }
}
