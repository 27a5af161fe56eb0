//! Protected constants.
//!
//! Constants are a read-only mapping loaded once per handler. Their names take
//! precedence over configuration and configuration may never define them.

use crate::config::files::read_mapping;
use crate::config::types::ProjectDescriptor;
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Read-only named values protected from configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constants {
    values: Map<String, Value>,
}

impl Constants {
    /// Build from an explicit mapping. Names starting with `_` are private and dropped.
    pub fn new(values: Map<String, Value>) -> Self {
        let values = values
            .into_iter()
            .filter(|(k, _)| !k.starts_with('_'))
            .collect();
        Self { values }
    }

    /// Load constants for the package folder that contains `hint`.
    ///
    /// The hint is a path inside the project (relative paths are taken from the
    /// root). Its top-level folder under the root is the package, and the
    /// constants live in `<root>/<package>/<constants_module_name>.yaml`.
    /// Any failure means "no constants" and is only logged.
    pub fn from_hint(root: &Path, descriptor: &ProjectDescriptor, hint: &Path) -> Option<Self> {
        let hint = if hint.is_absolute() {
            hint.to_path_buf()
        } else {
            root.join(hint)
        };
        let package = match hint.strip_prefix(root).ok()?.components().next() {
            Some(Component::Normal(name)) => name.to_owned(),
            _ => {
                debug!(hint = %hint.display(), "Constants hint has no package folder");
                return None;
            }
        };
        Self::from_package(root, descriptor, Path::new(&package))
    }

    /// Load `<root>/<package>/<constants_module_name>.yaml`, if it can be read.
    pub fn from_package(root: &Path, descriptor: &ProjectDescriptor, package: &Path) -> Option<Self> {
        let path = Self::document_path(root, descriptor, package);
        match read_mapping(&path, false) {
            Ok(values) => {
                debug!(path = %path.display(), count = values.len(), "Loaded constants");
                Some(Self::new(values))
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Constants unavailable");
                None
            }
        }
    }

    fn document_path(root: &Path, descriptor: &ProjectDescriptor, package: &Path) -> PathBuf {
        root.join(package)
            .join(format!("{}.yaml", descriptor.constants_module_name))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Protected names that `config` also defines, sorted.
    pub fn conflicts(&self, config: &Map<String, Value>) -> Vec<String> {
        // Map keys iterate in sorted order.
        self.values
            .keys()
            .filter(|k| config.contains_key(k.as_str()))
            .cloned()
            .collect()
    }
}
