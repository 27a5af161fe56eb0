//! Project configuration.
//!
//! Consolidates configuration from several layers with top-level (shallow) merging:
//! 1. **Base** - `<root>/<config_folder>/<config_filename>`
//! 2. **Environment** - `<root>/<config_folder>/<env>.yaml`
//! 3. **Updates** - mappings and files merged in by callers
//! 4. **Job** - `config` and `env.<env>` sections of a job argument file
//!
//! ## Layout
//! The project root is the nearest directory (up to six levels above the start
//! directory) holding a `.pkit` descriptor, which names every folder used here.
//!
//! ## Constants
//! An optional read-only mapping whose names win over configuration and may
//! never be defined by it.

pub mod args;
pub mod constants;
pub mod files;
pub mod handler;
pub mod merge;
pub mod types;

pub use args::{ArgGroup, ConfigArgs, RESERVED_KEYS};
pub use constants::Constants;
pub use files::{read_mapping, read_yaml};
pub use handler::{ConfigHandler, ConfigSource};
pub use merge::{shallow_merge, shallow_merge_all, substitute, substitute_map};
pub use types::{HandlerOptions, ProjectDescriptor};
