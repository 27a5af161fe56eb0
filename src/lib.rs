//! Project Kit Library
//!
//! Locates a project root, merges layered YAML configuration with protected
//! constants, and resolves named jobs to a job file and argument groups.

pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod paths;
pub mod timer;

pub use config::{ArgGroup, ConfigArgs, ConfigHandler, HandlerOptions, ProjectDescriptor};
pub use error::{ErrorCode, PkitError, Result};
