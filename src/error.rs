//! Structured error types for project-kit operations.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Lookup errors
    ProjectNotFound,
    FileNotFound,
    KeyNotFound,

    // Validation errors
    ConfigurationConflict,
    InvalidArgument,
    InvalidDocument,

    // Loading errors
    ModuleImportFailure,
    DescriptorExists,

    // Internal errors
    IoError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            ErrorCode::ProjectNotFound => "PROJECT_NOT_FOUND",
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::KeyNotFound => "KEY_NOT_FOUND",
            ErrorCode::ConfigurationConflict => "CONFIGURATION_CONFLICT",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::InvalidDocument => "INVALID_DOCUMENT",
            ErrorCode::ModuleImportFailure => "MODULE_IMPORT_FAILURE",
            ErrorCode::DescriptorExists => "DESCRIPTOR_EXISTS",
            ErrorCode::IoError => "IO_ERROR",
        };
        write!(f, "{}", code)
    }
}

/// Errors raised while locating a project, reading its files, or resolving
/// configuration and job arguments.
#[derive(Debug, Error)]
pub enum PkitError {
    /// No descriptor marker within the search depth.
    #[error("{markers:?} file(s) not found at depth {depth}")]
    ProjectNotFound { markers: Vec<String>, depth: usize },

    /// A required (non-safe) file read found nothing at the path.
    #[error("{} does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// Configuration defines names that are protected by constants.
    #[error("Configuration cannot overwrite constants: {}", .keys.join(", "))]
    ConfigurationConflict { keys: Vec<String> },

    /// Strict lookup without a default found nothing.
    #[error("{0} not found in config, or constants")]
    KeyNotFound(String),

    /// Malformed call or value of the wrong shape.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A job (or constants) source could not be loaded.
    #[error("Failed to load module at {}: {reason}", .path.display())]
    ModuleImport { path: PathBuf, reason: String },

    /// A file exists but is not a valid YAML document of the expected shape.
    #[error("Invalid document at {}: {reason}", .path.display())]
    InvalidDocument { path: PathBuf, reason: String },

    /// `pkit init` would overwrite an existing descriptor.
    #[error("{} already exists (use --force to overwrite)", .0.display())]
    DescriptorExists(PathBuf),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PkitError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PkitError::ProjectNotFound { .. } => ErrorCode::ProjectNotFound,
            PkitError::FileNotFound(_) => ErrorCode::FileNotFound,
            PkitError::ConfigurationConflict { .. } => ErrorCode::ConfigurationConflict,
            PkitError::KeyNotFound(_) => ErrorCode::KeyNotFound,
            PkitError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            PkitError::ModuleImport { .. } => ErrorCode::ModuleImportFailure,
            PkitError::InvalidDocument { .. } => ErrorCode::InvalidDocument,
            PkitError::DescriptorExists(_) => ErrorCode::DescriptorExists,
            PkitError::Io { .. } => ErrorCode::IoError,
        }
    }

    // Convenience constructors

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        PkitError::InvalidArgument(reason.into())
    }

    pub fn key_not_found(key: &str) -> Self {
        PkitError::KeyNotFound(key.to_string())
    }

    pub fn module_import(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        PkitError::ModuleImport {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_document(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        PkitError::InvalidDocument {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PkitError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for project-kit operations.
pub type Result<T> = std::result::Result<T, PkitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_variants() {
        assert_eq!(
            PkitError::key_not_found("host").code(),
            ErrorCode::KeyNotFound
        );
        assert_eq!(
            PkitError::ConfigurationConflict { keys: vec!["X".into()] }.code(),
            ErrorCode::ConfigurationConflict
        );
        assert_eq!(
            PkitError::module_import("/jobs/a.py", "missing").code(),
            ErrorCode::ModuleImportFailure
        );
    }

    #[test]
    fn test_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::ConfigurationConflict).unwrap();
        assert_eq!(json, "\"CONFIGURATION_CONFLICT\"");
        assert_eq!(ErrorCode::ModuleImportFailure.to_string(), "MODULE_IMPORT_FAILURE");
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            PkitError::key_not_found("host").to_string(),
            "host not found in config, or constants"
        );
        let err = PkitError::ConfigurationConflict {
            keys: vec!["A".into(), "B".into()],
        };
        assert_eq!(err.to_string(), "Configuration cannot overwrite constants: A, B");
    }
}
