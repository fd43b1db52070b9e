//! Error types for template loading and rule parsing

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or parsing FM templates
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Failed to read a template file
    #[error("Failed to read template file: {path}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse template JSON
    #[error("Failed to parse template: {0}")]
    ParseError(String),

    /// A connector config rule declares more than one resolution strategy
    #[error("Connector config rule '{0}' declares more than one of value/switch/dynamic.mapper")]
    AmbiguousRule(String),

    /// A connector config rule is structurally invalid
    #[error("Connector config rule '{name}' is invalid: {reason}")]
    InvalidRule { name: String, reason: String },

    /// Template directory does not exist
    #[error("Template directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;
