//! Error types for store, codec and configuration operations.

use thiserror::Error;

use crate::validation::ValidationIssue;

/// Errors that abort an operation.
///
/// Structural problems in a graph are not errors; they are reported through
/// [`crate::validation::ValidationResult`].
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("duplicate interaction ids: {}", .0.join(", "))]
    DuplicateIds(Vec<String>),

    #[error("nothing to export: at least one interaction is required")]
    EmptyExport,

    #[error("export refused: {} validation error(s)", errors.len())]
    InvalidExport { errors: Vec<ValidationIssue> },

    #[error("interaction not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;
