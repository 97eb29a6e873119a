//! Error types for loading and building command definitions.

use argspec_core::{ErrorKind, SpecError};
use thiserror::Error;

/// Errors that can occur while reading or building a definition.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The file extension is neither JSON nor YAML.
    #[error("unsupported definition format: {0}")]
    UnsupportedFormat(String),

    /// The definition builds a structurally invalid command.
    #[error("invalid command definition: {0}")]
    InvalidSpec(#[from] SpecError),

    /// Two groups, positionals or commands share a name.
    #[error("duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    /// A group member or attach entry names nothing known.
    #[error("unknown {kind} '{name}' referenced by {owner}")]
    UnknownReference {
        kind: &'static str,
        name: String,
        owner: String,
    },

    /// Groups reference each other in a loop (e.g., `a b a`).
    #[error("group cycle detected at path: {0}")]
    GroupCycle(String),
}

impl DefinitionError {
    /// Engine errors keep their own kind; everything else is a definition mistake.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSpec(err) => err.kind(),
            _ => ErrorKind::InvalidDefinition,
        }
    }
}

/// Convenience alias for results with [`DefinitionError`].
pub type Result<T> = std::result::Result<T, DefinitionError>;
