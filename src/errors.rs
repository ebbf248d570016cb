// Copyright 2025 Cowboy AI, LLC.

//! Error types for resolution and composition
//!
//! Only fatal conditions live here: unknown names, cyclic inheritance, loader
//! failures and malformed definition input. Collisions and rule violations are
//! data, see [`crate::diagnostics`].

use thiserror::Error;

use crate::diagnostics::ValidationIssue;

/// Errors reported by a [`crate::loader::DefinitionLoader`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// No definition with the requested name exists
    #[error("Definition not found: {0}")]
    NotFound(String),

    /// The definition exists but could not be parsed
    #[error("Failed to parse definition {name}: {reason}")]
    Parse {
        /// Name of the definition being parsed
        name: String,
        /// Parser message
        reason: String,
    },
}

/// Errors that abort resolution or composition
#[derive(Debug, Clone, Error)]
pub enum ComposeError {
    /// The requested object (or one of its bases) does not exist
    #[error("Unknown object: {0}")]
    UnknownObject(String),

    /// A trait referenced by the resolution plan does not exist
    #[error("Unknown trait: {name} (referenced by {referenced_by})")]
    UnknownTrait {
        /// Name of the missing trait
        name: String,
        /// Object that referenced the trait
        referenced_by: String,
    },

    /// The `extends` chain revisits an object
    #[error("Cyclic extends chain: {}", chain.join(" -> "))]
    CyclicExtends {
        /// Object names in visiting order, ending with the repeated name
        chain: Vec<String>,
    },

    /// A definition document does not have the expected shape
    #[error("Malformed {kind} definition {name}: {reason}")]
    MalformedDefinition {
        /// `trait` or `object`
        kind: String,
        /// Definition name, or `<unnamed>` when the name itself is missing
        name: String,
        /// What was wrong
        reason: String,
    },

    /// Parameter validation requested at resolve time failed
    #[error("Invalid parameters for trait {trait_name}: {} issue(s)", issues.len())]
    InvalidParameters {
        /// Trait whose configuration failed
        trait_name: String,
        /// Error-severity issues produced by parameter validation
        issues: Vec<ValidationIssue>,
    },

    /// The loader failed for a reason other than a missing definition
    #[error("Loader error: {0}")]
    Load(LoadError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type for composition operations
pub type ComposeResult<T> = Result<T, ComposeError>;

impl From<serde_json::Error> for ComposeError {
    fn from(err: serde_json::Error) -> Self {
        ComposeError::SerializationError(err.to_string())
    }
}

impl ComposeError {
    /// Stable, machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ComposeError::UnknownObject(_) => "UNKNOWN_OBJECT",
            ComposeError::UnknownTrait { .. } => "UNKNOWN_TRAIT",
            ComposeError::CyclicExtends { .. } => "CYCLIC_EXTENDS",
            ComposeError::MalformedDefinition { .. } => "MALFORMED_DEFINITION",
            ComposeError::InvalidParameters { .. } => "INVALID_PARAMETERS",
            ComposeError::Load(_) => "LOADER_ERROR",
            ComposeError::SerializationError(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ComposeError::UnknownObject(_) | ComposeError::UnknownTrait { .. }
        )
    }

    pub(crate) fn malformed(kind: &str, name: &str, reason: impl Into<String>) -> Self {
        ComposeError::MalformedDefinition {
            kind: kind.to_string(),
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
