//! Error types for schema compilation

use thiserror::Error;

use crate::schema::DefinitionKind;

/// Result type for compilation operations
pub type Result<T> = std::result::Result<T, CompileError>;

/// Compilation errors
///
/// Anything returned here aborts the batch it occurred in. Recoverable
/// problems (unknown scalar types, unresolved `through` targets, reserved
/// identifiers) are reported as diagnostics instead.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("failed to compile {kind} {name}: {source}")]
    Definition {
        kind: DefinitionKind,
        name: String,
        #[source]
        source: DefinitionError,
    },

    #[error("{kind} not found: {name}")]
    NotFound { kind: DefinitionKind, name: String },

    #[error("duplicate {kind} definition: {name}")]
    DuplicateDefinition { kind: DefinitionKind, name: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to write {kind} output: {source}")]
    Write {
        kind: DefinitionKind,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("compile worker panicked while compiling {kind} definitions")]
    WorkerPanicked { kind: DefinitionKind },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors local to a single definition, wrapped by [`CompileError::Definition`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("malformed type '{raw}' on field {field}")]
    MalformedType { field: String, raw: String },

    #[error("field {field} references unknown model field '{path}'")]
    UnknownModelField { field: String, path: String },

    #[error("enum entry {entry} has value {value}, expected {expected}")]
    EnumValueMismatch {
        entry: String,
        value: String,
        expected: String,
    },
}

impl DefinitionError {
    /// Wrap into a batch-level error naming the definition
    pub fn in_definition(self, kind: DefinitionKind, name: impl Into<String>) -> CompileError {
        CompileError::Definition {
            kind,
            name: name.into(),
            source: self,
        }
    }
}
