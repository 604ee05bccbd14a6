//! Task-level error types.
//!
//! None of these escape a running task: `execute` folds them into a
//! `TaskResult` with a failure status. They surface to callers only while a
//! task is being *constructed* from a document (bad parameters).

use thiserror::Error;

use crate::reference::ReferenceError;

/// Errors raised while building a task from its declared parameters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TaskError {
    /// The parameter object does not match the task type's schema.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// A parameter is well-formed JSON but carries an out-of-range value.
    #[error("invalid value for '{param}': {message}")]
    InvalidValue {
        param: &'static str,
        message: String,
    },

    /// A `task.field` reference parameter could not be parsed.
    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::InvalidParams(err.to_string())
    }
}

/// Failures reported by the scene host collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host is unreachable or not running.
    #[error("scene host unavailable: {0}")]
    Unavailable(String),

    /// The handle no longer points at a live object.
    #[error("unknown actor handle '{0}'")]
    UnknownActor(String),

    /// No material asset exists at the path.
    #[error("unknown material '{0}'")]
    UnknownMaterial(String),

    /// The host refused the operation.
    #[error("scene host rejected operation: {0}")]
    Rejected(String),
}

/// Errors from the identity registry's upsert entry point.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Another upsert for the same id is still in flight.
    #[error("concurrent upsert of actor id '{0}'")]
    Conflict(String),

    /// The create or update callback failed.
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Invalid workflow configuration or unknown preset.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown preset '{name}'; available: {available}")]
    UnknownPreset { name: String, available: String },

    #[error("invalid actor id prefix '{0}': only ASCII letters, digits, '_' and '-' are allowed")]
    InvalidPrefix(String),

    #[error("upsert mode requires a non-empty actor id prefix")]
    EmptyPrefix,
}
