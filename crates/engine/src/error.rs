//! Engine-level error types.

use std::path::PathBuf;

use tasks::{ConfigError, HostError, TaskError};
use thiserror::Error;

/// Structural problems with a workflow graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Two tasks share a name.
    #[error("duplicate task name: '{0}'")]
    DuplicateTask(String),

    /// A task depends on a name that was never added.
    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    /// The dependency relation has a cycle; `members` lists one cycle in
    /// dependency order (each member is a prerequisite of the next).
    #[error("cyclic dependency: {}", .members.join(" -> "))]
    CyclicDependency { members: Vec<String> },

    /// Lookup of a task that is not in the graph.
    #[error("no task named '{0}'")]
    UnknownTask(String),
}

/// Problems turning a workflow document into a graph.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("workflow file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid workflow JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field is absent or empty.
    #[error("{context} is missing required field '{field}'")]
    MissingField { field: &'static str, context: String },

    #[error("task '{task}' has unknown type '{task_type}'; known types: {}", .known.join(", "))]
    UnknownTaskType {
        task: String,
        task_type: String,
        known: Vec<String>,
    },

    #[error("task '{task}' ({task_type}): {source}")]
    InvalidParams {
        task: String,
        task_type: String,
        #[source]
        source: TaskError,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors that stop a run before any task executes.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("invalid workflow config: {0}")]
    Config(#[from] ConfigError),

    /// The identity registry could not be seeded from the scene.
    #[error("cannot read existing actors from the scene: {0}")]
    RegistrySeed(#[source] HostError),

    /// Two tasks of one concurrent batch declare the same `actor_id`.
    #[error("tasks {} in the same batch all target actor id '{actor_id}'", .tasks.join(", "))]
    ConcurrentIdentityConflict { actor_id: String, tasks: Vec<String> },
}
