//! `engine` crate: workflow documents, the task graph, and the executor.

pub mod error;
pub mod executor;
pub mod graph;
pub mod loader;
pub mod models;
pub mod report;

pub use error::{EngineError, GraphError, LoadError};
pub use executor::{ExecutionStrategy, WorkflowExecutor};
pub use graph::{TaskNode, UndeclaredReference, WorkflowGraph};
pub use loader::{list_workflows, LoadedWorkflow, WorkflowLoader};
pub use models::{TaskDefinition, WorkflowDocument, WorkflowInfo};
pub use report::{aggregate_status, StepOutcome, WorkflowReport};
