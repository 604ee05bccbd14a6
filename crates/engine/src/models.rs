//! Workflow document model.
//!
//! These types mirror the declarative JSON a client submits:
//!
//! ```json
//! {
//!   "name": "scene",
//!   "description": "optional",
//!   "config": { "upsert_mode": true, "clear_before_execute": false,
//!               "save_after": false, "actor_id_prefix": "workflow_" },
//!   "tasks": [
//!     { "name": "grid", "type": "SpawnGridTask", "params": { "rows": 3 },
//!       "depends_on": [], "enabled": true }
//!   ]
//! }
//! ```
//!
//! Required fields are `Option`s here so the loader can report exactly which
//! one is missing instead of a generic serde message.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tasks::WorkflowConfig;

// ---------------------------------------------------------------------------
// TaskDefinition
// ---------------------------------------------------------------------------

/// A single task entry of a workflow document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Unique within the document; referenced by `depends_on` and by
    /// `task.field` references.
    #[serde(default)]
    pub name: Option<String>,
    /// Registered task-type key.
    #[serde(rename = "type", default)]
    pub task_type: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Task-specific parameters, checked against the type's schema.
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

fn enabled_by_default() -> bool {
    true
}

// ---------------------------------------------------------------------------
// WorkflowDocument
// ---------------------------------------------------------------------------

/// A complete workflow document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub config: WorkflowConfig,
    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,
}

/// Summary of a document, read without building its graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowInfo {
    pub name: String,
    pub description: String,
    pub task_count: usize,
    pub config: WorkflowConfig,
    pub file: String,
}
