//! `WorkflowLoader` turns JSON workflow documents into graphs.
//!
//! Loading checks the document shape, that every task type is registered and
//! that every task's parameters fit its schema. Dependency names and cycles
//! are left to the graph, so a loaded workflow can still be rejected by
//! [`WorkflowGraph::validate`] or at execution time.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tasks::{TaskTypeRegistry, WorkflowConfig};
use tracing::{debug, info, warn};

use crate::models::{TaskDefinition, WorkflowDocument, WorkflowInfo};
use crate::{LoadError, WorkflowGraph};

/// A document ready to run.
pub struct LoadedWorkflow {
    pub name: String,
    pub description: Option<String>,
    pub config: WorkflowConfig,
    pub graph: WorkflowGraph,
}

pub struct WorkflowLoader {
    types: TaskTypeRegistry,
    workflows_dir: Option<PathBuf>,
}

impl WorkflowLoader {
    pub fn new(types: TaskTypeRegistry) -> Self {
        Self {
            types,
            workflows_dir: None,
        }
    }

    /// A loader that knows every built-in task type.
    pub fn with_builtins() -> Self {
        Self::new(TaskTypeRegistry::with_builtins())
    }

    /// Resolve bare file names against `dir`.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workflows_dir = Some(dir.into());
        self
    }

    pub fn types(&self) -> &TaskTypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TaskTypeRegistry {
        &mut self.types
    }

    /// Parse a document without building it.
    pub fn parse(&self, json: &str) -> Result<WorkflowDocument, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_str(&self, json: &str) -> Result<LoadedWorkflow, LoadError> {
        self.build(self.parse(json)?)
    }

    pub fn load_value(&self, value: Value) -> Result<LoadedWorkflow, LoadError> {
        self.build(serde_json::from_value(value)?)
    }

    /// Build the graph of an already parsed document.
    ///
    /// # Errors
    /// - [`LoadError::MissingField`] for a missing workflow or task `name`, or
    ///   a missing task `type`.
    /// - [`LoadError::UnknownTaskType`] for an unregistered `type`.
    /// - [`LoadError::InvalidParams`] when `params` do not fit the type.
    /// - [`LoadError::Graph`] for a repeated task name.
    pub fn build(&self, doc: WorkflowDocument) -> Result<LoadedWorkflow, LoadError> {
        let name = non_empty(doc.name).ok_or_else(|| LoadError::MissingField {
            field: "name",
            context: "workflow".into(),
        })?;

        let mut graph = WorkflowGraph::new();
        for (position, def) in doc.tasks.into_iter().enumerate() {
            self.add_definition(&mut graph, position, def)?;
        }

        info!("loaded workflow '{}' with {} tasks", name, graph.len());
        Ok(LoadedWorkflow {
            name,
            description: doc.description,
            config: doc.config,
            graph,
        })
    }

    fn add_definition(
        &self,
        graph: &mut WorkflowGraph,
        position: usize,
        def: TaskDefinition,
    ) -> Result<(), LoadError> {
        let name = non_empty(def.name).ok_or_else(|| LoadError::MissingField {
            field: "name",
            context: format!("task #{}", position + 1),
        })?;
        let task_type = non_empty(def.task_type).ok_or_else(|| LoadError::MissingField {
            field: "type",
            context: format!("task '{name}'"),
        })?;

        let factory = self.types.get(&task_type).ok_or_else(|| LoadError::UnknownTaskType {
            task: name.clone(),
            task_type: task_type.clone(),
            known: self.types.known_types(),
        })?;

        let task = factory(&name, def.params).map_err(|source| LoadError::InvalidParams {
            task: name.clone(),
            task_type: task_type.clone(),
            source,
        })?;

        graph.add_task(task, def.depends_on)?;
        if !def.enabled {
            debug!("task '{}' is disabled", name);
            graph.set_enabled(&name, false)?;
        }
        Ok(())
    }

    /// Where `file` lives: paths with a directory part are used as given,
    /// bare names are looked up in the workflows directory. A missing
    /// `.json` extension is added.
    pub fn resolve_path(&self, file: &str) -> PathBuf {
        let mut path = PathBuf::from(file);
        if path.extension().is_none() {
            path.set_extension("json");
        }
        match &self.workflows_dir {
            Some(dir) if path.parent().map_or(true, |p| p.as_os_str().is_empty()) => dir.join(path),
            _ => path,
        }
    }

    fn read(&self, file: &str) -> Result<(PathBuf, String), LoadError> {
        let path = self.resolve_path(file);
        if !path.is_file() {
            return Err(LoadError::NotFound(path));
        }
        let text = fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        Ok((path, text))
    }

    pub fn load_file(&self, file: &str) -> Result<LoadedWorkflow, LoadError> {
        let (path, text) = self.read(file)?;
        debug!("loading workflow from {}", path.display());
        self.load_str(&text)
    }

    /// Name, description, task count and config of a file, without building
    /// its tasks.
    pub fn describe(&self, file: &str) -> Result<WorkflowInfo, LoadError> {
        let (path, text) = self.read(file)?;
        let doc = self.parse(&text)?;
        Ok(WorkflowInfo {
            name: doc.name.unwrap_or_else(|| "Unnamed".into()),
            description: doc.description.unwrap_or_default(),
            task_count: doc.tasks.len(),
            config: doc.config,
            file: path.display().to_string(),
        })
    }

    /// Workflow files in the workflows directory.
    pub fn list(&self) -> Vec<String> {
        self.workflows_dir
            .as_deref()
            .map(list_workflows)
            .unwrap_or_default()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Sorted names of the `.json` files in `dir`; empty if `dir` is unreadable.
pub fn list_workflows(dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cannot list workflows in {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}
