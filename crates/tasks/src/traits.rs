//! The `Task` trait and the run context every task executes against.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::config::WorkflowConfig;
use crate::error::RegistryError;
use crate::host::{ActorSpec, SceneHost};
use crate::reference::{Reference, ReferenceError};
use crate::registry::{ActorRegistry, UpsertAction, Upserted};
use crate::TaskResult;

/// Shared state of one workflow run.
///
/// Holds the results recorded so far (one per finished task, keyed by task
/// name), the run's configuration, the identity registry and the scene host.
/// Defined here so both the engine and individual tasks can use it without a
/// circular dependency.
pub struct TaskContext {
    run_id: Uuid,
    workflow: String,
    config: WorkflowConfig,
    registry: Arc<ActorRegistry>,
    host: Arc<dyn SceneHost>,
    results: HashMap<String, TaskResult>,
}

impl TaskContext {
    pub fn new(
        workflow: impl Into<String>,
        config: WorkflowConfig,
        registry: Arc<ActorRegistry>,
        host: Arc<dyn SceneHost>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            workflow: workflow.into(),
            config,
            registry,
            host,
            results: HashMap::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn workflow(&self) -> &str {
        &self.workflow
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn registry(&self) -> &ActorRegistry {
        &self.registry
    }

    pub fn host(&self) -> &dyn SceneHost {
        self.host.as_ref()
    }

    pub fn result(&self, task: &str) -> Option<&TaskResult> {
        self.results.get(task)
    }

    pub fn results(&self) -> &HashMap<String, TaskResult> {
        &self.results
    }

    /// Store a finished task's result.
    ///
    /// # Panics
    /// If `task` already has a result: each task runs once per run.
    pub fn record(&mut self, task: impl Into<String>, result: TaskResult) {
        let task = task.into();
        assert!(
            !self.results.contains_key(&task),
            "result for task '{task}' recorded twice"
        );
        self.results.insert(task, result);
    }

    /// Look up the value a `task.field` reference points at.
    ///
    /// Only SUCCESS and PARTIAL_SUCCESS results can be read; a skipped or
    /// failed upstream task leaves the reference unresolved.
    pub fn resolve(&self, reference: &Reference) -> Result<&Value, ReferenceError> {
        let result = self
            .results
            .get(reference.task())
            .ok_or_else(|| ReferenceError::UnknownTask {
                reference: reference.to_string(),
                task: reference.task().to_owned(),
            })?;

        if !result.status.has_output() {
            return Err(ReferenceError::NoOutput {
                reference: reference.to_string(),
                task: reference.task().to_owned(),
                status: result.status,
            });
        }

        let (first, rest) = reference
            .path()
            .split_first()
            .ok_or_else(|| ReferenceError::Malformed(reference.to_string()))?;

        let missing = |field: &str| ReferenceError::MissingField {
            reference: reference.to_string(),
            field: field.to_owned(),
        };

        let mut value = result.output.get(first).ok_or_else(|| missing(first))?;
        for field in rest {
            value = value.get(field.as_str()).ok_or_else(|| missing(field))?;
        }
        Ok(value)
    }

    /// Resolve a reference and deserialize the value.
    pub fn resolve_as<T: DeserializeOwned>(&self, reference: &Reference) -> Result<T, String> {
        let value = self.resolve(reference).map_err(|e| e.to_string())?;
        serde_json::from_value(value.clone())
            .map_err(|e| format!("reference '{reference}' has unexpected shape: {e}"))
    }

    /// Create or update one scene object on behalf of a task.
    ///
    /// With upsert mode on and an `actor_id` given, goes through the registry:
    /// an already registered id is updated in place, otherwise a new labelled
    /// object is created and registered. Otherwise a new object is always
    /// created; if it has an id it is labelled and registered, replacing any
    /// earlier entry.
    pub fn place_actor(
        &self,
        actor_id: Option<&str>,
        spec: &ActorSpec,
    ) -> Result<Upserted, RegistryError> {
        let host = self.host();
        match actor_id {
            Some(id) if self.config.upsert_mode => self.registry.update_or_create(
                id,
                |label| host.spawn(&spec.clone().with_label(label)),
                |handle| host.update(handle, spec),
            ),
            Some(id) => {
                let label = self.registry.label_for(id);
                let handle = host.spawn(&spec.clone().with_label(label))?;
                self.registry.put(id, handle.clone());
                Ok(Upserted {
                    handle,
                    action: UpsertAction::Created,
                })
            }
            None => Ok(Upserted {
                handle: host.spawn(spec)?,
                action: UpsertAction::Created,
            }),
        }
    }
}

/// The core task trait.
///
/// Expected failures (bad input, unresolved references, host errors) must be
/// reported through the returned [`TaskResult`], never by panicking.
#[async_trait]
pub trait Task: Send + Sync {
    /// Unique name within the workflow.
    fn name(&self) -> &str;

    /// Registered type key, e.g. `"SpawnGridTask"`.
    fn task_type(&self) -> &str;

    /// Declared parameters, as they would appear in a workflow document.
    fn params(&self) -> Value;

    /// Upstream fields this task reads.
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    /// Registry ids this task may create or update, when known up front.
    fn actor_ids(&self) -> Vec<String> {
        Vec::new()
    }

    /// Run the task against the shared context.
    async fn execute(&self, ctx: &TaskContext) -> TaskResult;
}
