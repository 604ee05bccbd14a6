//! Workflow execution engine.
//!
//! `WorkflowExecutor` is the central orchestrator:
//! 1. Validates the config and orders the graph into ready batches.
//! 2. Optionally clears the scene, then seeds the identity registry from the
//!    objects the scene already carries.
//! 3. Dispatches every task through the `Task` trait, batch by batch, and
//!    records each result in the shared context so later tasks can read it.
//! 4. Optionally saves the scene and reports the aggregate status.
//!
//! Task failures never stop a run: a failed task is recorded and its
//! dependents still execute (and fail on their own if they needed its
//! output). Only structural problems abort, before any task runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use serde_json::json;
use tasks::{ActorRegistry, SceneHost, Task, TaskContext, TaskResult, WorkflowConfig};
use tracing::{debug, info, instrument, warn};

use crate::report::{aggregate_status, StepOutcome, WorkflowReport};
use crate::{EngineError, LoadedWorkflow, WorkflowGraph};

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// How tasks of one ready batch are dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// One task at a time in topological order.
    #[default]
    Sequential,
    /// All tasks of a batch awaited together. Tasks of one batch must not
    /// target the same `actor_id`.
    Batched,
}

// ---------------------------------------------------------------------------
// WorkflowExecutor
// ---------------------------------------------------------------------------

/// Runs workflow graphs against one scene host.
///
/// Holds no per-run state; every call to [`WorkflowExecutor::execute`] gets a
/// fresh context and registry.
pub struct WorkflowExecutor {
    host: Arc<dyn SceneHost>,
    strategy: ExecutionStrategy,
}

impl WorkflowExecutor {
    pub fn new(host: Arc<dyn SceneHost>) -> Self {
        Self {
            host,
            strategy: ExecutionStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// Run a loaded workflow with its own config.
    pub async fn run(&self, workflow: &LoadedWorkflow) -> Result<WorkflowReport, EngineError> {
        self.execute(&workflow.name, &workflow.graph, &workflow.config).await
    }

    /// Run a graph with a fresh identity registry.
    ///
    /// In upsert mode the registry is seeded with the scene's objects whose
    /// labels carry the configured prefix, so ids created by an earlier run
    /// are updated rather than duplicated.
    ///
    /// # Errors
    /// Invalid config, a graph with unknown dependencies or a cycle, a
    /// same-batch identity conflict under [`ExecutionStrategy::Batched`], or
    /// a scene that cannot list its labelled objects.
    pub async fn execute(
        &self,
        workflow: &str,
        graph: &WorkflowGraph,
        config: &WorkflowConfig,
    ) -> Result<WorkflowReport, EngineError> {
        self.run_graph(workflow, graph, config, None).await
    }

    /// Run a graph against a caller-owned registry, used as is.
    pub async fn execute_with_registry(
        &self,
        workflow: &str,
        graph: &WorkflowGraph,
        config: &WorkflowConfig,
        registry: Arc<ActorRegistry>,
    ) -> Result<WorkflowReport, EngineError> {
        self.run_graph(workflow, graph, config, Some(registry)).await
    }

    #[instrument(skip(self, graph, config, registry), fields(tasks = graph.len(), strategy = ?self.strategy))]
    async fn run_graph(
        &self,
        workflow: &str,
        graph: &WorkflowGraph,
        config: &WorkflowConfig,
        registry: Option<Arc<ActorRegistry>>,
    ) -> Result<WorkflowReport, EngineError> {
        // ------------------------------------------------------------------
        // Structural checks; nothing touches the scene until these pass.
        // ------------------------------------------------------------------
        config.validate()?;
        let batches = graph.ready_batches()?;
        if self.strategy == ExecutionStrategy::Batched {
            check_batch_identities(graph, &batches)?;
        }
        for undeclared in graph.undeclared_references() {
            warn!(
                "task '{}' reads '{}' without depending on '{}'",
                undeclared.task,
                undeclared.reference,
                undeclared.reference.task()
            );
        }
        info!(
            "executing workflow '{}': {} tasks in {} batches ({})",
            workflow,
            graph.len(),
            batches.len(),
            config
        );

        let started_at = Utc::now();

        // ------------------------------------------------------------------
        // Clear, then build the registry from what is left in the scene.
        // ------------------------------------------------------------------
        let clear = config.clear_before_execute.then(|| self.clear_scene(registry.as_deref()));

        let registry = match registry {
            Some(registry) => registry,
            None => Arc::new(self.seed_registry(config)?),
        };

        let mut ctx =
            TaskContext::new(workflow, config.clone(), registry.clone(), self.host.clone());
        let order: Vec<String> = batches.iter().flatten().cloned().collect();

        // ------------------------------------------------------------------
        // Execute.
        // ------------------------------------------------------------------
        for batch in &batches {
            let nodes: Vec<_> = batch.iter().filter_map(|name| graph.get(name)).collect();
            match self.strategy {
                ExecutionStrategy::Sequential => {
                    for node in nodes {
                        let result = if node.is_enabled() {
                            run_task(node.task(), &ctx).await
                        } else {
                            disabled(node.name())
                        };
                        ctx.record(node.name(), result);
                    }
                }
                ExecutionStrategy::Batched => {
                    let results = join_all(nodes.iter().map(|node| {
                        let ctx = &ctx;
                        async move {
                            if node.is_enabled() {
                                run_task(node.task(), ctx).await
                            } else {
                                disabled(node.name())
                            }
                        }
                    }))
                    .await;
                    for (node, result) in nodes.iter().zip(results) {
                        ctx.record(node.name(), result);
                    }
                }
            }
        }

        // ------------------------------------------------------------------
        // Save and report.
        // ------------------------------------------------------------------
        let save = config.save_after.then(|| self.save_scene());

        let results: BTreeMap<String, TaskResult> = ctx
            .results()
            .iter()
            .map(|(name, result)| (name.clone(), result.clone()))
            .collect();
        let report = WorkflowReport {
            run_id: ctx.run_id(),
            workflow: workflow.to_owned(),
            status: aggregate_status(results.values()),
            order,
            results,
            started_at,
            finished_at: Utc::now(),
            clear,
            save,
            actors: registry.snapshot(),
        };

        info!("workflow '{}' finished: {}", workflow, report.summary());
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Internal: steps around the task loop.
    // -----------------------------------------------------------------------

    fn clear_scene(&self, registry: Option<&ActorRegistry>) -> StepOutcome {
        if let Some(registry) = registry {
            let forgotten = registry.clear();
            debug!("forgot {} registered actors", forgotten);
        }
        match self.host.clear_all() {
            Ok(deleted) => {
                info!("cleared scene: {} actors deleted", deleted);
                StepOutcome::Done {
                    detail: format!("deleted {deleted} actors"),
                }
            }
            Err(e) => {
                warn!("scene clear failed, continuing: {}", e);
                StepOutcome::Failed { error: e.to_string() }
            }
        }
    }

    fn seed_registry(&self, config: &WorkflowConfig) -> Result<ActorRegistry, EngineError> {
        let prefix = config.actor_id_prefix.clone();
        if !config.upsert_mode {
            return Ok(ActorRegistry::new(prefix));
        }
        let labelled = self
            .host
            .labelled(&prefix)
            .map_err(EngineError::RegistrySeed)?;
        Ok(ActorRegistry::seeded(prefix, labelled))
    }

    fn save_scene(&self) -> StepOutcome {
        match self.host.save() {
            Ok(()) => {
                info!("scene saved");
                StepOutcome::Done {
                    detail: "scene saved".into(),
                }
            }
            Err(e) => {
                warn!("scene save failed: {}", e);
                StepOutcome::Failed { error: e.to_string() }
            }
        }
    }
}

async fn run_task(task: &dyn Task, ctx: &TaskContext) -> TaskResult {
    debug!("running task '{}' ({})", task.name(), task.task_type());
    let started = Instant::now();
    let result = task
        .execute(ctx)
        .await
        .with_duration(started.elapsed())
        .with_metadata("task_type", json!(task.task_type()));

    if result.status.has_output() {
        info!("task '{}' {}", task.name(), result);
    } else {
        warn!("task '{}' {}", task.name(), result);
    }
    result
}

fn disabled(name: &str) -> TaskResult {
    info!("task '{}' is disabled, skipping", name);
    TaskResult::skipped("task disabled")
}

/// Reject batches where two enabled tasks declare the same `actor_id`.
fn check_batch_identities(
    graph: &WorkflowGraph,
    batches: &[Vec<String>],
) -> Result<(), EngineError> {
    for batch in batches {
        let mut claims: HashMap<String, Vec<String>> = HashMap::new();
        let mut first_seen: Vec<String> = Vec::new();
        for node in batch.iter().filter_map(|name| graph.get(name)) {
            if !node.is_enabled() {
                continue;
            }
            let mut ids = node.task().actor_ids();
            ids.sort();
            ids.dedup();
            for id in ids {
                let tasks = claims.entry(id.clone()).or_default();
                if tasks.is_empty() {
                    first_seen.push(id);
                }
                tasks.push(node.name().to_owned());
            }
        }
        for id in first_seen {
            if let Some(tasks) = claims.remove(&id) {
                if tasks.len() > 1 {
                    return Err(EngineError::ConcurrentIdentityConflict { actor_id: id, tasks });
                }
            }
        }
    }
    Ok(())
}
