//! What one workflow run produced.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tasks::{ActorHandle, TaskResult, TaskStatus};
use uuid::Uuid;

/// Outcome of the clear or save step around a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Done { detail: String },
    Failed { error: String },
}

impl StepOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, StepOutcome::Done { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub run_id: Uuid,
    pub workflow: String,
    /// Aggregate over all task results.
    pub status: TaskStatus,
    /// Task names in the order they were dispatched.
    pub order: Vec<String>,
    pub results: BTreeMap<String, TaskResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear: Option<StepOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save: Option<StepOutcome>,
    /// Registry contents at the end of the run.
    pub actors: BTreeMap<String, ActorHandle>,
}

impl WorkflowReport {
    pub fn result(&self, task: &str) -> Option<&TaskResult> {
        self.results.get(task)
    }

    pub fn status_of(&self, task: &str) -> Option<TaskStatus> {
        self.results.get(task).map(|r| r.status)
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.results.values().filter(|r| r.status == status).count()
    }

    /// Time spent inside tasks, summed.
    pub fn task_time(&self) -> Duration {
        self.results.values().map(|r| r.duration).sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} tasks, {} succeeded, {} partial, {} failed, {} skipped, {:.3}s in tasks",
            self.status,
            self.results.len(),
            self.count(TaskStatus::Success),
            self.count(TaskStatus::PartialSuccess),
            self.count(TaskStatus::Failure),
            self.count(TaskStatus::Skipped),
            self.task_time().as_secs_f64(),
        )
    }
}

impl fmt::Display for WorkflowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "workflow '{}' run {}", self.workflow, self.run_id)?;
        for name in &self.order {
            if let Some(result) = self.results.get(name) {
                writeln!(f, "  {name}: {result}")?;
            }
        }
        write!(f, "{}", self.summary())
    }
}

/// Overall status of a set of task results.
///
/// SUCCESS when nothing failed (skipped tasks do not count against it),
/// FAILURE when nothing produced output but something failed, and
/// PARTIAL_SUCCESS otherwise. A run with no results is a SUCCESS; one where
/// every task was skipped is SKIPPED.
pub fn aggregate_status<'a>(results: impl IntoIterator<Item = &'a TaskResult>) -> TaskStatus {
    let (mut ok, mut partial, mut failed, mut skipped) = (0, 0, 0, 0);
    for result in results {
        match result.status {
            TaskStatus::Success => ok += 1,
            TaskStatus::PartialSuccess => partial += 1,
            TaskStatus::Failure => failed += 1,
            TaskStatus::Skipped => skipped += 1,
        }
    }

    match (ok + partial, failed) {
        (0, 0) if skipped > 0 => TaskStatus::Skipped,
        (_, 0) if partial > 0 => TaskStatus::PartialSuccess,
        (_, 0) => TaskStatus::Success,
        (0, _) => TaskStatus::Failure,
        _ => TaskStatus::PartialSuccess,
    }
}
