//! Structured task outcomes.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome category of a single task invocation (or a whole run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Success,
    Failure,
    Skipped,
    PartialSuccess,
}

impl TaskStatus {
    /// Whether downstream tasks may read this result's output.
    pub fn has_output(self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::PartialSuccess)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failure => "FAILURE",
            TaskStatus::Skipped => "SKIPPED",
            TaskStatus::PartialSuccess => "PARTIAL_SUCCESS",
        };
        f.write_str(s)
    }
}

/// Output payload of a task: field name to value.
pub type Output = Map<String, Value>;

/// The result of one task invocation.
///
/// Created once per invocation and stored in the run context under the task's
/// name, where later tasks can reach `output` fields via `task.field`
/// references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub status: TaskStatus,
    /// Human-readable summary or diagnostic.
    pub message: String,
    #[serde(default)]
    pub output: Output,
    /// Extra facts about the run that are not meant for downstream tasks.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// Wall-clock time spent in `execute`; filled in by the executor.
    #[serde(default, with = "duration_millis")]
    pub duration: Duration,
}

impl TaskResult {
    fn new(status: TaskStatus, message: impl Into<String>, output: Output) -> Self {
        Self {
            status,
            message: message.into(),
            output,
            metadata: Map::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn success(message: impl Into<String>, output: Output) -> Self {
        Self::new(TaskStatus::Success, message, output)
    }

    pub fn partial(message: impl Into<String>, output: Output) -> Self {
        Self::new(TaskStatus::PartialSuccess, message, output)
    }

    /// A failure with no output.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(TaskStatus::Failure, message, Output::new())
    }

    /// A failure that still reports what it managed to observe.
    pub fn failure_with(message: impl Into<String>, output: Output) -> Self {
        Self::new(TaskStatus::Failure, message, output)
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self::new(TaskStatus::Skipped, message, Output::new())
    }

    /// Pick SUCCESS, PARTIAL_SUCCESS or FAILURE from per-item counts.
    ///
    /// Zero attempted items count as success.
    pub fn from_counts(
        succeeded: usize,
        failed: usize,
        message: impl Into<String>,
        output: Output,
    ) -> Self {
        match (succeeded, failed) {
            (_, 0) => Self::success(message, output),
            (0, _) => Self::failure_with(message, output),
            _ => Self::partial(message, output),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.output.get(name)
    }
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.3}s): {}", self.status, self.duration.as_secs_f64(), self.message)
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
