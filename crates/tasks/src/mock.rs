//! `MockTask`: a test double for [`Task`].
//!
//! Useful in unit and integration tests where a real scene task is either
//! unavailable or irrelevant.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::host::{ActorSpec, Shape};
use crate::{Output, Reference, Task, TaskContext, TaskResult};

/// Behaviour injected into `MockTask` at construction time.
#[derive(Debug, Clone)]
pub enum MockBehaviour {
    /// Succeed with the given output fields.
    Succeed(Output),
    /// Return a FAILURE with this message.
    Fail(String),
    /// Read a reference and echo it back as `value`; fail if unresolved.
    Read(Reference),
    /// Upsert one cube under this registry id.
    Place(String),
}

/// A mock task that records every call it receives and behaves as told.
pub struct MockTask {
    name: String,
    behaviour: MockBehaviour,
    /// Names of the results visible in the context at each call.
    pub calls: Arc<Mutex<Vec<Vec<String>>>>,
    /// Shared log of task names in call order, for cross-task ordering checks.
    journal: Option<Arc<Mutex<Vec<String>>>>,
}

impl MockTask {
    fn with(name: impl Into<String>, behaviour: MockBehaviour) -> Self {
        Self {
            name: name.into(),
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
            journal: None,
        }
    }

    /// A mock that always succeeds with the given JSON object as output.
    pub fn returning(name: impl Into<String>, output: Value) -> Self {
        let output = match output {
            Value::Object(map) => map,
            _ => Output::new(),
        };
        Self::with(name, MockBehaviour::Succeed(output))
    }

    /// A mock that always fails.
    pub fn failing(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with(name, MockBehaviour::Fail(msg.into()))
    }

    /// A mock that reads `reference` (e.g. `"a.value"`) from the context.
    ///
    /// # Panics
    /// If `reference` is malformed.
    pub fn reading(name: impl Into<String>, reference: &str) -> Self {
        let reference = reference.parse().expect("mock reference must be well-formed");
        Self::with(name, MockBehaviour::Read(reference))
    }

    /// A mock that places a cube under `actor_id` through the context.
    pub fn placing(name: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self::with(name, MockBehaviour::Place(actor_id.into()))
    }

    /// Append this task's name to `journal` whenever it executes.
    pub fn journaled(mut self, journal: Arc<Mutex<Vec<String>>>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Number of times this task has been executed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Task for MockTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn task_type(&self) -> &str {
        "mock"
    }

    fn params(&self) -> Value {
        Value::Object(Default::default())
    }

    fn references(&self) -> Vec<Reference> {
        match &self.behaviour {
            MockBehaviour::Read(r) => vec![r.clone()],
            _ => Vec::new(),
        }
    }

    fn actor_ids(&self) -> Vec<String> {
        match &self.behaviour {
            MockBehaviour::Place(id) => vec![id.clone()],
            _ => Vec::new(),
        }
    }

    async fn execute(&self, ctx: &TaskContext) -> TaskResult {
        let mut seen: Vec<String> = ctx.results().keys().cloned().collect();
        seen.sort();
        self.calls.lock().unwrap().push(seen);
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(self.name.clone());
        }

        match &self.behaviour {
            MockBehaviour::Succeed(output) => {
                let mut out = output.clone();
                out.insert("task".into(), json!(self.name));
                TaskResult::success("ok", out)
            }
            MockBehaviour::Fail(msg) => TaskResult::failure(msg.clone()),
            MockBehaviour::Read(reference) => match ctx.resolve(reference) {
                Ok(value) => {
                    let mut out = Output::new();
                    out.insert("value".into(), value.clone());
                    TaskResult::success("read upstream value", out)
                }
                Err(err) => TaskResult::failure(err.to_string()),
            },
            MockBehaviour::Place(id) => {
                match ctx.place_actor(Some(id), &ActorSpec::mesh(Shape::Cube, [0.0; 3])) {
                    Ok(placed) => {
                        let mut out = Output::new();
                        out.insert("handle".into(), json!(placed.handle));
                        out.insert("action".into(), json!(placed.action));
                        TaskResult::success(format!("placed '{id}'"), out)
                    }
                    Err(err) => TaskResult::failure(err.to_string()),
                }
            }
        }
    }
}
