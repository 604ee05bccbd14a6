//! Task-type registration table: type key to constructor.
//!
//! The loader only ever asks "given a type key, a name and a parameter object,
//! give me something that can `execute`". Each built-in type is a
//! [`TaskSpec`]: a serde parameter struct that doubles as the type's schema
//! (unknown keys are rejected), wrapped by [`SpecTask`] to become a [`Task`].

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::{Reference, Task, TaskContext, TaskError, TaskResult};

/// Builds a task from its name and raw parameter object.
pub type TaskFactory = fn(&str, Value) -> Result<Box<dyn Task>, TaskError>;

/// Parameters plus behaviour of one task type.
pub trait TaskSpec: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Key used in the document's `type` field.
    const TYPE: &'static str;

    /// Semantic checks serde cannot express.
    fn validate(&self) -> Result<(), TaskError> {
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    fn actor_ids(&self) -> Vec<String> {
        Vec::new()
    }

    fn run(&self, name: &str, ctx: &TaskContext) -> TaskResult;
}

/// A [`TaskSpec`] bound to a task name.
pub struct SpecTask<P> {
    name: String,
    params: P,
}

impl<P: TaskSpec> SpecTask<P> {
    /// Build from an already typed parameter struct.
    pub fn new(name: impl Into<String>, params: P) -> Result<Self, TaskError> {
        params.validate()?;
        Ok(Self {
            name: name.into(),
            params,
        })
    }

    /// Build from a raw parameter object; `null` means "all defaults".
    pub fn from_value(name: &str, params: Value) -> Result<Self, TaskError> {
        let params = match params {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        Self::new(name, serde_json::from_value(params)?)
    }

    pub fn spec(&self) -> &P {
        &self.params
    }
}

impl<P> fmt::Debug for SpecTask<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecTask").field("name", &self.name).finish_non_exhaustive()
    }
}

#[async_trait]
impl<P: TaskSpec> Task for SpecTask<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn task_type(&self) -> &str {
        P::TYPE
    }

    fn params(&self) -> Value {
        serde_json::to_value(&self.params).unwrap_or(Value::Null)
    }

    fn references(&self) -> Vec<Reference> {
        self.params.references()
    }

    fn actor_ids(&self) -> Vec<String> {
        self.params.actor_ids()
    }

    async fn execute(&self, ctx: &TaskContext) -> TaskResult {
        self.params.run(&self.name, ctx)
    }
}

fn build_spec<P: TaskSpec>(name: &str, params: Value) -> Result<Box<dyn Task>, TaskError> {
    Ok(Box::new(SpecTask::<P>::from_value(name, params)?))
}

/// Maps type keys to factories. Populate once at startup, then share.
#[derive(Clone, Default)]
pub struct TaskTypeRegistry {
    factories: BTreeMap<String, TaskFactory>,
}

impl TaskTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in task type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtin::register_all(&mut registry);
        registry
    }

    /// Register a factory under `type_key`, replacing any previous one.
    pub fn register(&mut self, type_key: impl Into<String>, factory: TaskFactory) -> &mut Self {
        self.factories.insert(type_key.into(), factory);
        self
    }

    /// Register a [`TaskSpec`] under its own type key.
    pub fn register_spec<P: TaskSpec>(&mut self) -> &mut Self {
        self.register(P::TYPE, build_spec::<P>)
    }

    pub fn get(&self, type_key: &str) -> Option<TaskFactory> {
        self.factories.get(type_key).copied()
    }

    pub fn contains(&self, type_key: &str) -> bool {
        self.factories.contains_key(type_key)
    }

    /// Registered keys, sorted.
    pub fn known_types(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl fmt::Debug for TaskTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Echo {
        #[serde(default)]
        times: u32,
    }

    impl TaskSpec for Echo {
        const TYPE: &'static str = "Echo";

        fn validate(&self) -> Result<(), TaskError> {
            if self.times > 10 {
                return Err(TaskError::InvalidValue {
                    param: "times",
                    message: "at most 10".into(),
                });
            }
            Ok(())
        }

        fn run(&self, name: &str, _ctx: &TaskContext) -> TaskResult {
            TaskResult::success(format!("{name} x{}", self.times), Default::default())
        }
    }

    #[test]
    fn builds_registered_types_and_checks_schema() {
        let mut reg = TaskTypeRegistry::new();
        reg.register_spec::<Echo>();
        assert!(reg.contains("Echo"));
        assert_eq!(reg.known_types(), vec!["Echo"]);

        let factory = reg.get("Echo").unwrap();
        let task = factory("e", json!({ "times": 2 })).unwrap();
        assert_eq!(task.name(), "e");
        assert_eq!(task.task_type(), "Echo");
        assert_eq!(task.params(), json!({ "times": 2 }));

        assert!(factory("e", Value::Null).is_ok(), "null params mean defaults");
        assert!(matches!(
            factory("e", json!({ "tims": 2 })),
            Err(TaskError::InvalidParams(_))
        ));
        assert!(matches!(
            factory("e", json!({ "times": 11 })),
            Err(TaskError::InvalidValue { param: "times", .. })
        ));
    }

    #[tokio::test]
    async fn built_task_executes_through_the_trait() {
        use crate::host::SceneHost;

        let reg = TaskTypeRegistry::with_builtins();
        let factory = reg.get("SpawnActorTask").unwrap();
        let task = factory("hero", json!({ "actor_id": "hero", "shape": "sphere" })).unwrap();
        assert_eq!(task.actor_ids(), vec!["hero"]);

        let (ctx, scene) = crate::builtin::test_support::upsert_context();
        let result = task.execute(&ctx).await;
        assert!(result.is_success(), "{result}");
        assert_eq!(result.output["action"], "created");
        assert_eq!(scene.actor_count().unwrap(), 1);
        assert!(ctx.registry().exists("hero"));
    }

    #[test]
    fn builtins_are_registered() {
        let reg = TaskTypeRegistry::with_builtins();
        for key in [
            "ClearLevelTask",
            "SpawnActorTask",
            "SpawnGridTask",
            "SpawnCircleTask",
            "SpawnSpiralTask",
            "SetActorColorTask",
            "ColorGridTask",
            "CreateLightTask",
            "LightsGeneratorTask",
            "GridGeneratorTask",
            "ForEachLightTask",
            "ForEachSpawnTask",
            "CreateCameraTask",
            "MaterialUpsertTask",
            "ApplyMaterialTask",
            "ForEachMaterialTask",
        ] {
            assert!(reg.contains(key), "{key} missing");
        }
    }
}
