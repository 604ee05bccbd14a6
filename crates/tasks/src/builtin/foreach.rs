//! For-each materializers: read an item list from an upstream task and
//! create one object per item.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::light::LightConfig;
use super::{one, yes, zero, PlacementLog};
use crate::host::{ActorSpec, Shape, Vec3};
use crate::{Reference, TaskContext, TaskResult, TaskSpec};

/// Resolve `input` to a non-empty JSON array.
fn items(ctx: &TaskContext, input: &Reference) -> Result<Vec<Value>, TaskResult> {
    match ctx.resolve(input) {
        Ok(Value::Array(items)) if !items.is_empty() => Ok(items.clone()),
        Ok(Value::Array(_)) => Err(TaskResult::failure(format!("no items found at '{input}'"))),
        Ok(other) => Err(TaskResult::failure(format!(
            "'{input}' must be a list, got {}",
            type_name(other)
        ))),
        Err(err) => Err(TaskResult::failure(err.to_string())),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn item_id(item: &Value) -> Option<&str> {
    item.get("actor_id").and_then(Value::as_str)
}

/// Create every light in a list produced by `LightsGeneratorTask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForEachLightTask {
    /// e.g. `"generate_lights.lights"`
    pub lights_input: Reference,
    #[serde(default = "yes")]
    pub use_registry: bool,
}

impl TaskSpec for ForEachLightTask {
    const TYPE: &'static str = "ForEachLightTask";

    fn references(&self) -> Vec<Reference> {
        vec![self.lights_input.clone()]
    }

    fn run(&self, _name: &str, ctx: &TaskContext) -> TaskResult {
        let items = match items(ctx, &self.lights_input) {
            Ok(items) => items,
            Err(failed) => return failed,
        };

        let mut log = PlacementLog::default();
        for item in items {
            let id = item_id(&item).map(str::to_owned);
            let light = match serde_json::from_value::<LightConfig>(item) {
                Ok(light) => light,
                Err(err) => {
                    log.fail(id.as_deref(), format!("invalid light: {err}"));
                    continue;
                }
            };
            if let Err(err) = light.check() {
                log.fail(Some(&light.actor_id), err.to_string());
                continue;
            }
            let registry_id = Some(light.actor_id.as_str()).filter(|_| self.use_registry);
            log.record(Some(&light.actor_id), ctx.place_actor(registry_id, &light.to_spec()));
        }
        log.into_result("lights")
    }
}

/// One spawn point; extra fields (`row`, `col`, `index`, ...) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnItem {
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default = "SpawnItem::default_shape")]
    pub shape: Shape,
    #[serde(default = "zero")]
    pub location: Vec3,
    #[serde(default = "zero")]
    pub rotation: Vec3,
    #[serde(default = "one")]
    pub scale: f64,
}

impl SpawnItem {
    fn default_shape() -> Shape {
        Shape::Sphere
    }
}

/// Spawn one mesh per item of an upstream list (e.g. `grid.grid_points`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForEachSpawnTask {
    pub items_input: Reference,
    #[serde(default = "yes")]
    pub use_registry: bool,
}

impl TaskSpec for ForEachSpawnTask {
    const TYPE: &'static str = "ForEachSpawnTask";

    fn references(&self) -> Vec<Reference> {
        vec![self.items_input.clone()]
    }

    fn run(&self, _name: &str, ctx: &TaskContext) -> TaskResult {
        let items = match items(ctx, &self.items_input) {
            Ok(items) => items,
            Err(failed) => return failed,
        };

        let mut log = PlacementLog::default();
        for item in items {
            let id = item_id(&item).map(str::to_owned);
            let point = match serde_json::from_value::<SpawnItem>(item) {
                Ok(point) => point,
                Err(err) => {
                    log.fail(id.as_deref(), format!("invalid spawn item: {err}"));
                    continue;
                }
            };
            let spec = ActorSpec::mesh(point.shape, point.location)
                .with_rotation(point.rotation)
                .with_scale(point.scale);
            let registry_id = point.actor_id.as_deref().filter(|_| self.use_registry);
            log.record(point.actor_id.as_deref(), ctx.place_actor(registry_id, &spec));
        }
        log.into_result("actors")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_support::{context, upsert_context};
    use crate::builtin::GridGeneratorTask;
    use crate::host::SceneHost;
    use crate::{TaskStatus, WorkflowConfig};
    use serde_json::json;

    #[test]
    fn spawns_each_generated_point_and_reports_partial_failures() {
        let (mut ctx, scene) = context(WorkflowConfig::default());
        let generator: GridGeneratorTask =
            serde_json::from_value(json!({ "rows": 1, "cols": 3 })).unwrap();
        ctx.record("grid", generator.run("grid", &ctx));
        scene.fail_spawn_for_label("workflow_0_1");

        let task: ForEachSpawnTask =
            serde_json::from_value(json!({ "items_input": "grid.grid_points" })).unwrap();
        let result = task.run("spawn", &ctx);

        assert_eq!(result.status, TaskStatus::PartialSuccess);
        assert_eq!(result.output["successful"], 2);
        assert_eq!(result.output["failed"][0]["actor_id"], "0_1");
        let placed: Vec<&str> = result.output["actors"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|a| a["actor_id"].as_str())
            .collect();
        assert_eq!(placed, vec!["0_0", "0_2"]);
        assert_eq!(scene.actor_count().unwrap(), 2);
    }

    #[test]
    fn lights_are_upserted_from_generator_output() {
        let (mut ctx, scene) = upsert_context();
        ctx.record(
            "gen",
            TaskResult::success(
                "",
                super::super::object(json!({
                    "lights": [
                        { "actor_id": "key", "light_type": "point", "location": [0.0, 0.0, 1.0],
                          "rotation": [0.0, 0.0, 0.0], "intensity": 10.0, "color": [1.0, 1.0, 1.0] },
                        { "actor_id": "bad", "light_type": "point" }
                    ]
                })),
            ),
        );

        let task: ForEachLightTask =
            serde_json::from_value(json!({ "lights_input": "gen.lights" })).unwrap();
        let first = task.run("lights", &ctx);
        assert_eq!(first.status, TaskStatus::PartialSuccess);
        assert_eq!(first.output["failed"][0]["actor_id"], "bad");

        let second = task.run("lights", &ctx);
        assert_eq!(second.output["updated"], 1);
        assert_eq!(scene.actor_count().unwrap(), 1);
    }

    #[test]
    fn unresolved_or_wrong_inputs_fail() {
        let (mut ctx, _) = context(WorkflowConfig::default());
        let task: ForEachSpawnTask =
            serde_json::from_value(json!({ "items_input": "gen.points" })).unwrap();
        let result = task.run("spawn", &ctx);
        assert_eq!(result.status, TaskStatus::Failure);
        assert!(result.message.contains("unresolved reference"));

        ctx.record(
            "gen",
            TaskResult::success("", super::super::object(json!({ "points": 3 }))),
        );
        let result = task.run("spawn", &ctx);
        assert!(result.message.contains("must be a list"));
    }

    #[test]
    fn declares_its_reference() {
        let task: ForEachLightTask =
            serde_json::from_value(json!({ "lights_input": "gen.lights" })).unwrap();
        assert_eq!(task.references(), vec![Reference::new("gen", "lights")]);
        let parsed = serde_json::from_value::<ForEachLightTask>(json!({ "lights_input": "nodot" }));
        assert!(parsed.is_err());
    }
}
