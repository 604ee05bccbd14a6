//! Mesh spawning: single actors and the grid/circle/spiral patterns.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{check_grid, check_scale, grid_cells, one, zero, PlacementLog};
use crate::host::{ActorSpec, Shape, Vec3};
use crate::{TaskContext, TaskError, TaskResult, TaskSpec};

fn cube() -> Shape {
    Shape::Cube
}

fn sphere() -> Shape {
    Shape::Sphere
}

fn cylinder() -> Shape {
    Shape::Cylinder
}

/// One mesh actor, upserted by `actor_id` when given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpawnActorTask {
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default = "cube")]
    pub shape: Shape,
    #[serde(default = "zero")]
    pub location: Vec3,
    #[serde(default = "zero")]
    pub rotation: Vec3,
    #[serde(default = "one")]
    pub scale: f64,
}

impl TaskSpec for SpawnActorTask {
    const TYPE: &'static str = "SpawnActorTask";

    fn validate(&self) -> Result<(), TaskError> {
        check_scale(self.scale)
    }

    fn actor_ids(&self) -> Vec<String> {
        self.actor_id.iter().cloned().collect()
    }

    fn run(&self, _name: &str, ctx: &TaskContext) -> TaskResult {
        let spec = ActorSpec::mesh(self.shape, self.location)
            .with_rotation(self.rotation)
            .with_scale(self.scale);
        match ctx.place_actor(self.actor_id.as_deref(), &spec) {
            Ok(placed) => TaskResult::success(
                format!("{:?} {} at {:?}", placed.action, self.shape, self.location).to_lowercase(),
                super::object(json!({
                    "actor_id": self.actor_id,
                    "handle": placed.handle,
                    "action": placed.action,
                    "location": self.location,
                })),
            ),
            Err(err) => TaskResult::failure(format!("spawn failed: {err}")),
        }
    }
}

/// `rows` x `cols` actors centred on the origin; ids are `{id_prefix}{row}_{col}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpawnGridTask {
    #[serde(default = "SpawnGridTask::default_side")]
    pub rows: u32,
    #[serde(default = "SpawnGridTask::default_side")]
    pub cols: u32,
    #[serde(default = "SpawnGridTask::default_spacing")]
    pub spacing: f64,
    #[serde(default = "cube")]
    pub shape: Shape,
    #[serde(default = "one")]
    pub scale: f64,
    #[serde(default)]
    pub id_prefix: String,
}

impl SpawnGridTask {
    fn default_side() -> u32 {
        5
    }

    fn default_spacing() -> f64 {
        200.0
    }

    fn id(&self, row: u32, col: u32) -> String {
        format!("{}{row}_{col}", self.id_prefix)
    }
}

impl TaskSpec for SpawnGridTask {
    const TYPE: &'static str = "SpawnGridTask";

    fn validate(&self) -> Result<(), TaskError> {
        check_grid(self.rows, self.cols)?;
        check_scale(self.scale)
    }

    fn actor_ids(&self) -> Vec<String> {
        grid_cells(self.rows, self.cols, self.spacing, zero())
            .into_iter()
            .map(|(row, col, _)| self.id(row, col))
            .collect()
    }

    fn run(&self, _name: &str, ctx: &TaskContext) -> TaskResult {
        let mut log = PlacementLog::default();
        for (row, col, location) in grid_cells(self.rows, self.cols, self.spacing, zero()) {
            let id = self.id(row, col);
            let spec = ActorSpec::mesh(self.shape, location).with_scale(self.scale);
            log.record(Some(&id), ctx.place_actor(Some(&id), &spec));
        }
        log.into_result(&format!("{}s in grid", self.shape))
            .with_metadata("pattern", json!("grid"))
            .with_metadata("rows", json!(self.rows))
            .with_metadata("cols", json!(self.cols))
    }
}

/// `count` actors evenly spaced on a horizontal circle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpawnCircleTask {
    #[serde(default = "SpawnCircleTask::default_count")]
    pub count: u32,
    #[serde(default = "SpawnCircleTask::default_radius")]
    pub radius: f64,
    #[serde(default = "sphere")]
    pub shape: Shape,
    #[serde(default = "one")]
    pub scale: f64,
    #[serde(default)]
    pub height: f64,
    /// When set, actors get ids `{id_prefix}{index}` and take part in upsert.
    #[serde(default)]
    pub id_prefix: Option<String>,
}

impl SpawnCircleTask {
    fn default_count() -> u32 {
        12
    }

    fn default_radius() -> f64 {
        500.0
    }

    fn positions(&self) -> Vec<Vec3> {
        (0..self.count)
            .map(|i| {
                let angle = 2.0 * PI * f64::from(i) / f64::from(self.count);
                [self.radius * angle.cos(), self.radius * angle.sin(), self.height]
            })
            .collect()
    }
}

impl TaskSpec for SpawnCircleTask {
    const TYPE: &'static str = "SpawnCircleTask";

    fn validate(&self) -> Result<(), TaskError> {
        if self.count == 0 {
            return Err(TaskError::InvalidValue {
                param: "count",
                message: "must be at least 1".into(),
            });
        }
        check_scale(self.scale)
    }

    fn actor_ids(&self) -> Vec<String> {
        indexed_ids(self.id_prefix.as_deref(), self.count)
    }

    fn run(&self, _name: &str, ctx: &TaskContext) -> TaskResult {
        place_indexed(ctx, self.id_prefix.as_deref(), self.shape, self.scale, self.positions())
            .with_metadata("pattern", json!("circle"))
            .with_metadata("radius", json!(self.radius))
    }
}

/// `count` actors on a two-turn rising spiral.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpawnSpiralTask {
    #[serde(default = "SpawnSpiralTask::default_count")]
    pub count: u32,
    #[serde(default = "SpawnSpiralTask::default_max_radius")]
    pub max_radius: f64,
    #[serde(default = "SpawnSpiralTask::default_height_increment")]
    pub height_increment: f64,
    #[serde(default = "cylinder")]
    pub shape: Shape,
    #[serde(default = "one")]
    pub scale: f64,
    #[serde(default)]
    pub id_prefix: Option<String>,
}

impl SpawnSpiralTask {
    fn default_count() -> u32 {
        15
    }

    fn default_max_radius() -> f64 {
        400.0
    }

    fn default_height_increment() -> f64 {
        50.0
    }

    fn positions(&self) -> Vec<Vec3> {
        let last = f64::from(self.count.saturating_sub(1).max(1));
        (0..self.count)
            .map(|i| {
                let t = f64::from(i) / last;
                let angle = 4.0 * PI * t;
                let radius = self.max_radius * t;
                [
                    radius * angle.cos(),
                    radius * angle.sin(),
                    f64::from(i) * self.height_increment,
                ]
            })
            .collect()
    }
}

impl TaskSpec for SpawnSpiralTask {
    const TYPE: &'static str = "SpawnSpiralTask";

    fn validate(&self) -> Result<(), TaskError> {
        check_scale(self.scale)
    }

    fn actor_ids(&self) -> Vec<String> {
        indexed_ids(self.id_prefix.as_deref(), self.count)
    }

    fn run(&self, _name: &str, ctx: &TaskContext) -> TaskResult {
        place_indexed(ctx, self.id_prefix.as_deref(), self.shape, self.scale, self.positions())
            .with_metadata("pattern", json!("spiral"))
            .with_metadata("max_radius", json!(self.max_radius))
    }
}

fn indexed_ids(prefix: Option<&str>, count: u32) -> Vec<String> {
    match prefix {
        Some(p) => (0..count).map(|i| format!("{p}{i}")).collect(),
        None => Vec::new(),
    }
}

fn place_indexed(
    ctx: &TaskContext,
    id_prefix: Option<&str>,
    shape: Shape,
    scale: f64,
    positions: Vec<Vec3>,
) -> TaskResult {
    let mut log = PlacementLog::default();
    for (i, location) in positions.into_iter().enumerate() {
        let id = id_prefix.map(|p| format!("{p}{i}"));
        let spec = ActorSpec::mesh(shape, location).with_scale(scale);
        log.record(id.as_deref(), ctx.place_actor(id.as_deref(), &spec));
    }
    log.into_result(&format!("{shape}s"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_support::{context, upsert_context};
    use crate::host::SceneHost;
    use crate::{TaskStatus, UpsertAction, WorkflowConfig};
    use serde_json::Value;

    fn close(a: Vec3, b: Vec3) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn grid_upsert_updates_on_second_run() {
        let (ctx, scene) = upsert_context();
        let task = SpawnGridTask {
            rows: 2,
            cols: 2,
            spacing: 100.0,
            shape: Shape::Cube,
            scale: 1.0,
            id_prefix: "g".into(),
        };

        let first = task.run("grid", &ctx);
        assert_eq!(first.status, TaskStatus::Success);
        assert_eq!(first.output["created"], 4);

        let second = task.run("grid", &ctx);
        assert_eq!(second.output["updated"], 4);
        assert_eq!(scene.actor_count().unwrap(), 4);
        assert_eq!(ctx.registry().ids(), vec!["g0_0", "g0_1", "g1_0", "g1_1"]);
    }

    #[test]
    fn circle_positions_follow_the_radius() {
        let task: SpawnCircleTask =
            serde_json::from_value(serde_json::json!({ "count": 4, "radius": 10.0 })).unwrap();
        let pos = task.positions();
        assert!(close(pos[0], [10.0, 0.0, 0.0]));
        assert!(close(pos[1], [0.0, 10.0, 0.0]));
        assert!(close(pos[2], [-10.0, 0.0, 0.0]));
    }

    #[test]
    fn spiral_ends_at_max_radius() {
        let task: SpawnSpiralTask = serde_json::from_value(
            serde_json::json!({ "count": 3, "max_radius": 100.0, "height_increment": 10.0 }),
        )
        .unwrap();
        let pos = task.positions();
        assert!(close(pos[0], [0.0, 0.0, 0.0]));
        // t = 1 after two full turns lands back on the +x axis.
        assert!(close(pos[2], [100.0, 0.0, 20.0]));
    }

    #[test]
    fn single_actor_without_id_always_creates() {
        let (ctx, scene) = context(WorkflowConfig::default());
        let task: SpawnActorTask =
            serde_json::from_value(Value::Object(Default::default())).unwrap();
        assert_eq!(task.run("a", &ctx).output["action"], "created");
        assert_eq!(task.run("a", &ctx).output["action"], "created");
        assert_eq!(scene.actor_count().unwrap(), 2);
    }

    #[test]
    fn single_actor_with_id_is_declared_and_upserted() {
        let (ctx, _) = upsert_context();
        let task = SpawnActorTask {
            actor_id: Some("hero".into()),
            shape: Shape::Sphere,
            location: [1.0, 2.0, 3.0],
            rotation: [0.0; 3],
            scale: 2.0,
        };
        assert_eq!(task.actor_ids(), vec!["hero"]);
        task.run("a", &ctx);
        let again = task.run("a", &ctx);
        assert_eq!(again.output["action"], serde_json::json!(UpsertAction::Updated));
    }

    #[test]
    fn rejects_non_positive_scale_and_empty_circle() {
        assert!(serde_json::from_value::<SpawnActorTask>(serde_json::json!({ "scale": 0.0 }))
            .unwrap()
            .validate()
            .is_err());
        assert!(serde_json::from_value::<SpawnCircleTask>(serde_json::json!({ "count": 0 }))
            .unwrap()
            .validate()
            .is_err());
    }
}
