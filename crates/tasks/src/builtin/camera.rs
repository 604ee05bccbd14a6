//! Camera placement.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{object, yes, zero};
use crate::host::{ActorSpec, Vec3};
use crate::{TaskContext, TaskError, TaskResult, TaskSpec};

/// Create (or upsert) a single camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCameraTask {
    #[serde(default = "CreateCameraTask::default_location")]
    pub location: Vec3,
    /// `[pitch, yaw, roll]` in degrees.
    #[serde(default = "zero")]
    pub rotation: Vec3,
    #[serde(default = "CreateCameraTask::default_fov")]
    pub fov: f64,
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default = "yes")]
    pub use_registry: bool,
}

impl CreateCameraTask {
    fn default_location() -> Vec3 {
        [0.0, 0.0, 200.0]
    }

    fn default_fov() -> f64 {
        90.0
    }
}

impl TaskSpec for CreateCameraTask {
    const TYPE: &'static str = "CreateCameraTask";

    fn validate(&self) -> Result<(), TaskError> {
        if !(self.fov > 0.0 && self.fov < 180.0) {
            return Err(TaskError::InvalidValue {
                param: "fov",
                message: format!("must be between 0 and 180 degrees, got {}", self.fov),
            });
        }
        Ok(())
    }

    fn actor_ids(&self) -> Vec<String> {
        match (&self.actor_id, self.use_registry) {
            (Some(id), true) => vec![id.clone()],
            _ => Vec::new(),
        }
    }

    fn run(&self, _name: &str, ctx: &TaskContext) -> TaskResult {
        let id = self.actor_id.as_deref().filter(|_| self.use_registry);
        let spec = ActorSpec::camera(self.fov, self.location, self.rotation);
        match ctx.place_actor(id, &spec) {
            Ok(placed) => TaskResult::success(
                format!("{:?} camera {}", placed.action, placed.handle).to_lowercase(),
                object(json!({
                    "actor_id": self.actor_id,
                    "handle": placed.handle,
                    "action": placed.action,
                    "location": self.location,
                    "fov": self.fov,
                })),
            ),
            Err(err) => TaskResult::failure(format!("camera creation failed: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_support::upsert_context;
    use crate::host::{ActorKind, SceneHost};
    use serde_json::json;

    #[test]
    fn second_run_moves_the_same_camera() {
        let (ctx, scene) = upsert_context();
        let mut task: CreateCameraTask =
            serde_json::from_value(json!({ "actor_id": "main_cam" })).unwrap();
        assert_eq!(task.actor_ids(), vec!["main_cam"]);
        let first = task.run("cam", &ctx);
        assert!(first.is_success(), "{first}");
        assert_eq!(first.output["action"], "created");

        task.location = [500.0, 0.0, 250.0];
        task.fov = 60.0;
        let second = task.run("cam", &ctx);
        assert_eq!(second.output["action"], "updated");
        assert_eq!(scene.actor_count().unwrap(), 1);

        let camera = &scene.objects()[0];
        assert_eq!(camera.spec.location, [500.0, 0.0, 250.0]);
        assert_eq!(camera.spec.kind, ActorKind::Camera { fov: 60.0 });
        assert_eq!(camera.spec.label.as_deref(), Some("workflow_main_cam"));
    }

    #[test]
    fn field_of_view_must_be_an_open_angle() {
        for fov in [0.0, 180.0, -5.0, f64::NAN] {
            let task = CreateCameraTask {
                fov,
                ..serde_json::from_value::<CreateCameraTask>(json!({})).unwrap()
            };
            assert!(task.validate().is_err(), "fov {fov}");
        }
        let task: CreateCameraTask = serde_json::from_value(json!({ "fov": 35.0 })).unwrap();
        assert!(task.validate().is_ok());
    }
}
