use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{check_color, white, yes};
use crate::host::{ActorSpec, LightProps, LightType, Rgb, Vec3};
use crate::{TaskContext, TaskError, TaskResult, TaskSpec};

/// A fully defaulted light definition, as produced by `LightsGeneratorTask`
/// and consumed by `ForEachLightTask`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightConfig {
    pub actor_id: String,
    pub light_type: LightType,
    pub location: Vec3,
    pub rotation: Vec3,
    pub intensity: f64,
    pub color: Rgb,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast_shadows: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_cone_angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_cone_angle: Option<f64>,
}

impl LightConfig {
    /// Range checks shared by the generator and the primitive.
    pub fn check(&self) -> Result<(), TaskError> {
        check_color("color", &self.color)?;
        if !(self.intensity.is_finite() && self.intensity >= 0.0) {
            return Err(TaskError::InvalidValue {
                param: "intensity",
                message: format!("must be non-negative, got {}", self.intensity),
            });
        }
        if self.radius.is_some_and(|r| r < 0.0) {
            return Err(TaskError::InvalidValue {
                param: "radius",
                message: "must be non-negative".into(),
            });
        }
        for (param, angle) in [
            ("inner_cone_angle", self.inner_cone_angle),
            ("outer_cone_angle", self.outer_cone_angle),
        ] {
            if angle.is_some_and(|a| !(0.0..=90.0).contains(&a)) {
                return Err(TaskError::InvalidValue {
                    param,
                    message: "must be within 0..=90 degrees".into(),
                });
            }
        }
        Ok(())
    }

    pub fn to_spec(&self) -> ActorSpec {
        ActorSpec::light(
            LightProps {
                light_type: self.light_type,
                intensity: self.intensity,
                color: self.color,
                radius: self.radius,
                cast_shadows: self.cast_shadows,
                inner_cone_angle: self.inner_cone_angle,
                outer_cone_angle: self.outer_cone_angle,
            },
            self.location,
            self.rotation,
        )
    }
}

/// Create (or upsert) a single light.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateLightTask {
    #[serde(default = "CreateLightTask::default_type")]
    pub light_type: LightType,
    #[serde(default = "CreateLightTask::default_location")]
    pub location: Vec3,
    #[serde(default = "CreateLightTask::default_rotation")]
    pub rotation: Vec3,
    #[serde(default = "CreateLightTask::default_intensity")]
    pub intensity: f64,
    #[serde(default = "white")]
    pub color: Rgb,
    #[serde(default)]
    pub actor_id: Option<String>,
    /// Route through the identity registry when upsert mode is on.
    #[serde(default = "yes")]
    pub use_registry: bool,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub cast_shadows: Option<bool>,
    #[serde(default)]
    pub inner_cone_angle: Option<f64>,
    #[serde(default)]
    pub outer_cone_angle: Option<f64>,
}

impl CreateLightTask {
    fn default_type() -> LightType {
        LightType::Point
    }

    fn default_location() -> Vec3 {
        [0.0, 0.0, 300.0]
    }

    fn default_rotation() -> Vec3 {
        [-45.0, 0.0, 0.0]
    }

    pub(crate) fn default_intensity() -> f64 {
        5000.0
    }

    fn config(&self) -> LightConfig {
        LightConfig {
            actor_id: self.actor_id.clone().unwrap_or_default(),
            light_type: self.light_type,
            location: self.location,
            rotation: self.rotation,
            intensity: self.intensity,
            color: self.color,
            radius: self.radius,
            cast_shadows: self.cast_shadows,
            inner_cone_angle: self.inner_cone_angle,
            outer_cone_angle: self.outer_cone_angle,
        }
    }
}

impl TaskSpec for CreateLightTask {
    const TYPE: &'static str = "CreateLightTask";

    fn validate(&self) -> Result<(), TaskError> {
        self.config().check()
    }

    fn actor_ids(&self) -> Vec<String> {
        match (&self.actor_id, self.use_registry) {
            (Some(id), true) => vec![id.clone()],
            _ => Vec::new(),
        }
    }

    fn run(&self, _name: &str, ctx: &TaskContext) -> TaskResult {
        let id = self.actor_id.as_deref().filter(|_| self.use_registry);
        match ctx.place_actor(id, &self.config().to_spec()) {
            Ok(placed) => TaskResult::success(
                format!("{:?} light {}", self.light_type, placed.handle),
                super::object(json!({
                    "actor_id": self.actor_id,
                    "handle": placed.handle,
                    "action": placed.action,
                    "light_type": self.light_type,
                    "location": self.location,
                })),
            ),
            Err(err) => TaskResult::failure(format!("light creation failed: {err}")),
        }
    }
}
