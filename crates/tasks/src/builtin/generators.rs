//! Generator tasks: validate and expand declarative lists, create nothing.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::light::{CreateLightTask, LightConfig};
use super::{check_grid, check_scale, grid_cells, object, one, white, zero};
use crate::host::{LightType, Rgb, Shape, Vec3};
use crate::{TaskContext, TaskError, TaskResult, TaskSpec};

/// One light as written in a document; unset fields take the generator's defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightEntry {
    #[serde(default)]
    pub actor_id: Option<String>,
    pub light_type: LightType,
    pub location: Vec3,
    #[serde(default)]
    pub rotation: Option<Vec3>,
    #[serde(default)]
    pub intensity: Option<f64>,
    #[serde(default)]
    pub color: Option<Rgb>,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub cast_shadows: Option<bool>,
    #[serde(default)]
    pub inner_cone_angle: Option<f64>,
    #[serde(default)]
    pub outer_cone_angle: Option<f64>,
}

/// Expand a list of light entries into complete [`LightConfig`]s.
///
/// Output: `lights` (the expanded list) and `count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightsGeneratorTask {
    #[serde(default)]
    pub lights: Vec<LightEntry>,
    #[serde(default = "CreateLightTask::default_intensity")]
    pub default_intensity: f64,
    #[serde(default = "white")]
    pub default_color: Rgb,
    #[serde(default = "zero")]
    pub default_rotation: Vec3,
}

impl LightsGeneratorTask {
    fn expand(&self) -> Result<Vec<LightConfig>, String> {
        self.lights
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let config = LightConfig {
                    actor_id: entry.actor_id.clone().unwrap_or_else(|| format!("light_{idx}")),
                    light_type: entry.light_type,
                    location: entry.location,
                    rotation: entry.rotation.unwrap_or(self.default_rotation),
                    intensity: entry.intensity.unwrap_or(self.default_intensity),
                    color: entry.color.unwrap_or(self.default_color),
                    radius: entry.radius,
                    cast_shadows: entry.cast_shadows,
                    inner_cone_angle: entry.inner_cone_angle,
                    outer_cone_angle: entry.outer_cone_angle,
                };
                config.check().map_err(|e| format!("light {idx}: {e}"))?;
                Ok(config)
            })
            .collect()
    }
}

impl TaskSpec for LightsGeneratorTask {
    const TYPE: &'static str = "LightsGeneratorTask";

    fn run(&self, _name: &str, _ctx: &TaskContext) -> TaskResult {
        if self.lights.is_empty() {
            return TaskResult::failure("no lights defined");
        }
        match self.expand() {
            Ok(lights) => TaskResult::success(
                format!("generated {} light configurations", lights.len()),
                object(json!({ "count": lights.len(), "lights": lights })),
            ),
            Err(err) => TaskResult::failure(err),
        }
    }
}

/// Compute grid points for a later `ForEachSpawnTask`.
///
/// Output: `grid_points` (each with `actor_id`, `row`, `col`, `index`,
/// `location`, `shape`, `scale`), `total_points`, `rows`, `cols`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridGeneratorTask {
    #[serde(default = "GridGeneratorTask::default_side")]
    pub rows: u32,
    #[serde(default = "GridGeneratorTask::default_side")]
    pub cols: u32,
    #[serde(default = "GridGeneratorTask::default_spacing")]
    pub spacing: f64,
    #[serde(default = "zero")]
    pub center_offset: Vec3,
    #[serde(default = "GridGeneratorTask::default_shape")]
    pub shape: Shape,
    #[serde(default = "one")]
    pub scale: f64,
    #[serde(default)]
    pub id_prefix: String,
}

impl GridGeneratorTask {
    fn default_side() -> u32 {
        3
    }

    fn default_spacing() -> f64 {
        200.0
    }

    fn default_shape() -> Shape {
        Shape::Sphere
    }
}

impl TaskSpec for GridGeneratorTask {
    const TYPE: &'static str = "GridGeneratorTask";

    fn validate(&self) -> Result<(), TaskError> {
        check_grid(self.rows, self.cols)?;
        check_scale(self.scale)
    }

    fn run(&self, _name: &str, _ctx: &TaskContext) -> TaskResult {
        let points: Vec<_> = grid_cells(self.rows, self.cols, self.spacing, self.center_offset)
            .into_iter()
            .map(|(row, col, location)| {
                json!({
                    "actor_id": format!("{}{row}_{col}", self.id_prefix),
                    "row": row,
                    "col": col,
                    "index": row as usize * self.cols as usize + col as usize,
                    "location": location,
                    "shape": self.shape,
                    "scale": self.scale,
                })
            })
            .collect();

        TaskResult::success(
            format!("generated {} grid points", points.len()),
            object(json!({
                "total_points": points.len(),
                "rows": self.rows,
                "cols": self.cols,
                "grid_points": points,
            })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_support::context;
    use crate::{TaskStatus, WorkflowConfig};
    use serde_json::json;

    #[test]
    fn lights_take_generator_defaults() {
        let (ctx, _) = context(WorkflowConfig::default());
        let task: LightsGeneratorTask = serde_json::from_value(json!({
            "default_intensity": 1200.0,
            "lights": [
                { "light_type": "point", "location": [0, 0, 100] },
                { "actor_id": "rim", "light_type": "spot", "location": [1, 2, 3], "color": [0.5, 0.5, 1.0] }
            ]
        }))
        .unwrap();

        let result = task.run("gen", &ctx);
        assert_eq!(result.status, TaskStatus::Success);
        assert_eq!(result.output["count"], 2);

        let lights: Vec<LightConfig> =
            serde_json::from_value(result.output["lights"].clone()).unwrap();
        assert_eq!(lights[0].actor_id, "light_0");
        assert_eq!(lights[0].intensity, 1200.0);
        assert_eq!(lights[0].color, [1.0, 1.0, 1.0]);
        assert_eq!(lights[1].actor_id, "rim");
        assert_eq!(lights[1].light_type, LightType::Spot);
    }

    #[test]
    fn empty_or_invalid_lists_fail() {
        let (ctx, _) = context(WorkflowConfig::default());
        let empty: LightsGeneratorTask = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.run("gen", &ctx).status, TaskStatus::Failure);

        let bad: LightsGeneratorTask = serde_json::from_value(json!({
            "lights": [{ "light_type": "point", "location": [0, 0, 0], "intensity": -1.0 }]
        }))
        .unwrap();
        let result = bad.run("gen", &ctx);
        assert_eq!(result.status, TaskStatus::Failure);
        assert!(result.message.contains("light 0"));
    }

    #[test]
    fn unknown_light_type_is_a_schema_error() {
        let parsed = serde_json::from_value::<LightsGeneratorTask>(json!({
            "lights": [{ "light_type": "laser", "location": [0, 0, 0] }]
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn grid_points_are_indexed_row_major() {
        let (ctx, _) = context(WorkflowConfig::default());
        let task: GridGeneratorTask =
            serde_json::from_value(json!({ "rows": 1, "cols": 3, "spacing": 10.0 })).unwrap();
        let result = task.run("gen", &ctx);
        assert_eq!(result.output["total_points"], 3);
        let points = result.output["grid_points"].as_array().unwrap();
        assert_eq!(points[2]["actor_id"], "0_2");
        assert_eq!(points[2]["index"], 2);
        assert_eq!(points[0]["location"], json!([-10.0, 0.0, 0.0]));
        assert_eq!(points[0]["shape"], "sphere");
    }

    #[test]
    fn grid_larger_than_the_cell_cap_fails_validation() {
        let task: GridGeneratorTask =
            serde_json::from_value(json!({ "rows": 65536, "cols": 65536 })).unwrap();
        assert!(matches!(
            task.validate(),
            Err(TaskError::InvalidValue { param: "rows", .. })
        ));

        let task: GridGeneratorTask =
            serde_json::from_value(json!({ "rows": 100, "cols": 100 })).unwrap();
        assert!(task.validate().is_ok());
    }
}
