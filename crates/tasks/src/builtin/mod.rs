//! Built-in scene tasks, registered under their document type keys.
//!
//! - primitives: [`ClearLevelTask`], [`SpawnActorTask`], [`CreateLightTask`],
//!   [`CreateCameraTask`], [`SetActorColorTask`], [`ColorGridTask`]
//! - materials: [`MaterialUpsertTask`], [`ApplyMaterialTask`],
//!   [`ForEachMaterialTask`]
//! - patterns: [`SpawnGridTask`], [`SpawnCircleTask`], [`SpawnSpiralTask`]
//! - generators: [`LightsGeneratorTask`], [`GridGeneratorTask`]
//! - materializers: [`ForEachLightTask`], [`ForEachSpawnTask`]
//!
//! Generators only validate and expand a declarative list into an output
//! field; a for-each task reads that field by reference and performs one
//! creation per item.

mod camera;
mod clear;
mod color;
mod foreach;
mod generators;
mod light;
mod material;
mod spawn;

pub use camera::CreateCameraTask;
pub use clear::ClearLevelTask;
pub use color::{ColorEntry, ColorGridTask, SetActorColorTask};
pub use foreach::{ForEachLightTask, ForEachSpawnTask, SpawnItem};
pub use generators::{GridGeneratorTask, LightEntry, LightsGeneratorTask};
pub use light::{CreateLightTask, LightConfig};
pub use material::{ApplyMaterialTask, ForEachMaterialTask, MaterialUpsertTask};
pub use spawn::{SpawnActorTask, SpawnCircleTask, SpawnGridTask, SpawnSpiralTask};

use serde_json::{json, Value};

use crate::error::RegistryError;
use crate::host::{Rgb, Vec3};
use crate::registry::Upserted;
use crate::{Output, TaskError, TaskResult, TaskTypeRegistry};

/// Register every built-in type.
pub fn register_all(registry: &mut TaskTypeRegistry) {
    registry
        .register_spec::<ClearLevelTask>()
        .register_spec::<SpawnActorTask>()
        .register_spec::<SpawnGridTask>()
        .register_spec::<SpawnCircleTask>()
        .register_spec::<SpawnSpiralTask>()
        .register_spec::<SetActorColorTask>()
        .register_spec::<ColorGridTask>()
        .register_spec::<CreateLightTask>()
        .register_spec::<CreateCameraTask>()
        .register_spec::<MaterialUpsertTask>()
        .register_spec::<ApplyMaterialTask>()
        .register_spec::<ForEachMaterialTask>()
        .register_spec::<LightsGeneratorTask>()
        .register_spec::<GridGeneratorTask>()
        .register_spec::<ForEachLightTask>()
        .register_spec::<ForEachSpawnTask>();
}

fn zero() -> Vec3 {
    [0.0; 3]
}

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

fn white() -> Rgb {
    [1.0; 3]
}

fn check_scale(scale: f64) -> Result<(), TaskError> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(TaskError::InvalidValue {
            param: "scale",
            message: format!("must be a positive number, got {scale}"),
        });
    }
    Ok(())
}

/// Largest number of cells a grid task may expand to.
pub const MAX_GRID_CELLS: u64 = 10_000;

fn check_grid(rows: u32, cols: u32) -> Result<(), TaskError> {
    let cells = u64::from(rows) * u64::from(cols);
    if cells > MAX_GRID_CELLS {
        return Err(TaskError::InvalidValue {
            param: "rows",
            message: format!("{rows} x {cols} grid exceeds {MAX_GRID_CELLS} cells"),
        });
    }
    Ok(())
}

fn check_color(param: &'static str, color: &Rgb) -> Result<(), TaskError> {
    if color.iter().any(|c| !(0.0..=1.0).contains(c)) {
        return Err(TaskError::InvalidValue {
            param,
            message: format!("channels must be within 0..=1, got {color:?}"),
        });
    }
    Ok(())
}

fn check_unit(param: &'static str, value: f64) -> Result<(), TaskError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(TaskError::InvalidValue {
            param,
            message: format!("must be within 0..=1, got {value}"),
        });
    }
    Ok(())
}

/// Convert a `json!({...})` literal into an output map.
fn object(value: Value) -> Output {
    match value {
        Value::Object(map) => map,
        _ => Output::new(),
    }
}

/// Per-item bookkeeping for tasks that place several objects.
#[derive(Debug, Default)]
struct PlacementLog {
    placed: Vec<Value>,
    failed: Vec<Value>,
    created: usize,
    updated: usize,
}

impl PlacementLog {
    fn record(&mut self, actor_id: Option<&str>, outcome: Result<Upserted, RegistryError>) {
        match outcome {
            Ok(Upserted { handle, action }) => {
                match action {
                    crate::UpsertAction::Created => self.created += 1,
                    crate::UpsertAction::Updated => self.updated += 1,
                }
                self.placed.push(json!({
                    "actor_id": actor_id,
                    "handle": handle,
                    "action": action,
                }));
            }
            Err(err) => self.fail(actor_id, err.to_string()),
        }
    }

    fn fail(&mut self, actor_id: Option<&str>, error: impl Into<String>) {
        self.failed.push(json!({ "actor_id": actor_id, "error": error.into() }));
    }

    fn into_result(self, what: &str) -> TaskResult {
        let successful = self.placed.len();
        let failed = self.failed.len();
        let message = if failed == 0 {
            format!(
                "placed {successful} {what} ({} created, {} updated)",
                self.created, self.updated
            )
        } else {
            format!("placed {successful} of {} {what}; {failed} failed", successful + failed)
        };
        let output = object(json!({
            "actors": self.placed,
            "failed": self.failed,
            "actor_count": successful,
            "created": self.created,
            "updated": self.updated,
            "total_attempted": successful + failed,
            "successful": successful,
            "failed_count": failed,
        }));
        TaskResult::from_counts(successful, failed, message, output)
    }
}

/// Grid cell positions centred on `offset`, row-major.
fn grid_cells(rows: u32, cols: u32, spacing: f64, offset: Vec3) -> Vec<(u32, u32, Vec3)> {
    let center_x = f64::from(cols.saturating_sub(1)) * spacing / 2.0;
    let center_y = f64::from(rows.saturating_sub(1)) * spacing / 2.0;
    let mut cells = Vec::with_capacity(rows as usize * cols as usize);
    for row in 0..rows {
        for col in 0..cols {
            let x = f64::from(col) * spacing - center_x + offset[0];
            let y = f64::from(row) * spacing - center_y + offset[1];
            cells.push((row, col, [x, y, offset[2]]));
        }
    }
    cells
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::memory::MemoryScene;
    use crate::{ActorRegistry, TaskContext, WorkflowConfig};

    pub fn context(config: WorkflowConfig) -> (TaskContext, Arc<MemoryScene>) {
        let scene = Arc::new(MemoryScene::new());
        let registry = Arc::new(ActorRegistry::new(config.actor_id_prefix.clone()));
        (TaskContext::new("test", config, registry, scene.clone()), scene)
    }

    pub fn upsert_context() -> (TaskContext, Arc<MemoryScene>) {
        let config = WorkflowConfig {
            upsert_mode: true,
            ..WorkflowConfig::default()
        };
        context(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_is_centred_on_offset() {
        let cells = grid_cells(2, 3, 100.0, [0.0, 0.0, 50.0]);
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0], (0, 0, [-100.0, -50.0, 50.0]));
        assert_eq!(cells[5], (1, 2, [100.0, 50.0, 50.0]));
    }

    #[test]
    fn oversized_grids_are_rejected_without_overflow() {
        assert!(check_grid(100, 100).is_ok());
        assert!(check_grid(0, u32::MAX).is_ok());
        assert!(matches!(
            check_grid(65_536, 65_536),
            Err(TaskError::InvalidValue { param: "rows", .. })
        ));
        assert!(check_grid(u32::MAX, u32::MAX).is_err());
    }

    #[test]
    fn placement_log_reports_mixed_outcomes_as_partial() {
        let mut log = PlacementLog::default();
        log.record(
            Some("a"),
            Ok(Upserted {
                handle: crate::ActorHandle::new("actor_0"),
                action: crate::UpsertAction::Created,
            }),
        );
        log.fail(Some("b"), "boom");
        let result = log.into_result("things");
        assert_eq!(result.status, crate::TaskStatus::PartialSuccess);
        assert_eq!(result.output["successful"], 1);
        assert_eq!(result.output["failed"][0]["actor_id"], "b");
    }
}
