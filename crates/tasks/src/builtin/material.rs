//! Material assets: make sure one exists, then assign it to actors.
//!
//! `MaterialUpsertTask` outputs `material_path`, which `ApplyMaterialTask`
//! can read by reference instead of repeating the path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::{object, yes};
use crate::{Reference, TaskContext, TaskError, TaskResult, TaskSpec, BASIC_SHAPE_MATERIAL};

/// Asset paths are absolute, e.g. `/Game/Workflow/MI_Red`.
fn check_asset_path(param: &'static str, path: &str) -> Result<(), TaskError> {
    let name = path.strip_prefix('/').and_then(|p| p.rsplit('/').next());
    if name.map_or(true, str::is_empty) {
        return Err(TaskError::InvalidValue {
            param,
            message: format!("expected an absolute asset path, got '{path}'"),
        });
    }
    Ok(())
}

/// Ensure a material instance exists, deriving it from a parent if allowed.
///
/// Output: `material_path`, `created`, `vector_parameter_name`,
/// `has_parameter`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialUpsertTask {
    #[serde(default = "MaterialUpsertTask::default_path")]
    pub material_path: String,
    #[serde(default = "MaterialUpsertTask::default_parent")]
    pub parent_material_path: String,
    /// Parameter later colour tasks expect to drive.
    #[serde(default = "MaterialUpsertTask::default_parameter")]
    pub vector_parameter_name: String,
    #[serde(default = "yes")]
    pub allow_create: bool,
}

impl MaterialUpsertTask {
    fn default_path() -> String {
        "/Game/Workflow/MI_RuntimeColorBase".into()
    }

    fn default_parent() -> String {
        BASIC_SHAPE_MATERIAL.into()
    }

    fn default_parameter() -> String {
        "Color".into()
    }
}

impl TaskSpec for MaterialUpsertTask {
    const TYPE: &'static str = "MaterialUpsertTask";

    fn validate(&self) -> Result<(), TaskError> {
        check_asset_path("material_path", &self.material_path)?;
        check_asset_path("parent_material_path", &self.parent_material_path)
    }

    fn run(&self, name: &str, ctx: &TaskContext) -> TaskResult {
        let info = match ctx.host().ensure_material(
            &self.material_path,
            &self.parent_material_path,
            self.allow_create,
        ) {
            Ok(info) => info,
            Err(err) => return TaskResult::failure(format!("material upsert failed: {err}")),
        };

        let has_parameter = info.has_vector_parameter(&self.vector_parameter_name);
        if !has_parameter {
            warn!(
                "[{name}] vector parameter '{}' not found in {}",
                self.vector_parameter_name, info.path
            );
        }

        let action = if info.created { "created" } else { "found" };
        TaskResult::success(
            format!("{action} material {}", info.path),
            object(json!({
                "material_path": info.path,
                "created": info.created,
                "vector_parameter_name": self.vector_parameter_name,
                "has_parameter": has_parameter,
            })),
        )
    }
}

/// Assign a material to one registered actor.
///
/// The path is given literally as `material_path` or read from an upstream
/// task through `material_input` (e.g. `"material.material_path"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyMaterialTask {
    pub actor_id: String,
    #[serde(default)]
    pub material_path: Option<String>,
    #[serde(default)]
    pub material_input: Option<Reference>,
    #[serde(default)]
    pub material_slot: u32,
}

impl ApplyMaterialTask {
    fn material(&self, ctx: &TaskContext) -> Result<String, String> {
        match (&self.material_path, &self.material_input) {
            (Some(path), _) => Ok(path.clone()),
            (None, Some(input)) => ctx.resolve_as(input),
            (None, None) => Err("no material_path specified".into()),
        }
    }
}

impl TaskSpec for ApplyMaterialTask {
    const TYPE: &'static str = "ApplyMaterialTask";

    fn validate(&self) -> Result<(), TaskError> {
        match (&self.material_path, &self.material_input) {
            (Some(path), None) => check_asset_path("material_path", path),
            (None, Some(_)) => Ok(()),
            _ => Err(TaskError::InvalidValue {
                param: "material_path",
                message: "give exactly one of material_path or material_input".into(),
            }),
        }
    }

    fn references(&self) -> Vec<Reference> {
        self.material_input.iter().cloned().collect()
    }

    fn run(&self, _name: &str, ctx: &TaskContext) -> TaskResult {
        let path = match self.material(ctx) {
            Ok(path) => path,
            Err(err) => return TaskResult::failure(err),
        };
        let Some(handle) = ctx.registry().get(&self.actor_id) else {
            return TaskResult::failure(format!("actor '{}' not found in registry", self.actor_id));
        };

        match ctx.host().apply_material(&handle, &path, self.material_slot) {
            Ok(()) => TaskResult::success(
                format!("applied {path} to {}", self.actor_id),
                object(json!({
                    "actor_id": self.actor_id,
                    "actor_label": ctx.registry().label_for(&self.actor_id),
                    "material_path": path,
                    "material_slot": self.material_slot,
                })),
            ),
            Err(err) => TaskResult::failure(format!("failed to apply material {path}: {err}")),
        }
    }
}

/// Apply a material per registry id, from a literal `material_map` or an
/// upstream `map_input` object of the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForEachMaterialTask {
    /// Actor id to material path.
    #[serde(default)]
    pub material_map: BTreeMap<String, String>,
    #[serde(default)]
    pub map_input: Option<Reference>,
    #[serde(default)]
    pub material_slot: u32,
}

impl TaskSpec for ForEachMaterialTask {
    const TYPE: &'static str = "ForEachMaterialTask";

    fn validate(&self) -> Result<(), TaskError> {
        if self.material_map.is_empty() && self.map_input.is_none() {
            return Err(TaskError::InvalidValue {
                param: "material_map",
                message: "give a non-empty material_map or a map_input reference".into(),
            });
        }
        for path in self.material_map.values() {
            check_asset_path("material_map", path)?;
        }
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        self.map_input.iter().cloned().collect()
    }

    fn run(&self, _name: &str, ctx: &TaskContext) -> TaskResult {
        let map = match &self.map_input {
            Some(input) if self.material_map.is_empty() => {
                match ctx.resolve_as::<BTreeMap<String, String>>(input) {
                    Ok(map) => map,
                    Err(err) => return TaskResult::failure(err),
                }
            }
            _ => self.material_map.clone(),
        };
        if map.is_empty() {
            return TaskResult::failure("no material mapping found");
        }

        let mut matching = Vec::new();
        let mut errors = Vec::new();
        for (id, path) in &map {
            let Some(handle) = ctx.registry().get(id) else {
                errors.push(format!("actor '{id}' not found in registry"));
                continue;
            };
            match ctx.host().apply_material(&handle, path, self.material_slot) {
                Ok(()) => matching.push(ctx.registry().label_for(id)),
                Err(err) => errors.push(format!("{id}: {err}")),
            }
        }

        TaskResult::from_counts(
            matching.len(),
            errors.len(),
            format!("applied materials to {} of {} actors", matching.len(), map.len()),
            object(json!({
                "modified_count": matching.len(),
                "material_map_size": map.len(),
                "matching_actors": matching,
                "errors": errors,
            })),
        )
    }
}
