//! Tinting existing actors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{check_color, check_unit, object, one, white};
use crate::host::{ActorHandle, Rgb};
use crate::{TaskContext, TaskError, TaskResult, TaskSpec};

/// Colour actors picked by scene label and/or registry id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetActorColorTask {
    #[serde(default)]
    pub actor_labels: Vec<String>,
    #[serde(default)]
    pub actor_ids: Vec<String>,
    pub color: Rgb,
    #[serde(default = "one")]
    pub opacity: f64,
}

impl TaskSpec for SetActorColorTask {
    const TYPE: &'static str = "SetActorColorTask";

    fn validate(&self) -> Result<(), TaskError> {
        if self.actor_labels.is_empty() && self.actor_ids.is_empty() {
            return Err(TaskError::InvalidValue {
                param: "actor_labels",
                message: "give at least one of actor_labels or actor_ids".into(),
            });
        }
        check_color("color", &self.color)?;
        check_unit("opacity", self.opacity)
    }

    fn run(&self, _name: &str, ctx: &TaskContext) -> TaskResult {
        let mut targets: Vec<(String, Option<ActorHandle>)> = Vec::new();

        for label in &self.actor_labels {
            match ctx.host().labelled(label) {
                Ok(found) => {
                    let exact: Vec<ActorHandle> = found
                        .into_iter()
                        .filter(|(l, _)| l == label)
                        .map(|(_, h)| h)
                        .collect();
                    if exact.is_empty() {
                        targets.push((label.clone(), None));
                    }
                    targets.extend(exact.into_iter().map(|h| (label.clone(), Some(h))));
                }
                Err(err) => return TaskResult::failure(format!("label lookup failed: {err}")),
            }
        }
        for id in &self.actor_ids {
            targets.push((id.clone(), ctx.registry().get(id)));
        }

        paint(ctx, targets, self.color, self.opacity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColorEntry {
    #[serde(default = "white")]
    pub color: Rgb,
    #[serde(default = "one")]
    pub opacity: f64,
}

/// Colour registry ids individually from a `color_map`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColorGridTask {
    pub color_map: BTreeMap<String, ColorEntry>,
}

impl TaskSpec for ColorGridTask {
    const TYPE: &'static str = "ColorGridTask";

    fn validate(&self) -> Result<(), TaskError> {
        for entry in self.color_map.values() {
            check_color("color_map.color", &entry.color)?;
            check_unit("color_map.opacity", entry.opacity)?;
        }
        Ok(())
    }

    fn run(&self, _name: &str, ctx: &TaskContext) -> TaskResult {
        let mut modified = 0usize;
        let mut missing = Vec::new();
        let mut errors = Vec::new();

        for (id, entry) in &self.color_map {
            let Some(handle) = ctx.registry().get(id) else {
                missing.push(id.clone());
                continue;
            };
            match ctx.host().set_color(&handle, entry.color, entry.opacity) {
                Ok(()) => modified += 1,
                Err(err) => errors.push(format!("{id}: {err}")),
            }
        }

        let failed = missing.len() + errors.len();
        TaskResult::from_counts(
            modified,
            failed,
            format!("coloured {modified} of {} actors", self.color_map.len()),
            object(json!({
                "modified_count": modified,
                "color_map_size": self.color_map.len(),
                "missing": missing,
                "errors": errors,
            })),
        )
    }
}

fn paint(
    ctx: &TaskContext,
    targets: Vec<(String, Option<ActorHandle>)>,
    color: Rgb,
    opacity: f64,
) -> TaskResult {
    let mut modified = Vec::new();
    let mut missing = Vec::new();
    let mut errors = Vec::new();

    for (key, handle) in targets {
        let Some(handle) = handle else {
            missing.push(key);
            continue;
        };
        match ctx.host().set_color(&handle, color, opacity) {
            Ok(()) => modified.push(key),
            Err(err) => errors.push(format!("{key}: {err}")),
        }
    }

    let failed = missing.len() + errors.len();
    TaskResult::from_counts(
        modified.len(),
        failed,
        format!("coloured {} actors, {failed} not coloured", modified.len()),
        object(json!({
            "modified_count": modified.len(),
            "modified": modified,
            "missing": missing,
            "errors": errors,
            "color": color,
        })),
    )
}
