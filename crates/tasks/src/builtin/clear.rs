use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::object;
use crate::{TaskContext, TaskResult, TaskSpec};

/// Remove every object from the scene.
///
/// Also forgets all registry entries, since their handles are gone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClearLevelTask {}

impl TaskSpec for ClearLevelTask {
    const TYPE: &'static str = "ClearLevelTask";

    fn run(&self, name: &str, ctx: &TaskContext) -> TaskResult {
        match ctx.host().clear_all() {
            Ok(deleted) => {
                let forgotten = ctx.registry().clear();
                info!("[{name}] cleared {deleted} actors");
                TaskResult::success(
                    format!("cleared {deleted} actors"),
                    object(json!({ "deleted_count": deleted })),
                )
                .with_metadata("forgotten_ids", json!(forgotten))
            }
            Err(err) => TaskResult::failure(format!("clear failed: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_support::upsert_context;
    use crate::host::{ActorSpec, SceneHost, Shape};
    use crate::TaskStatus;

    #[test]
    fn clears_scene_and_registry() {
        let (ctx, scene) = upsert_context();
        ctx.place_actor(Some("a"), &ActorSpec::mesh(Shape::Cube, [0.0; 3])).unwrap();
        scene.spawn(&ActorSpec::mesh(Shape::Cube, [0.0; 3])).unwrap();

        let result = ClearLevelTask {}.run("clear", &ctx);
        assert_eq!(result.status, TaskStatus::Success);
        assert_eq!(result.output["deleted_count"], 2);
        assert!(ctx.registry().is_empty());
    }

    #[test]
    fn host_failure_becomes_failed_result() {
        let (ctx, scene) = upsert_context();
        scene.fail_clear(true);
        let result = ClearLevelTask {}.run("clear", &ctx);
        assert_eq!(result.status, TaskStatus::Failure);
        assert!(result.message.contains("clear failed"));
    }
}
