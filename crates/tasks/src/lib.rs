//! `tasks` crate: the `Task` trait, its run context, and built-in scene tasks.
//!
//! Every task, built-in or custom, implements [`Task`]. The engine
//! crate orders tasks and dispatches execution through this trait object;
//! tasks reach the scene only through the [`SceneHost`] collaborator and the
//! per-run [`ActorRegistry`].

pub mod builtin;
pub mod config;
pub mod error;
pub mod factory;
pub mod host;
pub mod memory;
pub mod mock;
pub mod reference;
pub mod registry;
pub mod result;
pub mod traits;

pub use config::{Preset, WorkflowConfig};
pub use error::{ConfigError, HostError, RegistryError, TaskError};
pub use factory::{SpecTask, TaskFactory, TaskSpec, TaskTypeRegistry};
pub use host::{ActorHandle, ActorSpec, MaterialInfo, SceneHost};
pub use memory::{MemoryScene, BASIC_SHAPE_MATERIAL};
pub use reference::{Reference, ReferenceError};
pub use registry::{ActorRegistry, UpsertAction, Upserted};
pub use result::{Output, TaskResult, TaskStatus};
pub use traits::{Task, TaskContext};
