//! `MemoryScene`: an in-process [`SceneHost`].
//!
//! Backs the unit tests and the binary's simulate mode. Objects live in a
//! `BTreeMap` so listings come back in creation order.
//!
//! A fresh scene knows one material, [`BASIC_SHAPE_MATERIAL`], exposing a
//! `Color` vector parameter. Derived materials inherit their parent's
//! parameters.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::error::HostError;
use crate::host::{ActorHandle, ActorSpec, MaterialInfo, Rgb, SceneHost};

/// Engine material every scene starts with.
pub const BASIC_SHAPE_MATERIAL: &str = "/Engine/BasicShapes/BasicShapeMaterial";

/// A stored object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneObject {
    pub handle: ActorHandle,
    pub spec: ActorSpec,
    pub color: Option<(Rgb, f64)>,
    /// Material path per slot.
    pub materials: BTreeMap<u32, String>,
    /// Number of `update` calls applied since creation.
    pub updates: usize,
}

#[derive(Debug)]
struct SceneState {
    objects: BTreeMap<u64, SceneObject>,
    /// Material path to its vector parameter names.
    materials: BTreeMap<String, Vec<String>>,
    next_id: u64,
    saves: usize,
    fail_labels: HashSet<String>,
    fail_clear: bool,
    fail_save: bool,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
            materials: BTreeMap::from([(
                BASIC_SHAPE_MATERIAL.to_owned(),
                vec!["Color".to_owned()],
            )]),
            next_id: 0,
            saves: 0,
            fail_labels: HashSet::new(),
            fail_clear: false,
            fail_save: false,
        }
    }
}

/// In-memory scene with optional failure injection.
#[derive(Debug, Default)]
pub struct MemoryScene {
    state: Mutex<SceneState>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material asset with the given vector parameters.
    pub fn add_material(&self, path: impl Into<String>, vector_parameters: &[&str]) {
        let params = vector_parameters.iter().map(|p| (*p).to_owned()).collect();
        self.lock().materials.insert(path.into(), params);
    }

    pub fn has_material(&self, path: &str) -> bool {
        self.lock().materials.contains_key(path)
    }

    /// Make `spawn` fail for specs carrying exactly this label.
    pub fn fail_spawn_for_label(&self, label: impl Into<String>) {
        self.lock().fail_labels.insert(label.into());
    }

    pub fn fail_clear(&self, fail: bool) {
        self.lock().fail_clear = fail;
    }

    pub fn fail_save(&self, fail: bool) {
        self.lock().fail_save = fail;
    }

    /// Snapshot of every object, oldest first.
    pub fn objects(&self) -> Vec<SceneObject> {
        self.lock().objects.values().cloned().collect()
    }

    pub fn object(&self, handle: &ActorHandle) -> Option<SceneObject> {
        let state = self.lock();
        let id = parse_handle(handle)?;
        state.objects.get(&id).cloned()
    }

    /// How many times `save` succeeded.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> MutexGuard<'_, SceneState> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_handle(handle: &ActorHandle) -> Option<u64> {
    handle.as_str().strip_prefix("actor_")?.parse().ok()
}

impl SceneHost for MemoryScene {
    fn spawn(&self, spec: &ActorSpec) -> Result<ActorHandle, HostError> {
        let mut state = self.lock();
        if let Some(label) = &spec.label {
            if state.fail_labels.contains(label) {
                return Err(HostError::Rejected(format!("spawn refused for '{label}'")));
            }
        }

        let id = state.next_id;
        state.next_id += 1;
        let handle = ActorHandle::new(format!("actor_{id}"));
        state.objects.insert(
            id,
            SceneObject {
                handle: handle.clone(),
                spec: spec.clone(),
                color: None,
                materials: BTreeMap::new(),
                updates: 0,
            },
        );
        Ok(handle)
    }

    fn update(&self, handle: &ActorHandle, spec: &ActorSpec) -> Result<(), HostError> {
        let mut state = self.lock();
        let object = parse_handle(handle)
            .and_then(|id| state.objects.get_mut(&id))
            .ok_or_else(|| HostError::UnknownActor(handle.to_string()))?;

        let label = object.spec.label.clone();
        object.spec = ActorSpec {
            label,
            ..spec.clone()
        };
        object.updates += 1;
        Ok(())
    }

    fn set_color(&self, handle: &ActorHandle, color: Rgb, opacity: f64) -> Result<(), HostError> {
        let mut state = self.lock();
        let object = parse_handle(handle)
            .and_then(|id| state.objects.get_mut(&id))
            .ok_or_else(|| HostError::UnknownActor(handle.to_string()))?;
        object.color = Some((color, opacity));
        Ok(())
    }

    fn ensure_material(
        &self,
        path: &str,
        parent: &str,
        allow_create: bool,
    ) -> Result<MaterialInfo, HostError> {
        let mut state = self.lock();
        if let Some(params) = state.materials.get(path) {
            return Ok(MaterialInfo {
                path: path.to_owned(),
                created: false,
                vector_parameters: params.clone(),
            });
        }
        if !allow_create {
            return Err(HostError::UnknownMaterial(path.to_owned()));
        }
        let params = state
            .materials
            .get(parent)
            .cloned()
            .ok_or_else(|| HostError::UnknownMaterial(parent.to_owned()))?;
        state.materials.insert(path.to_owned(), params.clone());
        Ok(MaterialInfo {
            path: path.to_owned(),
            created: true,
            vector_parameters: params,
        })
    }

    fn apply_material(&self, handle: &ActorHandle, path: &str, slot: u32) -> Result<(), HostError> {
        let mut state = self.lock();
        if !state.materials.contains_key(path) {
            return Err(HostError::UnknownMaterial(path.to_owned()));
        }
        let object = parse_handle(handle)
            .and_then(|id| state.objects.get_mut(&id))
            .ok_or_else(|| HostError::UnknownActor(handle.to_string()))?;
        object.materials.insert(slot, path.to_owned());
        Ok(())
    }

    fn labelled(&self, prefix: &str) -> Result<Vec<(String, ActorHandle)>, HostError> {
        let state = self.lock();
        Ok(state
            .objects
            .values()
            .filter_map(|o| {
                let label = o.spec.label.as_ref()?;
                label
                    .starts_with(prefix)
                    .then(|| (label.clone(), o.handle.clone()))
            })
            .collect())
    }

    fn clear_all(&self) -> Result<usize, HostError> {
        let mut state = self.lock();
        if state.fail_clear {
            return Err(HostError::Unavailable("clear refused".into()));
        }
        let removed = state.objects.len();
        state.objects.clear();
        Ok(removed)
    }

    fn save(&self) -> Result<(), HostError> {
        let mut state = self.lock();
        if state.fail_save {
            return Err(HostError::Unavailable("save refused".into()));
        }
        state.saves += 1;
        Ok(())
    }

    fn actor_count(&self) -> Result<usize, HostError> {
        Ok(self.lock().objects.len())
    }
}
