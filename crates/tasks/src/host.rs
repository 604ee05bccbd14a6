//! The scene host collaborator.
//!
//! Everything that touches the 3D engine goes through [`SceneHost`]. Calls are
//! synchronous and may block for as long as the host needs; they fail with
//! [`HostError`], which tasks turn into failed results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// Opaque handle to an object living in the host scene.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorHandle(String);

impl ActorHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `[x, y, z]` in scene units, or `[pitch, yaw, roll]` in degrees.
pub type Vec3 = [f64; 3];

/// Linear RGB, each channel in `0.0..=1.0`.
pub type Rgb = [f64; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Cube,
    Sphere,
    Cylinder,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shape::Cube => "cube",
            Shape::Sphere => "sphere",
            Shape::Cylinder => "cylinder",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightType {
    Point,
    Spot,
    Directional,
}

/// Light-specific properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightProps {
    pub light_type: LightType,
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActorKind {
    Mesh { shape: Shape },
    Light(LightProps),
    /// Field of view in degrees.
    Camera { fov: f64 },
}

/// Declarative description of an object to create or update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSpec {
    #[serde(flatten)]
    pub kind: ActorKind,
    pub location: Vec3,
    pub rotation: Vec3,
    pub scale: f64,
    /// Label to stamp on a newly created object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ActorSpec {
    pub fn mesh(shape: Shape, location: Vec3) -> Self {
        Self {
            kind: ActorKind::Mesh { shape },
            location,
            rotation: [0.0; 3],
            scale: 1.0,
            label: None,
        }
    }

    pub fn light(props: LightProps, location: Vec3, rotation: Vec3) -> Self {
        Self {
            kind: ActorKind::Light(props),
            location,
            rotation,
            scale: 1.0,
            label: None,
        }
    }

    pub fn camera(fov: f64, location: Vec3, rotation: Vec3) -> Self {
        Self {
            kind: ActorKind::Camera { fov },
            location,
            rotation,
            scale: 1.0,
            label: None,
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// What [`SceneHost::ensure_material`] found or made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialInfo {
    pub path: String,
    /// The material did not exist and was derived from the parent.
    pub created: bool,
    /// Vector parameter names exposed by the material.
    pub vector_parameters: Vec<String>,
}

impl MaterialInfo {
    pub fn has_vector_parameter(&self, name: &str) -> bool {
        self.vector_parameters.iter().any(|p| p == name)
    }
}

/// Capabilities the host engine exposes to tasks and to the executor.
pub trait SceneHost: Send + Sync {
    /// Create an object and return its handle.
    fn spawn(&self, spec: &ActorSpec) -> Result<ActorHandle, HostError>;

    /// Re-apply `spec` (transform and properties) to an existing object.
    /// The object's label is left unchanged.
    fn update(&self, handle: &ActorHandle, spec: &ActorSpec) -> Result<(), HostError>;

    /// Tint an object.
    fn set_color(&self, handle: &ActorHandle, color: Rgb, opacity: f64) -> Result<(), HostError>;

    /// Look up the material asset at `path`. When it is missing and
    /// `allow_create` is set, derive it from `parent`.
    fn ensure_material(
        &self,
        path: &str,
        parent: &str,
        allow_create: bool,
    ) -> Result<MaterialInfo, HostError>;

    /// Assign an existing material to one material slot of an object.
    fn apply_material(&self, handle: &ActorHandle, path: &str, slot: u32) -> Result<(), HostError>;

    /// All labelled objects whose label starts with `prefix`, as `(label, handle)`.
    fn labelled(&self, prefix: &str) -> Result<Vec<(String, ActorHandle)>, HostError>;

    /// Remove every object; returns how many were removed.
    fn clear_all(&self) -> Result<usize, HostError>;

    /// Persist the current scene.
    fn save(&self) -> Result<(), HostError>;

    /// Number of objects currently in the scene.
    fn actor_count(&self) -> Result<usize, HostError>;
}
