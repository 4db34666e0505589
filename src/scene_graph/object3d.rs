use glam::Vec3;
use id_arena::Id;

use crate::camera::PerspectiveCamera;
use crate::material_manager::MaterialId;
use crate::scene_graph::scene_model::SceneModelId;
use crate::scene_graph::transform::Transform;

pub type ObjectId = Id<Object3D>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient { color: Vec3, intensity: f32 },
    Point { color: Vec3, intensity: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshNode {
    pub model_id: SceneModelId,
    pub material: MaterialId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Camera(PerspectiveCamera),
    Light(Light),
    /// Root of an instantiated model; `source` names the file it came from.
    Model { source: String },
    Mesh(MeshNode),
}

pub struct Object3D {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub visible: bool,
    pub parent_id: Option<ObjectId>,
    pub child_ids: Vec<ObjectId>,
}

impl Object3D {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

impl Default for Object3D {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: Transform::from_translation(Vec3::ZERO),
            kind: NodeKind::Group,
            visible: true,
            parent_id: None,
            child_ids: Vec::new(),
        }
    }
}
