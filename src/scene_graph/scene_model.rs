use id_arena::Id;

use crate::model::Model;

pub type SceneModelId = Id<SceneModel>;

/// Mesh data owned by the scene and shared by the mesh nodes that draw it.
pub struct SceneModel {
    pub model: Model,
}

impl SceneModel {
    pub fn new(model: Model) -> Self {
        Self { model }
    }
}
