pub mod node_updater;
pub mod object3d;
pub mod scene;
pub mod scene_model;
pub mod transform;

// Re-export main types for convenience
pub use node_updater::NodeUpdater;
pub use object3d::{Light, MeshNode, NodeKind, Object3D, ObjectId};
pub use scene::Scene;
pub use scene_model::{SceneModel, SceneModelId};
pub use transform::Transform;
