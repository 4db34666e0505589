use anyhow::bail;
use glam::{Mat4, Vec3};
use id_arena::Arena;

use crate::material_manager::{MaterialId, MaterialManager};
use crate::model::{MaterialRef, ModelNode, ModelScene};
use crate::render_loop::FrameContext;
use crate::scene_graph::node_updater::NodeUpdater;
use crate::scene_graph::object3d::{MeshNode, NodeKind, Object3D, ObjectId};
use crate::scene_graph::scene_model::{SceneModel, SceneModelId};
use crate::scene_graph::transform::Transform;

struct RegisteredUpdater {
    target: ObjectId,
    updater: Box<dyn NodeUpdater>,
}

pub struct Scene {
    pub objects: Arena<Object3D>,
    pub models: Arena<SceneModel>,
    updaters: Vec<RegisteredUpdater>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            models: Arena::new(),
            updaters: Vec::new(),
        }
    }

    pub fn add_object(&mut self, object: Object3D) -> ObjectId {
        self.objects.alloc(object)
    }

    /// Adds an object and attaches it under `parent`.
    pub fn spawn(&mut self, object: Object3D, parent: Option<ObjectId>) -> ObjectId {
        let object_id = self.add_object(object);

        if parent.is_some() {
            self.set_object_parent(object_id, parent);
        }

        object_id
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    #[cfg(test)]
    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, object)| object.name == name)
            .map(|(id, _)| id)
    }

    pub fn add_model(&mut self, model: SceneModel) -> SceneModelId {
        self.models.alloc(model)
    }

    /// Registers the per-frame writer of `target`'s transform.
    ///
    /// Each node accepts at most one updater.
    pub fn register_updater(
        &mut self,
        target: ObjectId,
        updater: impl NodeUpdater + 'static,
    ) -> anyhow::Result<()> {
        let Some(object) = self.objects.get(target) else {
            bail!("Cannot register updater for unknown object {:?}", target);
        };

        if self.updaters.iter().any(|entry| entry.target == target) {
            bail!("Object '{}' already has an updater", object.name);
        }

        self.updaters.push(RegisteredUpdater {
            target,
            updater: Box::new(updater),
        });

        Ok(())
    }

    #[cfg(test)]
    pub fn updater_count(&self) -> usize {
        self.updaters.len()
    }

    /// Runs every registered updater once, in registration order.
    pub fn run_updaters(&mut self, frame: &FrameContext) {
        for entry in &mut self.updaters {
            if let Some(object) = self.objects.get_mut(entry.target) {
                entry.updater.update(&mut object.transform, frame);
            }
        }

        for target in self.updaters.iter().map(|entry| entry.target) {
            self.invalidate_object_hierarchy(target);
        }
    }

    /// Spawns `model` under `parent` and returns the new model root.
    ///
    /// Embedded materials are registered through `materials`, keyed by source
    /// file, so two instances of one file share their materials.
    pub fn instantiate_model(
        &mut self,
        model: &ModelScene,
        materials: &mut MaterialManager,
        parent: Option<ObjectId>,
    ) -> ObjectId {
        let root = self.spawn(
            Object3D::new(
                model.source.clone(),
                NodeKind::Model {
                    source: model.source.clone(),
                },
            ),
            parent,
        );

        let model_ids: Vec<SceneModelId> = model
            .meshes
            .iter()
            .map(|mesh| self.add_model(SceneModel::new(mesh.clone())))
            .collect();

        for node in &model.roots {
            self.spawn_model_node(model, &model_ids, materials, node, root);
        }

        root
    }

    fn spawn_model_node(
        &mut self,
        model: &ModelScene,
        model_ids: &[SceneModelId],
        materials: &mut MaterialManager,
        node: &ModelNode,
        parent: ObjectId,
    ) {
        let kind = match node.mesh.and_then(|mesh| model_ids.get(mesh.mesh).map(|id| (mesh, *id))) {
            Some((mesh, model_id)) => NodeKind::Mesh(MeshNode {
                model_id,
                material: resolve_material(model, materials, mesh.material),
            }),
            None => NodeKind::Group,
        };

        let object = Object3D::new(node.name.clone(), kind).with_transform(Transform::new(
            node.translation,
            node.rotation,
            node.scale,
        ));
        let object_id = self.spawn(object, Some(parent));

        for child in &node.children {
            self.spawn_model_node(model, model_ids, materials, child, object_id);
        }
    }

    /// Calls `f` for `root` and every descendant, depth first.
    pub fn visit_subtree(&self, root: ObjectId, f: &mut impl FnMut(ObjectId, &Object3D)) {
        if let Some(object) = self.objects.get(root) {
            f(root, object);

            for &child_id in &object.child_ids {
                self.visit_subtree(child_id, f);
            }
        }
    }

    /// True if the object and all of its ancestors are visible.
    pub fn is_visible(&self, object_id: ObjectId) -> bool {
        let mut current = self.objects.get(object_id);

        while let Some(object) = current {
            if !object.visible {
                return false;
            }
            current = object.parent_id.and_then(|id| self.objects.get(id));
        }

        true
    }

    #[cfg(test)]
    pub fn count_nodes(&self, predicate: impl Fn(&NodeKind) -> bool) -> usize {
        self.objects
            .iter()
            .filter(|(_, object)| predicate(&object.kind))
            .count()
    }

    pub fn world_matrix(&self, object_id: ObjectId) -> Option<Mat4> {
        self.objects
            .get(object_id)
            .map(|object| *object.transform.get_world_matrix())
    }

    #[cfg(test)]
    pub fn world_position(&self, object_id: ObjectId) -> Option<Vec3> {
        self.world_matrix(object_id)
            .map(|matrix| matrix.w_axis.truncate())
    }

    /// Updates all object transforms in hierarchical order
    fn update_transforms(&self) {
        let root_objects = self.objects.iter().filter_map(|(id, object)| {
            if object.parent_id.is_none() {
                Some(id)
            } else {
                None
            }
        });

        for root_id in root_objects {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY, false);
        }
    }

    /// Recursively updates an object's world transform and its children
    fn update_object_transform_recursive(
        &self,
        object_id: ObjectId,
        parent_world_matrix: Mat4,
        parent_changed: bool,
    ) {
        if let Some(object) = self.objects.get(object_id) {
            let local_matrix = *object.transform.get_local_matrix();
            let changed = parent_changed || object.transform.is_world_dirty();

            if changed {
                object
                    .transform
                    .set_world_matrix(parent_world_matrix * local_matrix);
            }

            let world_matrix = *object.transform.get_world_matrix();
            for &child_id in &object.child_ids {
                self.update_object_transform_recursive(child_id, world_matrix, changed);
            }
        }
    }

    /// Invalidates world transforms for an object and all its descendants
    pub fn invalidate_object_hierarchy(&self, object_id: ObjectId) {
        if let Some(object) = self.objects.get(object_id) {
            object.transform.invalidate_world();

            for &child_id in &object.child_ids {
                self.invalidate_object_hierarchy(child_id);
            }
        }
    }

    /// Sets the parent of an object and updates child relationships
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        if let Some(child) = self.objects.get(child_id) {
            if let Some(old_parent_id) = child.parent_id {
                if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                    old_parent.child_ids.retain(|&id| id != child_id);
                }
            }
        }

        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;

            if let Some(new_parent_id) = new_parent_id {
                if let Some(new_parent) = self.objects.get_mut(new_parent_id) {
                    new_parent.child_ids.push(child_id);
                }
            }
        }

        self.invalidate_object_hierarchy(child_id);
    }

    #[cfg(test)]
    pub fn get_object_transform(&self, object_id: ObjectId) -> Option<&Transform> {
        self.objects.get(object_id).map(|object| &object.transform)
    }

    pub fn late_update(&mut self) {
        self.update_transforms();
    }
}

fn resolve_material(
    model: &ModelScene,
    materials: &mut MaterialManager,
    material: MaterialRef,
) -> MaterialId {
    match material {
        MaterialRef::Shared(id) => id,
        MaterialRef::Embedded(Some(index)) => match model.materials.get(index) {
            Some(embedded) => materials.get_or_add_gltf(&model.source, index, embedded),
            None => {
                log::warn!(
                    "{} references missing material {}, using default",
                    model.source,
                    index
                );
                materials.default_material()
            }
        },
        MaterialRef::Embedded(None) => materials.default_material(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::lettering;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn child_world_matrix_composes_with_parent() {
        let mut scene = Scene::new();
        let parent = scene.spawn(
            Object3D::group("Parent").with_transform(Transform::from_translation(Vec3::new(0.0, 0.0, 5.0))),
            None,
        );
        let child = scene.spawn(
            Object3D::group("Child").with_transform(Transform::from_translation(Vec3::new(1.0, 0.0, 0.0))),
            Some(parent),
        );

        scene.late_update();

        assert_eq!(scene.world_position(child), Some(Vec3::new(1.0, 0.0, 5.0)));
    }

    #[test]
    fn parent_changes_propagate_to_children() {
        let mut scene = Scene::new();
        let parent = scene.spawn(Object3D::group("Parent"), None);
        let child = scene.spawn(
            Object3D::group("Child").with_transform(Transform::from_translation(Vec3::X)),
            Some(parent),
        );
        scene.late_update();

        scene
            .register_updater(parent, |transform: &mut Transform, _: &FrameContext| {
                transform.set_rotation(Vec3::new(0.0, FRAC_PI_2, 0.0));
            })
            .unwrap();
        scene.run_updaters(&FrameContext::at_scroll(1, 0.0));
        scene.late_update();

        let position = scene.world_position(child).unwrap();
        assert!(position.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-5));
    }

    #[test]
    fn second_updater_for_same_node_is_rejected() {
        let mut scene = Scene::new();
        let node = scene.spawn(Object3D::group("Spinner"), None);

        scene
            .register_updater(node, |_: &mut Transform, _: &FrameContext| {})
            .unwrap();
        let error = scene
            .register_updater(node, |_: &mut Transform, _: &FrameContext| {})
            .unwrap_err();

        assert!(error.to_string().contains("Spinner"));
        assert_eq!(scene.updater_count(), 1);
    }

    #[test]
    fn updaters_run_in_registration_order() {
        use std::{cell::RefCell, rc::Rc};

        let mut scene = Scene::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let node = scene.spawn(Object3D::group(name), None);
            let order = order.clone();
            scene
                .register_updater(node, move |_: &mut Transform, _: &FrameContext| {
                    order.borrow_mut().push(name);
                })
                .unwrap();
        }

        scene.run_updaters(&FrameContext::at_scroll(1, 0.0));

        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn instantiating_model_builds_one_model_root() {
        let mut scene = Scene::new();
        let mut materials = MaterialManager::new();
        let anchor = scene.spawn(Object3D::group("Anchor"), None);

        let root = scene.instantiate_model(&lettering(), &mut materials, Some(anchor));

        assert_eq!(
            scene.count_nodes(|kind| matches!(kind, NodeKind::Model { .. })),
            1
        );
        assert_eq!(scene.get_object(root).unwrap().parent_id, Some(anchor));
        assert_eq!(scene.count_nodes(|kind| matches!(kind, NodeKind::Mesh(_))), 3);
        assert_eq!(scene.models.len(), 2);
    }

    #[test]
    fn embedded_materials_are_shared_between_instances() {
        let mut scene = Scene::new();
        let mut materials = MaterialManager::new();

        scene.instantiate_model(&lettering(), &mut materials, None);
        scene.instantiate_model(&lettering(), &mut materials, None);

        // default + "Ink" + "Paper"
        assert_eq!(materials.len(), 3);
    }

    #[test]
    fn overridden_model_uses_shared_material_everywhere() {
        let mut scene = Scene::new();
        let mut materials = MaterialManager::new();
        let chrome = materials.add_material(Default::default());

        let root = scene.instantiate_model(&lettering().with_material(chrome), &mut materials, None);

        let mut mesh_materials = Vec::new();
        scene.visit_subtree(root, &mut |_, object| {
            if let NodeKind::Mesh(mesh) = &object.kind {
                mesh_materials.push(mesh.material);
            }
        });

        assert_eq!(mesh_materials, vec![chrome; 3]);
    }

    #[test]
    fn hidden_ancestor_hides_descendants() {
        let mut scene = Scene::new();
        let hidden = scene.spawn(Object3D::group("Hidden").with_visible(false), None);
        let child = scene.spawn(Object3D::group("Child"), Some(hidden));
        let shown = scene.spawn(Object3D::group("Shown"), None);

        assert!(!scene.is_visible(child));
        assert!(scene.is_visible(shown));
    }

    #[test]
    fn reparenting_moves_child_between_parents() {
        let mut scene = Scene::new();
        let a = scene.spawn(Object3D::group("A"), None);
        let b = scene.spawn(Object3D::group("B"), None);
        let child = scene.spawn(Object3D::group("Child"), Some(a));

        scene.set_object_parent(child, Some(b));

        assert!(scene.get_object(a).unwrap().child_ids.is_empty());
        assert_eq!(scene.get_object(b).unwrap().child_ids, vec![child]);
        assert_eq!(scene.get_object_by_name("Child"), Some(child));
    }
}
