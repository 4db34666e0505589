use std::f32::consts::FRAC_PI_2;

use anyhow::anyhow;
use glam::Vec3;

use crate::{
    animation::ModelAnimator,
    assets::{load_cube_map, spawn_load, AssetHandle, AssetLoadState, CubeMapData},
    camera::PerspectiveCamera,
    camera_rig::CameraRig,
    config::SceneConfig,
    material_manager::{srgb_hex, MaterialManager, StandardMaterial},
    model::{Model, ModelScene},
    scene_graph::{Light, MeshNode, NodeKind, Object3D, ObjectId, Scene, SceneModel, Transform},
};

/// Nodes of the scroll scene that exist from mount.
#[derive(Debug, Clone, Copy)]
pub struct ViewNodes {
    pub camera_rig: ObjectId,
    pub camera: ObjectId,
    /// Spinning group that receives the model once it loads.
    pub lettering: ObjectId,
    /// Scales and orients the loaded model inside `lettering`.
    pub lettering_mount: ObjectId,
    pub marker: ObjectId,
}

/// Builds the camera rig, lights, lettering group and marker box, and
/// registers their per-frame updaters.
pub fn build_view(
    scene: &mut Scene,
    materials: &mut MaterialManager,
    config: &SceneConfig,
) -> anyhow::Result<ViewNodes> {
    let camera_rig = scene.spawn(
        Object3D::group("Camera").with_transform(Transform::from_translation(Vec3::new(0.0, 0.0, 5.0))),
        None,
    );
    let camera = scene.spawn(
        Object3D::new(
            "Perspective camera",
            NodeKind::Camera(PerspectiveCamera::default()),
        ),
        Some(camera_rig),
    );

    scene.spawn(
        Object3D::new(
            "Ambient light",
            NodeKind::Light(Light::Ambient {
                color: Vec3::ONE,
                intensity: 1.0,
            }),
        ),
        None,
    );
    scene.spawn(
        Object3D::new(
            "Point light",
            NodeKind::Light(Light::Point {
                color: Vec3::ONE,
                intensity: 1.0,
            }),
        )
        .with_transform(Transform::from_translation(Vec3::new(0.0, 0.0, 10.0))),
        None,
    );

    let lettering = scene.spawn(Object3D::group("Lettering"), None);
    let lettering_mount = scene.spawn(
        Object3D::group("Lettering mount").with_transform(Transform::new(
            Vec3::new(-0.5, 0.0, -0.1),
            Vec3::new(FRAC_PI_2, 0.0, 0.0),
            0.02,
        )),
        Some(lettering),
    );

    let marker_model = scene.add_model(SceneModel::new(Model::cube("Marker box", 0.1)));
    let marker_material = materials.add_material(StandardMaterial {
        name: "Marker orange".to_string(),
        color: srgb_hex(0xffa500),
        ..Default::default()
    });
    let marker = scene.spawn(
        Object3D::new(
            "Marker",
            NodeKind::Mesh(MeshNode {
                model_id: marker_model,
                material: marker_material,
            }),
        )
        .with_visible(config.show_marker),
        None,
    );

    scene.register_updater(camera_rig, CameraRig)?;
    scene.register_updater(lettering, ModelAnimator::spin())?;
    scene.register_updater(marker, ModelAnimator::inert())?;

    Ok(ViewNodes {
        camera_rig,
        camera,
        lettering,
        lettering_mount,
        marker,
    })
}

/// Brushed navy metal applied to every mesh of the lettering.
pub fn lettering_material() -> StandardMaterial {
    StandardMaterial {
        name: "Aluminium medium".to_string(),
        color: srgb_hex(0x001536),
        roughness: 0.6,
        metalness: 1.0,
        env_map: true,
    }
}

pub enum GateState {
    Pending,
    Ready,
    Failed(anyhow::Error),
}

/// Assets the scene waits for before it is drawn.
pub struct DemoAssets {
    pub model: AssetHandle<ModelScene>,
    pub environment: AssetHandle<CubeMapData>,
    attached: Option<ObjectId>,
}

impl DemoAssets {
    pub fn new(model: AssetHandle<ModelScene>, environment: AssetHandle<CubeMapData>) -> Self {
        Self {
            model,
            environment,
            attached: None,
        }
    }

    pub fn load(config: &SceneConfig) -> Self {
        let model_path = config.model_path.clone();
        let model = spawn_load(model_path.display().to_string(), move || {
            ModelScene::load_gltf(&model_path)
        });

        let faces = config.env_map_faces.clone();
        let environment = spawn_load("environment map", move || load_cube_map(&faces));

        Self::new(model, environment)
    }

    /// Failure of either asset wins over the other one still pending.
    pub fn poll(&mut self) -> GateState {
        self.model.poll();
        self.environment.poll();

        if let Some(error) = failure(&self.model).or_else(|| failure(&self.environment)) {
            return GateState::Failed(error);
        }

        if self.model.state().is_pending() || self.environment.state().is_pending() {
            GateState::Pending
        } else {
            GateState::Ready
        }
    }

    /// Spawns the lettering under `parent` the first time both assets are ready.
    pub fn attach_once(
        &mut self,
        scene: &mut Scene,
        materials: &mut MaterialManager,
        parent: ObjectId,
    ) -> Option<ObjectId> {
        if let Some(root) = self.attached {
            return Some(root);
        }

        let model = self.model.state().as_ready()?;
        self.environment.state().as_ready()?;

        let material = materials.add_material(lettering_material());
        let lettering = model.clone().with_material(material);
        let root = scene.instantiate_model(&lettering, materials, Some(parent));

        log::info!(
            "Attached {} with {} meshes",
            lettering.source,
            lettering.mesh_refs().len()
        );

        self.attached = Some(root);
        self.attached
    }

    pub fn environment_map(&self) -> Option<&CubeMapData> {
        self.environment.state().as_ready()
    }

    #[cfg(test)]
    pub fn attached_root(&self) -> Option<ObjectId> {
        self.attached
    }

    pub fn abandon(&mut self) {
        self.model.abandon();
        self.environment.abandon();
    }
}

fn failure<T>(handle: &AssetHandle<T>) -> Option<anyhow::Error> {
    match handle.state() {
        AssetLoadState::Failed(error) => Some(anyhow!(
            "Failed to load {}: {:#}",
            handle.name(),
            error
        )),
        _ => None,
    }
}
