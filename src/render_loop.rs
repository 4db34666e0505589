use std::time::Instant;

use anyhow::Context;
use glam::{Mat4, Vec3};

use crate::{
    assets::CubeMapData,
    camera::CameraFrame,
    config::SceneConfig,
    demo::{build_view, DemoAssets, GateState, ViewNodes},
    material_manager::{MaterialId, MaterialManager},
    scene_graph::{Light, NodeKind, ObjectId, Scene, SceneModelId},
    scroll::{map_scroll_value, ScrollEventSource, ScrollPhase, ScrollPositionTracker, SegmentValues},
};

/// What every node updater sees for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    pub frame_number: u64,
    /// Seconds since the previous tick. Informational; animators ignore it.
    pub delta: f32,
    pub elapsed: f32,
    pub scroll: f32,
    pub segments: SegmentValues,
}

impl FrameContext {
    #[cfg(test)]
    pub fn at_scroll(frame_number: u64, scroll: f32) -> Self {
        Self {
            frame_number,
            delta: 0.0,
            elapsed: 0.0,
            scroll,
            segments: map_scroll_value(scroll),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub object_id: ObjectId,
    pub model_id: SceneModelId,
    pub material: MaterialId,
    pub world: Mat4,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightFrame {
    pub light: Light,
    pub position: Vec3,
}

#[derive(Debug, Clone)]
pub struct SceneFrame {
    pub camera: CameraFrame,
    pub lights: Vec<LightFrame>,
    pub draws: Vec<DrawItem>,
}

#[derive(Debug, Clone)]
pub enum FrameOutput {
    /// Assets are not ready (or failed earlier): draw only the page background.
    Fallback,
    Scene(SceneFrame),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopStatus {
    Running,
    Faulted,
    Unmounted,
}

pub struct RenderLoop {
    scene: Scene,
    materials: MaterialManager,
    tracker: ScrollPositionTracker,
    view: ViewNodes,
    assets: DemoAssets,
    frame_number: u64,
    last_segments: SegmentValues,
    phase: ScrollPhase,
    started: Instant,
    last_tick: Instant,
    status: LoopStatus,
}

impl RenderLoop {
    /// Builds the scene, subscribes to scroll events and starts loading assets.
    pub fn mount(config: &SceneConfig, scroll_events: &ScrollEventSource) -> anyhow::Result<Self> {
        Self::with_assets(config, scroll_events, DemoAssets::load(config))
    }

    pub fn with_assets(
        config: &SceneConfig,
        scroll_events: &ScrollEventSource,
        assets: DemoAssets,
    ) -> anyhow::Result<Self> {
        let mut scene = Scene::new();
        let mut materials = MaterialManager::new();
        let view = build_view(&mut scene, &mut materials, config)
            .context("Failed to build scroll scene")?;
        scene.late_update();

        let now = Instant::now();

        Ok(Self {
            scene,
            materials,
            tracker: ScrollPositionTracker::attach(scroll_events),
            view,
            assets,
            frame_number: 0,
            last_segments: SegmentValues::default(),
            phase: ScrollPhase::DollyIn,
            started: now,
            last_tick: now,
            status: LoopStatus::Running,
        })
    }

    /// Advances one frame.
    ///
    /// Updaters run before the asset gate, so the camera and the lettering
    /// group keep moving while the scene waits on its assets. The first tick
    /// that sees a failed asset returns the error; every later tick renders
    /// the fallback.
    pub fn tick(&mut self) -> anyhow::Result<FrameOutput> {
        if self.status != LoopStatus::Running {
            return Ok(FrameOutput::Fallback);
        }

        let frame = self.next_frame_context();
        let phase = ScrollPhase::of(frame.scroll);
        if phase != self.phase {
            log::debug!("Entering {:?} phase at {}", phase, frame.scroll);
            self.phase = phase;
        }
        self.last_segments = frame.segments;

        self.scene.run_updaters(&frame);

        match self.assets.poll() {
            GateState::Failed(error) => {
                self.status = LoopStatus::Faulted;
                self.scene.late_update();
                return Err(error.context("Scroll scene cannot be shown"));
            }
            GateState::Pending => {
                self.scene.late_update();
                return Ok(FrameOutput::Fallback);
            }
            GateState::Ready => {
                self.assets.attach_once(
                    &mut self.scene,
                    &mut self.materials,
                    self.view.lettering_mount,
                );
            }
        }

        self.scene.late_update();

        Ok(FrameOutput::Scene(self.compose_frame()))
    }

    /// Stops scroll tracking and frame updates, and abandons pending loads.
    pub fn unmount(&mut self) {
        if self.status == LoopStatus::Unmounted {
            return;
        }

        self.tracker.detach();
        self.assets.abandon();
        self.status = LoopStatus::Unmounted;
        log::info!("Scroll scene unmounted after {} frames", self.frame_number);
    }

    fn next_frame_context(&mut self) -> FrameContext {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        self.frame_number += 1;

        let scroll = self.tracker.position();

        FrameContext {
            frame_number: self.frame_number,
            delta,
            elapsed: now.duration_since(self.started).as_secs_f32(),
            scroll,
            segments: map_scroll_value(scroll),
        }
    }

    fn compose_frame(&self) -> SceneFrame {
        let camera = match self.scene.get_object(self.view.camera).map(|object| &object.kind) {
            Some(NodeKind::Camera(camera)) => *camera,
            _ => Default::default(),
        };

        let mut lights = Vec::new();
        let mut draws = Vec::new();

        for (object_id, object) in self.scene.objects.iter() {
            if !self.scene.is_visible(object_id) {
                continue;
            }

            let world = *object.transform.get_world_matrix();

            match &object.kind {
                NodeKind::Light(light) => lights.push(LightFrame {
                    light: *light,
                    position: world.w_axis.truncate(),
                }),
                NodeKind::Mesh(mesh) => draws.push(DrawItem {
                    object_id,
                    model_id: mesh.model_id,
                    material: mesh.material,
                    world,
                }),
                _ => {}
            }
        }

        SceneFrame {
            camera: CameraFrame {
                camera,
                world: self.scene.world_matrix(self.view.camera).unwrap_or(Mat4::IDENTITY),
            },
            lights,
            draws,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn materials(&self) -> &MaterialManager {
        &self.materials
    }

    pub fn view(&self) -> &ViewNodes {
        &self.view
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn segments(&self) -> SegmentValues {
        self.last_segments
    }

    pub fn scroll_position(&self) -> f32 {
        self.tracker.position()
    }

    pub fn environment_map(&self) -> Option<&CubeMapData> {
        self.assets.environment_map()
    }

    #[cfg(test)]
    pub fn lettering_root(&self) -> Option<ObjectId> {
        self.assets.attached_root()
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{channel, Sender};

    use anyhow::anyhow;

    use super::*;
    use crate::{assets::AssetHandle, model::tests::lettering, model::ModelScene};

    fn cube_map() -> CubeMapData {
        CubeMapData {
            face_size: 1,
            faces: [0; 6].map(|_| vec![255, 255, 255, 255]),
        }
    }

    fn ready_assets() -> DemoAssets {
        DemoAssets::new(
            AssetHandle::resolved("name.gltf", Ok(lettering())),
            AssetHandle::resolved("environment map", Ok(cube_map())),
        )
    }

    struct PendingAssets {
        model: Sender<anyhow::Result<ModelScene>>,
        environment: Sender<anyhow::Result<CubeMapData>>,
    }

    fn pending_assets() -> (DemoAssets, PendingAssets) {
        let (model, model_receiver) = channel();
        let (environment, environment_receiver) = channel();

        let assets = DemoAssets::new(
            AssetHandle::pending("name.gltf", model_receiver),
            AssetHandle::pending("environment map", environment_receiver),
        );

        (assets, PendingAssets { model, environment })
    }

    fn mounted(assets: DemoAssets) -> (RenderLoop, ScrollEventSource) {
        let source = ScrollEventSource::new();
        let render_loop = RenderLoop::with_assets(&SceneConfig::default(), &source, assets).unwrap();
        (render_loop, source)
    }

    fn camera_rig(render_loop: &RenderLoop) -> (f32, f32) {
        let transform = render_loop
            .scene()
            .get_object_transform(render_loop.view().camera_rig)
            .unwrap();
        (transform.translation().z, transform.rotation().y)
    }

    fn scene_frame(output: FrameOutput) -> SceneFrame {
        match output {
            FrameOutput::Scene(frame) => frame,
            FrameOutput::Fallback => panic!("expected a scene frame"),
        }
    }

    #[test]
    fn camera_follows_scroll_scenarios() {
        let (mut render_loop, source) = mounted(ready_assets());

        let scenarios = [
            (0.0, SegmentValues::new(0.0, 0.0, 0.0), 5.0, 0.0),
            (450.0, SegmentValues::new(450.0, 0.0, 0.0), 9.5, 0.0),
            (500.0, SegmentValues::new(450.0, 50.0, 0.0), 9.5, 0.0),
            (600.0, SegmentValues::new(450.0, 600.0, 0.0), 9.5, 0.0),
            (2600.0, SegmentValues::new(450.0, 600.0, 2000.0), 9.5, 0.2),
        ];

        for (scroll, segments, z, rotation_y) in scenarios {
            source.dispatch(scroll);
            let frame = scene_frame(render_loop.tick().unwrap());

            assert_eq!(render_loop.segments(), segments, "scroll {}", scroll);
            let (actual_z, actual_rotation) = camera_rig(&render_loop);
            assert!((actual_z - z).abs() < 1e-5, "scroll {}: z {}", scroll, actual_z);
            assert!((actual_rotation - rotation_y).abs() < 1e-5);
            assert!((frame.camera.position().z - z).abs() < 1e-5);
        }
    }

    #[test]
    fn several_scroll_events_between_ticks_keep_the_last() {
        let (mut render_loop, source) = mounted(ready_assets());

        source.dispatch(100.0);
        source.dispatch(700.0);
        source.dispatch(300.0);
        render_loop.tick().unwrap();

        assert_eq!(render_loop.scroll_position(), 300.0);
        assert!((camera_rig(&render_loop).0 - 8.0).abs() < 1e-5);
    }

    #[test]
    fn lettering_spins_a_fixed_step_per_tick() {
        let (mut render_loop, _source) = mounted(ready_assets());

        for _ in 0..25 {
            render_loop.tick().unwrap();
        }

        let rotation = render_loop
            .scene()
            .get_object_transform(render_loop.view().lettering)
            .unwrap()
            .rotation();
        assert!((rotation.y - 0.5).abs() < 1e-4, "rotation {}", rotation.y);
        assert_eq!(render_loop.frame_number(), 25);
    }

    #[test]
    fn marker_box_stays_put_and_hidden() {
        let (mut render_loop, _source) = mounted(ready_assets());
        let marker = render_loop.view().marker;

        for _ in 0..10 {
            render_loop.tick().unwrap();
        }
        let frame = scene_frame(render_loop.tick().unwrap());

        assert_eq!(
            render_loop.scene().get_object_transform(marker).unwrap().rotation(),
            Vec3::ZERO
        );
        assert!(frame.draws.iter().all(|draw| draw.object_id != marker));
    }

    #[test]
    fn pending_assets_render_fallback_while_updaters_run() {
        let (assets, _senders) = pending_assets();
        let (mut render_loop, source) = mounted(assets);

        source.dispatch(300.0);
        for _ in 0..3 {
            assert!(matches!(render_loop.tick().unwrap(), FrameOutput::Fallback));
        }

        let scene = render_loop.scene();
        assert_eq!(scene.count_nodes(|kind| matches!(kind, NodeKind::Model { .. })), 0);
        assert!((camera_rig(&render_loop).0 - 8.0).abs() < 1e-5);
        assert!(render_loop.environment_map().is_none());
    }

    #[test]
    fn ready_assets_attach_one_model_with_override_material() {
        let (assets, senders) = pending_assets();
        let (mut render_loop, _source) = mounted(assets);

        assert!(matches!(render_loop.tick().unwrap(), FrameOutput::Fallback));

        senders.model.send(Ok(lettering())).unwrap();
        assert!(matches!(render_loop.tick().unwrap(), FrameOutput::Fallback));

        senders.environment.send(Ok(cube_map())).unwrap();
        let frame = scene_frame(render_loop.tick().unwrap());
        scene_frame(render_loop.tick().unwrap());

        let scene = render_loop.scene();
        assert_eq!(scene.count_nodes(|kind| matches!(kind, NodeKind::Model { .. })), 1);

        let root = render_loop.lettering_root().unwrap();
        let mut under_root = Vec::new();
        scene.visit_subtree(root, &mut |id, _| under_root.push(id));

        assert_eq!(frame.draws.len(), 3);
        for draw in &frame.draws {
            assert!(under_root.contains(&draw.object_id));
            let material = render_loop.materials().get(draw.material).unwrap();
            assert_eq!(material.name, "Aluminium medium");
            assert_eq!(material.metalness, 1.0);
            assert_eq!(material.roughness, 0.6);
        }

        assert_eq!(frame.lights.len(), 2);
        assert!(frame
            .lights
            .iter()
            .any(|light| matches!(light.light, Light::Point { .. }) && light.position == Vec3::new(0.0, 0.0, 10.0)));
        assert!(render_loop.environment_map().is_some());
    }

    #[test]
    fn failed_asset_errors_once_then_falls_back() {
        let assets = DemoAssets::new(
            AssetHandle::resolved("name.gltf", Err(anyhow!("file not found"))),
            AssetHandle::resolved("environment map", Ok(cube_map())),
        );
        let (mut render_loop, source) = mounted(assets);

        let error = render_loop.tick().unwrap_err();
        assert!(format!("{:#}", error).contains("name.gltf"));

        source.dispatch(2600.0);
        for _ in 0..3 {
            assert!(matches!(render_loop.tick().unwrap(), FrameOutput::Fallback));
        }
        assert_eq!(render_loop.frame_number(), 1);
    }

    #[test]
    fn failure_wins_over_pending_asset() {
        let (assets, senders) = pending_assets();
        let (mut render_loop, _source) = mounted(assets);

        senders
            .environment
            .send(Err(anyhow!("bad jpeg")))
            .unwrap();

        let error = render_loop.tick().unwrap_err();
        assert!(format!("{:#}", error).contains("bad jpeg"));
    }

    #[test]
    fn unmount_stops_camera_and_tracking() {
        let (mut render_loop, source) = mounted(ready_assets());

        source.dispatch(300.0);
        render_loop.tick().unwrap();
        render_loop.unmount();

        assert_eq!(source.listener_count(), 0);

        source.dispatch(2600.0);
        assert!(matches!(render_loop.tick().unwrap(), FrameOutput::Fallback));

        assert_eq!(render_loop.scroll_position(), 300.0);
        let (z, rotation_y) = camera_rig(&render_loop);
        assert!((z - 8.0).abs() < 1e-5);
        assert_eq!(rotation_y, 0.0);

        render_loop.unmount();
    }

    #[test]
    fn load_finishing_after_unmount_is_discarded() {
        let (assets, senders) = pending_assets();
        let (mut render_loop, _source) = mounted(assets);

        render_loop.tick().unwrap();
        render_loop.unmount();

        assert!(senders.model.send(Ok(lettering())).is_err());
        assert!(senders.environment.send(Ok(cube_map())).is_err());
        assert!(matches!(render_loop.tick().unwrap(), FrameOutput::Fallback));
        assert!(render_loop.lettering_root().is_none());
    }

    #[test]
    fn dropping_the_loop_unsubscribes() {
        let source = ScrollEventSource::new();
        let render_loop = RenderLoop::with_assets(&SceneConfig::default(), &source, ready_assets()).unwrap();
        assert_eq!(source.listener_count(), 1);

        drop(render_loop);
        assert_eq!(source.listener_count(), 0);
    }
}
