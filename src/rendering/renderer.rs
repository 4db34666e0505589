use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use wgpu::CommandEncoderDescriptor;
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    config::SceneConfig,
    material_manager::srgb_hex,
    render_loop::{FrameOutput, RenderLoop},
    rendering::{
        instance::{InstanceBuffer, Instances},
        passes::scene_pass::{ScenePass, ScenePassContext, ScenePassTextureViews},
        render_common::RenderCommon,
        render_material_manager::RenderMaterialManager,
        render_model::RenderModel,
        scene_uniform::{SceneUniform, SceneUniformState},
        texture::{CubeTexture, DepthTexture},
    },
    scene_graph::SceneModelId,
};

pub struct Renderer {
    pub window: Arc<Window>,
    pub size: PhysicalSize<u32>,

    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,

    common: RenderCommon,
    depth_texture: DepthTexture,
    scene_uniform: SceneUniform,
    material_manager: RenderMaterialManager,
    render_models: HashMap<SceneModelId, RenderModel>,
    instances: Instances,
    instance_buffer: InstanceBuffer,
    environment_uploaded: bool,

    scene_pass: ScenePass,
    background: wgpu::Color,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, config: &SceneConfig) -> anyhow::Result<Renderer> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No compatible graphics adapter")?;

        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create device")?;

        let common = RenderCommon::new(&device, &adapter, &surface, size)?;
        let depth_texture =
            DepthTexture::new(&device, &common.output_surface_config, "Depth texture");

        let scene_uniform = SceneUniform::new(&device, &queue);
        let material_manager = RenderMaterialManager::new(&device);
        let scene_pass = ScenePass::create(&device, &common, &scene_uniform, &material_manager);

        let instance_buffer = InstanceBuffer::new(&device);

        let background = srgb_hex(config.background);

        Ok(Self {
            window,
            size,
            surface,
            device,
            queue,
            common,
            depth_texture,
            scene_uniform,
            material_manager,
            render_models: HashMap::new(),
            instances: Instances::new(),
            instance_buffer,
            environment_uploaded: false,
            scene_pass,
            background: wgpu::Color {
                r: background.x as f64,
                g: background.y as f64,
                b: background.z as f64,
                a: 1.0,
            },
        })
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.common.aspect_ratio()
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            let config = &mut self.common.output_surface_config;

            self.size = new_size;
            config.width = new_size.width;
            config.height = new_size.height;
            self.surface.configure(&self.device, config);
            self.depth_texture.resize(&self.device, config);
        }
    }

    /// Uploads whatever `output` needs that is not on the GPU yet.
    fn prepare(&mut self, render_loop: &RenderLoop, output: &FrameOutput) {
        let FrameOutput::Scene(frame) = output else {
            return;
        };

        if !self.environment_uploaded {
            if let Some(cube_map) = render_loop.environment_map() {
                let texture =
                    CubeTexture::from_data(&self.device, &self.queue, cube_map, "Environment map");
                self.scene_uniform.set_environment(&self.device, texture);
                self.environment_uploaded = true;
            }
        }

        let scene = render_loop.scene();
        for draw in &frame.draws {
            if !self.render_models.contains_key(&draw.model_id) {
                if let Some(scene_model) = scene.models.get(draw.model_id) {
                    log::info!(
                        "Uploading model {} with {} primitives",
                        scene_model.model.name,
                        scene_model.model.primitives.len()
                    );
                    self.render_models.insert(
                        draw.model_id,
                        RenderModel::from_model(&self.device, &scene_model.model),
                    );
                }
            }

            self.material_manager
                .prepare(&self.device, render_loop.materials(), draw.material);
        }

        self.instances.gather(&frame.draws);
        self.instances
            .write_to_buffer(&self.device, &self.queue, &mut self.instance_buffer);

        self.scene_uniform.update(
            &self.queue,
            SceneUniformState::from_frame(frame, self.aspect_ratio()),
        );
    }

    pub fn render(
        &mut self,
        render_loop: &RenderLoop,
        output: &FrameOutput,
    ) -> Result<(), wgpu::SurfaceError> {
        self.prepare(render_loop, output);

        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let instances = match output {
            FrameOutput::Scene(_) => Some(&self.instances),
            FrameOutput::Fallback => None,
        };

        let render_models = &self.render_models;
        self.scene_pass.render(
            &ScenePassTextureViews {
                color: &view,
                depth: self.depth_texture.view(),
            },
            ScenePassContext {
                encoder: &mut encoder,
                scene_uniform: &self.scene_uniform,
                material_manager: &self.material_manager,
                instance_buffer: &self.instance_buffer,
            },
            self.background,
            instances,
            |model_id| render_models.get(&model_id),
        );

        self.queue.submit([encoder.finish()]);
        self.window.pre_present_notify();
        surface_texture.present();

        Ok(())
    }
}
