use wgpu::{
    DepthBiasState, MultisampleState, PipelineCompilationOptions, RenderPassDescriptor,
    ShaderSource, StencilState,
};

use crate::rendering::{
    instance::{Instance, InstanceBuffer, Instances},
    render_common::RenderCommon,
    render_material_manager::RenderMaterialManager,
    render_model::{RenderModel, MODEL_PRIMITIVE_STATE, RENDER_MODEL_VBL},
    scene_uniform::SceneUniform,
    texture::DepthTexture,
};
use crate::scene_graph::SceneModelId;

const SCENE_SHADER: &str = include_str!("../shaders/scene.wgsl");

pub struct ScenePassTextureViews<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
}

pub struct ScenePassContext<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub scene_uniform: &'a SceneUniform,
    pub material_manager: &'a RenderMaterialManager,
    pub instance_buffer: &'a InstanceBuffer,
}

/// Clears to the page background, then draws the instanced meshes.
pub struct ScenePass {
    pipeline: wgpu::RenderPipeline,
}

impl ScenePass {
    pub fn create(
        device: &wgpu::Device,
        common: &RenderCommon,
        scene_uniform: &SceneUniform,
        material_manager: &RenderMaterialManager,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene shader"),
            source: ShaderSource::Wgsl(SCENE_SHADER.into()),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Scene render pipeline layout"),
                bind_group_layouts: &[
                    &scene_uniform.bind_group_layout,
                    material_manager.bind_group_layout(),
                ],
                push_constant_ranges: &[],
            });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene render pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[RENDER_MODEL_VBL, Instance::VBL],
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: common.format(),
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: MODEL_PRIMITIVE_STATE,
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthTexture::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        ScenePass { pipeline }
    }

    pub fn render<'m>(
        &self,
        texture_views: &ScenePassTextureViews,
        context: ScenePassContext,
        clear_color: wgpu::Color,
        instances: Option<&Instances>,
        render_model: impl Fn(SceneModelId) -> Option<&'m RenderModel>,
    ) {
        let mut render_pass = context.encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: texture_views.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: texture_views.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        let Some(instances) = instances.filter(|instances| instances.should_render()) else {
            return;
        };

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &context.scene_uniform.bind_group, &[]);
        context.instance_buffer.bind(&mut render_pass);

        for batch in instances.batches() {
            let (Some(model), Some(material)) = (
                render_model(batch.model_id),
                context.material_manager.bind_group(batch.material),
            ) else {
                continue;
            };

            render_pass.set_bind_group(1, material, &[]);
            model.draw(&mut render_pass, batch.range.clone());
        }
    }
}
