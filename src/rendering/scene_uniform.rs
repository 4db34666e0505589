use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

use crate::{
    render_loop::SceneFrame,
    rendering::texture::CubeTexture,
    scene_graph::Light,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneUniformState {
    pub view_proj: Mat4,
    pub camera_position: Vec4,
    /// rgb premultiplied by intensity, w unused.
    pub ambient: Vec4,
    /// xyz position, w is 1 when a point light is present.
    pub point_light_position: Vec4,
    pub point_light_color: Vec4,
}

impl SceneUniformState {
    pub fn from_frame(frame: &SceneFrame, aspect_ratio: f32) -> Self {
        let mut ambient = Vec3::ZERO;
        let mut point_light_position = Vec4::ZERO;
        let mut point_light_color = Vec4::ZERO;

        for light in &frame.lights {
            match light.light {
                Light::Ambient { color, intensity } => ambient += color * intensity,
                // Only the first point light is shaded.
                Light::Point { color, intensity } if point_light_position.w == 0.0 => {
                    point_light_position = light.position.extend(1.0);
                    point_light_color = (color * intensity).extend(1.0);
                }
                Light::Point { .. } => {}
            }
        }

        Self {
            view_proj: frame.camera.view_proj(aspect_ratio),
            camera_position: frame.camera.position().extend(1.0),
            ambient: ambient.extend(0.0),
            point_light_position,
            point_light_color,
        }
    }
}

impl Default for SceneUniformState {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY,
            ..Zeroable::zeroed()
        }
    }
}

/// Group 0: per-frame camera and lights plus the environment cube map.
pub struct SceneUniform {
    buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    environment: CubeTexture,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl SceneUniform {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene uniform buffer"),
            contents: bytemuck::cast_slice(&[SceneUniformState::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene uniform bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let environment = CubeTexture::placeholder(device, queue);
        let bind_group =
            Self::create_bind_group(device, &bind_group_layout, &buffer, &environment, &sampler);

        Self {
            buffer,
            sampler,
            environment,
            bind_group,
            bind_group_layout,
        }
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
        environment: &CubeTexture,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene uniform bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(environment.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    pub fn set_environment(&mut self, device: &wgpu::Device, environment: CubeTexture) {
        log::info!("Using {}px environment map", environment.face_size);

        self.environment = environment;
        self.bind_group = Self::create_bind_group(
            device,
            &self.bind_group_layout,
            &self.buffer,
            &self.environment,
            &self.sampler,
        );
    }

    pub fn update(&self, queue: &wgpu::Queue, state: SceneUniformState) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[state]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{camera::CameraFrame, render_loop::LightFrame};

    #[test]
    fn lights_are_folded_into_uniform() {
        let frame = SceneFrame {
            camera: CameraFrame {
                camera: Default::default(),
                world: Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)),
            },
            lights: vec![
                LightFrame {
                    light: Light::Ambient {
                        color: Vec3::ONE,
                        intensity: 0.5,
                    },
                    position: Vec3::ZERO,
                },
                LightFrame {
                    light: Light::Point {
                        color: Vec3::new(1.0, 0.5, 0.0),
                        intensity: 2.0,
                    },
                    position: Vec3::new(0.0, 0.0, 10.0),
                },
            ],
            draws: Vec::new(),
        };

        let state = SceneUniformState::from_frame(&frame, 1.5);

        assert_eq!(state.camera_position, Vec4::new(0.0, 0.0, 5.0, 1.0));
        assert_eq!(state.ambient, Vec4::new(0.5, 0.5, 0.5, 0.0));
        assert_eq!(state.point_light_position, Vec4::new(0.0, 0.0, 10.0, 1.0));
        assert_eq!(state.point_light_color, Vec4::new(2.0, 1.0, 0.0, 1.0));

        // The origin sits in front of a camera looking down -z from z = 5.
        let clip = state.view_proj * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc_depth = clip.z / clip.w;
        assert!(clip.w > 0.0);
        assert!((0.0..1.0).contains(&ndc_depth));
    }
}
