use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::material_manager::{MaterialId, MaterialManager, StandardMaterial};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
    pub roughness: f32,
    pub metalness: f32,
    pub env_map_intensity: f32,
    _padding: f32,
}

impl MaterialUniform {
    pub fn from_material(material: &StandardMaterial) -> Self {
        Self {
            color: material.color.extend(1.0).to_array(),
            roughness: material.roughness.clamp(0.04, 1.0),
            metalness: material.metalness.clamp(0.0, 1.0),
            env_map_intensity: if material.env_map { 1.0 } else { 0.0 },
            _padding: 0.0,
        }
    }
}

struct RenderMaterial {
    _buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Group 1: one small uniform per material, created the first time a
/// material is drawn. Materials never change after creation.
pub struct RenderMaterialManager {
    materials: HashMap<MaterialId, RenderMaterial>,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl RenderMaterialManager {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        Self {
            materials: HashMap::new(),
            bind_group_layout,
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        materials: &MaterialManager,
        id: MaterialId,
    ) {
        if self.materials.contains_key(&id) {
            return;
        }

        let Some(material) = materials.get(id) else {
            log::warn!("Draw references unknown material {:?}", id);
            return;
        };

        let label = format!("Material uniform ({})", material.name);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&label),
            contents: bytemuck::cast_slice(&[MaterialUniform::from_material(material)]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&label),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        log::debug!("Uploaded material {}", material.name);

        self.materials.insert(
            id,
            RenderMaterial {
                _buffer: buffer,
                bind_group,
            },
        );
    }

    pub fn bind_group(&self, id: MaterialId) -> Option<&wgpu::BindGroup> {
        self.materials.get(&id).map(|material| &material.bind_group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::lettering_material;

    #[test]
    fn lettering_uniform_is_fully_metallic_with_reflections() {
        let uniform = MaterialUniform::from_material(&lettering_material());

        assert_eq!(uniform.roughness, 0.6);
        assert_eq!(uniform.metalness, 1.0);
        assert_eq!(uniform.env_map_intensity, 1.0);
        assert_eq!(uniform.color[3], 1.0);
        assert!(uniform.color[2] > uniform.color[0]);
    }

    #[test]
    fn zero_roughness_is_clamped() {
        let uniform = MaterialUniform::from_material(&StandardMaterial {
            roughness: 0.0,
            ..Default::default()
        });

        assert_eq!(uniform.roughness, 0.04);
        assert_eq!(uniform.env_map_intensity, 0.0);
    }
}
