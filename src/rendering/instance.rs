use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use itertools::Itertools;
use wgpu::BufferUsages;

use crate::{
    material_manager::MaterialId, render_loop::DrawItem, scene_graph::SceneModelId,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Instance {
    pub model: Mat4,
}

impl Instance {
    // Model matrix columns, after the per-vertex locations.
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4
    ];

    pub const VBL: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Instance>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &Self::ATTRIBUTES,
    };
}

/// A run of consecutive instances sharing one model and material.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceBatch {
    pub model_id: SceneModelId,
    pub material: MaterialId,
    pub range: Range<u32>,
}

pub struct Instances {
    instances: Vec<Instance>,
    batches: Vec<InstanceBatch>,
}

impl Instances {
    pub fn new() -> Self {
        Self {
            instances: Vec::new(),
            batches: Vec::new(),
        }
    }

    /// Replaces the contents with `draws`, grouped by model and material.
    pub fn gather(&mut self, draws: &[DrawItem]) {
        self.instances.clear();
        self.batches.clear();

        let grouped = draws
            .iter()
            .sorted_by_key(|draw| (draw.model_id.index(), draw.material.index()))
            .chunk_by(|draw| (draw.model_id, draw.material));

        for ((model_id, material), group) in &grouped {
            let start = self.instances.len() as u32;
            self.instances
                .extend(group.map(|draw| Instance { model: draw.world }));

            self.batches.push(InstanceBatch {
                model_id,
                material,
                range: start..self.instances.len() as u32,
            });
        }
    }

    pub fn batches(&self) -> &[InstanceBatch] {
        &self.batches
    }

    pub fn should_render(&self) -> bool {
        !self.instances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn write_to_buffer(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        instance_buffer: &mut InstanceBuffer,
    ) {
        instance_buffer.reserve(device, self.len());
        queue.write_buffer(
            instance_buffer.buffer(),
            0,
            bytemuck::cast_slice(&self.instances),
        );
    }
}

pub struct InstanceBuffer {
    buffer: wgpu::Buffer,
    capacity: usize,
}

impl InstanceBuffer {
    const INITIAL_CAPACITY: usize = 128;

    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            buffer: Self::create(device, Self::INITIAL_CAPACITY),
            capacity: Self::INITIAL_CAPACITY,
        }
    }

    fn create(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance buffer"),
            size: (std::mem::size_of::<Instance>() * capacity) as u64,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn reserve(&mut self, device: &wgpu::Device, count: usize) {
        if count <= self.capacity {
            return;
        }

        let capacity = count.next_power_of_two();
        log::debug!("Growing instance buffer to {} instances", capacity);
        self.buffer = Self::create(device, capacity);
        self.capacity = capacity;
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(1, self.buffer.slice(..));
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use id_arena::Arena;

    use super::*;
    use crate::{
        material_manager::StandardMaterial,
        model::Model,
        scene_graph::{Object3D, SceneModel},
    };

    #[test]
    fn draws_are_batched_by_model_and_material() {
        let mut objects = Arena::<Object3D>::new();
        let mut models = Arena::<SceneModel>::new();
        let mut materials = Arena::<StandardMaterial>::new();

        let cube = models.alloc(SceneModel::new(Model::cube("Cube", 1.0)));
        let glyph = models.alloc(SceneModel::new(Model::cube("Glyph", 1.0)));
        let navy = materials.alloc(StandardMaterial::default());

        let mut draw = |model_id, x: f32| DrawItem {
            object_id: objects.alloc(Object3D::default()),
            model_id,
            material: navy,
            world: Mat4::from_translation(Vec3::new(x, 0.0, 0.0)),
        };
        let draws = vec![draw(glyph, 1.0), draw(cube, 2.0), draw(glyph, 3.0)];

        let mut instances = Instances::new();
        instances.gather(&draws);

        assert_eq!(instances.len(), 3);
        assert_eq!(
            instances.batches(),
            &[
                InstanceBatch {
                    model_id: cube,
                    material: navy,
                    range: 0..1,
                },
                InstanceBatch {
                    model_id: glyph,
                    material: navy,
                    range: 1..3,
                },
            ]
        );
    }
}
