use std::{collections::HashMap, path::Path};

use anyhow::Context;
use bytemuck::{Pod, Zeroable};
use glam::{EulerRot, Quat, Vec2, Vec3};
use gltf::buffer;
use itertools::izip;

use crate::material_manager::{MaterialId, StandardMaterial};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
}

#[derive(Debug, Clone)]
pub struct ModelPrimitive {
    pub index: usize,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub primitives: Vec<ModelPrimitive>,
}

pub type Buffers<'a> = &'a [buffer::Data];

impl Model {
    /// Loads one glTF primitive as a single-primitive model.
    pub fn from_gltf_primitive(
        name: impl Into<String>,
        primitive: gltf::Primitive,
        buffers: Buffers,
    ) -> anyhow::Result<Model> {
        let name = name.into();

        if primitive.mode() != gltf::mesh::Mode::Triangles {
            return Err(anyhow::anyhow!(
                "Unsupported primitive mode: {:?}",
                primitive.mode()
            ));
        }

        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .with_context(|| format!("Primitive without positions in {}", name))?
            .collect();
        let normal_reader = reader
            .read_normals()
            .with_context(|| format!("Primitive without normals in {}", name))?;
        let tex_coords: Vec<[f32; 2]> = match reader.read_tex_coords(0) {
            Some(tex_coords) => tex_coords.into_f32().collect(),
            None => vec![[0.0, 0.0]; positions.len()],
        };

        let vertices = izip!(positions, normal_reader, tex_coords)
            .map(|(position, normal, tex_coords)| Vertex {
                position: Vec3::from(position),
                normal: Vec3::from(normal),
                tex_coords: Vec2::from(tex_coords),
            })
            .collect::<Vec<Vertex>>();

        let indices = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect::<Vec<u32>>(),
            None => (0..vertices.len() as u32).collect(),
        };

        Ok(Model {
            name,
            primitives: vec![ModelPrimitive {
                index: primitive.index(),
                vertices,
                indices,
            }],
        })
    }

    /// Axis-aligned box centered on the origin, one primitive with per-face normals.
    pub fn cube(name: impl Into<String>, size: f32) -> Model {
        let h = size * 0.5;
        let faces = [
            (Vec3::X, Vec3::Y),
            (Vec3::NEG_X, Vec3::Y),
            (Vec3::Y, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::Z),
            (Vec3::Z, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, up) in faces {
            let right = up.cross(normal);
            let base = vertices.len() as u32;
            let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

            for (u, v) in corners {
                vertices.push(Vertex {
                    position: (normal + right * u + up * v) * h,
                    normal,
                    tex_coords: Vec2::new((u + 1.0) * 0.5, (1.0 - v) * 0.5),
                });
            }

            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Model {
            name: name.into(),
            primitives: vec![ModelPrimitive {
                index: 0,
                vertices,
                indices,
            }],
        }
    }
}

/// Which material a mesh leaf draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialRef {
    /// Index into `ModelScene::materials`, as authored in the file.
    Embedded(Option<usize>),
    /// A material already registered with the material manager.
    Shared(MaterialId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshRef {
    /// Index into `ModelScene::meshes`.
    pub mesh: usize,
    pub material: MaterialRef,
}

#[derive(Debug, Clone)]
pub struct ModelNode {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: f32,
    pub mesh: Option<MeshRef>,
    pub children: Vec<ModelNode>,
}

impl ModelNode {
    fn with_material(self, material: MaterialId) -> ModelNode {
        ModelNode {
            mesh: self.mesh.map(|mesh| MeshRef {
                mesh: mesh.mesh,
                material: MaterialRef::Shared(material),
            }),
            children: self
                .children
                .into_iter()
                .map(|child| child.with_material(material))
                .collect(),
            ..self
        }
    }

    /// Identity-transform leaf for one primitive of a multi-material mesh.
    fn primitive(name: String, mesh: MeshRef) -> ModelNode {
        ModelNode {
            name,
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: 1.0,
            mesh: Some(mesh),
            children: Vec::new(),
        }
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a ModelNode)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }
}

/// A loaded model file: a node tree plus the meshes and materials it references.
#[derive(Debug, Clone)]
pub struct ModelScene {
    pub source: String,
    pub roots: Vec<ModelNode>,
    pub meshes: Vec<Model>,
    pub materials: Vec<StandardMaterial>,
}

impl ModelScene {
    pub fn load_gltf(path: &Path) -> anyhow::Result<ModelScene> {
        let (document, buffers, _images) = gltf::import(path)
            .with_context(|| format!("Failed to import glTF {}", path.display()))?;

        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .context("No scenes in gltf")?;

        let materials = document
            .materials()
            .map(|material| StandardMaterial::from_gltf(&material))
            .collect();

        let mut builder = GltfSceneBuilder {
            buffers: &buffers,
            meshes: Vec::new(),
            gltf_primitive_to_model: HashMap::new(),
        };

        let roots = scene
            .nodes()
            .map(|node| builder.build_node(&node))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let model_scene = ModelScene {
            source,
            roots,
            meshes: builder.meshes,
            materials,
        };

        log::info!(
            "Loaded {} with {} meshes and {} materials",
            model_scene.source,
            model_scene.meshes.len(),
            model_scene.materials.len()
        );

        Ok(model_scene)
    }

    /// Returns the same graph with every mesh leaf drawing `material`.
    pub fn with_material(self, material: MaterialId) -> ModelScene {
        ModelScene {
            roots: self
                .roots
                .into_iter()
                .map(|root| root.with_material(material))
                .collect(),
            ..self
        }
    }

    pub fn mesh_refs(&self) -> Vec<MeshRef> {
        let mut refs = Vec::new();
        for root in &self.roots {
            root.visit(&mut |node| refs.extend(node.mesh));
        }
        refs
    }
}

struct GltfSceneBuilder<'a> {
    buffers: Buffers<'a>,
    meshes: Vec<Model>,
    /// (mesh index, primitive index) to index in `meshes`.
    gltf_primitive_to_model: HashMap<(usize, usize), usize>,
}

impl GltfSceneBuilder<'_> {
    fn build_node(&mut self, node: &gltf::Node) -> anyhow::Result<ModelNode> {
        let node_name = node.name().unwrap_or("Unnamed").to_string();
        let (translation, rotation, scale) = node.transform().decomposed();
        let (x, y, z) = Quat::from_array(rotation).to_euler(EulerRot::XYZ);

        let mut mesh = None;
        let mut children = Vec::new();

        if let Some(gltf_mesh) = node.mesh() {
            let mut refs = self.mesh_refs(&node_name, gltf_mesh)?;
            if refs.len() == 1 {
                mesh = refs.pop();
            } else {
                // One leaf per primitive.
                children.extend(refs.into_iter().enumerate().map(|(index, mesh_ref)| {
                    ModelNode::primitive(format!("{} #{}", node_name, index), mesh_ref)
                }));
            }
        }

        for child in node.children() {
            children.push(self.build_node(&child)?);
        }

        Ok(ModelNode {
            name: node_name,
            translation: translation.into(),
            rotation: Vec3::new(x, y, z),
            scale: scale[0], // Assume uniform scale for simplicity
            mesh,
            children,
        })
    }

    /// One `MeshRef` per primitive, each with the primitive's own material.
    fn mesh_refs(&mut self, node_name: &str, mesh: gltf::Mesh) -> anyhow::Result<Vec<MeshRef>> {
        let mesh_name = mesh
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("{} (Mesh)", node_name));
        let split = mesh.primitives().len() > 1;

        let mut refs = Vec::new();
        for primitive in mesh.primitives() {
            let key = (mesh.index(), primitive.index());
            let material = MaterialRef::Embedded(primitive.material().index());

            let model_index = match self.gltf_primitive_to_model.get(&key).copied() {
                Some(model_index) => model_index,
                None => {
                    let name = if split {
                        format!("{} #{}", mesh_name, primitive.index())
                    } else {
                        mesh_name.clone()
                    };

                    let model = Model::from_gltf_primitive(name, primitive, self.buffers)?;
                    self.meshes.push(model);
                    let model_index = self.meshes.len() - 1;
                    self.gltf_primitive_to_model.insert(key, model_index);
                    model_index
                }
            };

            refs.push(MeshRef {
                mesh: model_index,
                material,
            });
        }

        if refs.is_empty() {
            return Err(anyhow::anyhow!("Mesh without primitives: {}", mesh_name));
        }

        Ok(refs)
    }
}
