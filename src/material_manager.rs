use std::collections::HashMap;

use glam::Vec3;
use id_arena::{Arena, Id};

#[derive(Debug, Clone, PartialEq)]
pub struct StandardMaterial {
    pub name: String,
    /// Linear RGB.
    pub color: Vec3,
    pub roughness: f32,
    pub metalness: f32,
    /// Reflects the scene environment map.
    pub env_map: bool,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            name: "Default material".to_string(),
            color: Vec3::ONE,
            roughness: 1.0,
            metalness: 0.0,
            env_map: false,
        }
    }
}

impl StandardMaterial {
    pub fn from_gltf(material: &gltf::Material) -> Self {
        let pbr = material.pbr_metallic_roughness();
        let [r, g, b, _] = pbr.base_color_factor();

        Self {
            name: material.name().unwrap_or("Unnamed material").to_string(),
            color: Vec3::new(r, g, b),
            roughness: pbr.roughness_factor(),
            metalness: pbr.metallic_factor(),
            env_map: false,
        }
    }
}

/// Converts a `0xRRGGBB` sRGB color to linear RGB.
pub fn srgb_hex(hex: u32) -> Vec3 {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };

    Vec3::new(channel(16), channel(8), channel(0))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GltfMaterialKey {
    pub file_name: String,
    pub material_index: usize,
}

pub type MaterialId = Id<StandardMaterial>;

pub struct MaterialManager {
    materials: Arena<StandardMaterial>,
    materials_by_gltf: HashMap<GltfMaterialKey, MaterialId>,
    default_material: MaterialId,
}

impl MaterialManager {
    pub fn new() -> Self {
        let mut materials = Arena::new();
        let default_material = materials.alloc(StandardMaterial::default());

        Self {
            materials,
            materials_by_gltf: HashMap::new(),
            default_material,
        }
    }

    pub fn add_material(&mut self, material: StandardMaterial) -> MaterialId {
        self.materials.alloc(material)
    }

    pub fn get(&self, id: MaterialId) -> Option<&StandardMaterial> {
        self.materials.get(id)
    }

    pub fn default_material(&self) -> MaterialId {
        self.default_material
    }

    /// Registers a material loaded from a glTF file, once per file and index.
    pub fn get_or_add_gltf(
        &mut self,
        file_name: &str,
        material_index: usize,
        material: &StandardMaterial,
    ) -> MaterialId {
        let key = GltfMaterialKey {
            file_name: file_name.to_string(),
            material_index,
        };

        if let Some(id) = self.materials_by_gltf.get(&key) {
            return *id;
        }

        let id = self.add_material(material.clone());
        self.materials_by_gltf.insert(key, id);
        id
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.materials.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_hex_converts_to_linear() {
        assert!(srgb_hex(0xffffff).abs_diff_eq(Vec3::ONE, 1e-6));
        assert_eq!(srgb_hex(0x000000), Vec3::ZERO);

        let navy = srgb_hex(0x001536);
        assert_eq!(navy.x, 0.0);
        assert!((navy.y - 0.0075).abs() < 1e-3);
        assert!((navy.z - 0.0368).abs() < 1e-3);
    }

    #[test]
    fn gltf_materials_are_registered_once_per_file_and_index() {
        let mut manager = MaterialManager::new();
        let material = StandardMaterial {
            name: "Chrome".to_string(),
            ..Default::default()
        };

        let first = manager.get_or_add_gltf("name.gltf", 0, &material);
        let again = manager.get_or_add_gltf("name.gltf", 0, &material);
        let other_file = manager.get_or_add_gltf("other.gltf", 0, &material);

        assert_eq!(first, again);
        assert_ne!(first, other_file);
        assert_eq!(manager.len(), 3);
    }

    #[test]
    fn default_material_exists_from_start() {
        let manager = MaterialManager::new();
        let default = manager.get(manager.default_material()).unwrap();

        assert_eq!(default.roughness, 1.0);
        assert_eq!(default.metalness, 0.0);
    }
}
