use crate::{
    engine::config_engine::{DEFAULT_ALBEDO, DEFAULT_IOR, DEFAULT_ROUGHNESS},
    renderer::shader_interfaces::material_buffer::MaterialRecord,
};
use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Surface description attached to each scene node. Only used when the node is drawn at the top
/// level of the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub albedo: Vec4,
    pub emission: f32,
    pub roughness: f32,
    pub metallic: f32,
    /// Index of refraction
    pub ior: f32,
    pub absorption: Vec3,
}

impl Material {
    pub fn with_albedo(albedo: Vec4) -> Self {
        Self {
            albedo,
            ..Default::default()
        }
    }

    pub fn to_record(&self) -> MaterialRecord {
        MaterialRecord {
            albedo: self.albedo.to_array(),
            emission: self.emission,
            roughness: self.roughness,
            metallic: self.metallic,
            ior: self.ior,
            absorption: self.absorption.to_array(),
            pad: 0.,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: DEFAULT_ALBEDO,
            emission: 0.,
            roughness: DEFAULT_ROUGHNESS,
            metallic: 0.,
            ior: DEFAULT_IOR,
            absorption: Vec3::ZERO,
        }
    }
}
