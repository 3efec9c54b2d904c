use crate::{
    engine::config_engine::{DEFAULT_LIGHT_RANGE, DEFAULT_LIGHT_SIZE},
    renderer::shader_interfaces::light_buffer::LightRecord,
};
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec3,
    /// Linear RGB
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    /// Emitter radius used for soft shadows
    pub size: f32,
}

impl Light {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn to_light_record(&self) -> LightRecord {
        LightRecord {
            position: self.position.to_array(),
            intensity: self.intensity.max(0.),
            color: self.color.to_array(),
            range: self.range.max(0.),
            size: self.size.max(0.),
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 1.,
            range: DEFAULT_LIGHT_RANGE,
            size: DEFAULT_LIGHT_SIZE,
        }
    }
}
