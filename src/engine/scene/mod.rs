pub mod light;
pub mod material;
pub mod operation;
pub mod scene_node;

use self::{light::Light, scene_node::SceneNode};
use crate::engine::flatten::FlattenWarning;
use serde::{Deserialize, Serialize};

/// The raytraced scene: a forest of top-level nodes drawn independently plus the light sources.
/// Enumeration order of `nodes` is the order their records are emitted in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub lights: Vec<Light>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_node(&mut self, node: SceneNode) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn push_light(&mut self, light: Light) -> &mut Self {
        self.lights.push(light);
        self
    }

    /// Authoring defects of every boolean operation in the scene
    pub fn validate(&self) -> Vec<FlattenWarning> {
        let mut warnings = Vec::new();
        for node in &self.nodes {
            node.validate(&mut warnings);
        }
        warnings
    }
}
