use super::config_engine::{
    DEFAULT_AMBIENT_COLOR, DEFAULT_MAX_BOUNCES, DEFAULT_REFLECTION_RAY_COUNT,
};
use crate::{config::ENV, renderer::shader_interfaces::binding_names::KERNEL_ENTRY_POINT};
use glam::Vec4;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::{env, str::FromStr};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaytraceSettings {
    /// Color returned by rays that miss every primitive
    pub ambient_color: Vec4,
    pub max_bounces: i32,
    pub reflection_ray_count: i32,
    /// When false, ticks do nothing
    pub render_enable: bool,
    /// Re-flatten the scene every tick instead of only after it changed
    pub always_update_scene: bool,
    pub kernel_entry_point: String,
}

impl Default for RaytraceSettings {
    fn default() -> Self {
        Self {
            ambient_color: DEFAULT_AMBIENT_COLOR,
            max_bounces: DEFAULT_MAX_BOUNCES,
            reflection_ray_count: DEFAULT_REFLECTION_RAY_COUNT,
            render_enable: false,
            always_update_scene: true,
            kernel_entry_point: KERNEL_ENTRY_POINT.to_owned(),
        }
    }
}

impl RaytraceSettings {
    /// Applies any overrides set in the [`ENV`] environment variables. Unparsable values are
    /// logged and ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(max_bounces) = env_override::<i32>(ENV::MAX_BOUNCES) {
            self.max_bounces = max_bounces.max(0);
        }
        if let Some(reflection_ray_count) = env_override::<i32>(ENV::REFLECTION_RAYS) {
            self.reflection_ray_count = reflection_ray_count.max(0);
        }
        if let Some(always_update_scene) = env_override::<bool>(ENV::ALWAYS_UPDATE_SCENE) {
            self.always_update_scene = always_update_scene;
        }
        self
    }
}

fn env_override<T: FromStr>(var_name: &str) -> Option<T> {
    let value = env::var(var_name).ok()?;
    match value.trim().parse::<T>() {
        Ok(parsed) => {
            debug!("settings override {} = {}", var_name, value);
            Some(parsed)
        }
        Err(_) => {
            warn!("ignoring invalid value '{}' for {}", value, var_name);
            None
        }
    }
}
