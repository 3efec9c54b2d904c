use glam::{Vec3, Vec4};

pub const DEFAULT_RADIUS: f32 = 1.;
pub const DEFAULT_ALBEDO: Vec4 = Vec4::new(0.8, 0.8, 0.8, 1.);
pub const DEFAULT_ROUGHNESS: f32 = 0.5;
pub const DEFAULT_IOR: f32 = 1.5;

pub const DEFAULT_LIGHT_RANGE: f32 = 1.;
pub const DEFAULT_LIGHT_SIZE: f32 = 0.1;

/// Cornflower blue
pub const DEFAULT_AMBIENT_COLOR: Vec4 = Vec4::new(0.392, 0.584, 0.929, 1.);
pub const DEFAULT_MAX_BOUNCES: i32 = 8;
pub const DEFAULT_REFLECTION_RAY_COUNT: i32 = 8;

pub const DEFAULT_CAMERA_POSITION: Vec3 = Vec3::new(0., 2., -8.);
pub const DEFAULT_FOV_Y_DEGREES: f32 = 60.;
pub const DEFAULT_NEAR_PLANE: f32 = 0.1;
pub const DEFAULT_FAR_PLANE: f32 = 1000.;

pub const LOCAL_STORAGE_DIR: &str = ".csg-raytrace";
pub const SAVE_STATE_FILENAME_SCENE: &str = "scene.rtsave";
pub const SAVE_STATE_FILENAME_SETTINGS: &str = "settings.rtsave";
