use log::LevelFilter;

pub const ENGINE_NAME: &str = "csg-raytrace";
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variables that can be used to configure the raytracer
#[allow(non_snake_case)]
pub mod ENV {
    /// Overrides the log level filter, e.g. `warn` or `trace`
    pub const LOG_LEVEL: &str = "CSG_RT_LOG_LEVEL";
    /// Integer override for the maximum number of ray bounces
    pub const MAX_BOUNCES: &str = "CSG_RT_MAX_BOUNCES";
    /// Integer override for the number of reflection rays per hit
    pub const REFLECTION_RAYS: &str = "CSG_RT_REFLECTION_RAYS";
    /// `true`/`false` override for re-flattening the scene every tick
    pub const ALWAYS_UPDATE_SCENE: &str = "CSG_RT_ALWAYS_UPDATE";
}

/// Log level filter. Log messages with lower levels than this will not be displayed.
#[cfg(debug_assertions)]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;
#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Output image size used by the demo
pub const DEFAULT_RESOLUTION: [u32; 2] = [1920, 1080];

/// Written at the start of save state files
pub const PRECURSOR_BYTES: &[u8] = b"CSGRT\x00\x01\x00";
pub const PRECURSOR_BYTE_COUNT: usize = PRECURSOR_BYTES.len();
