//! Resource and parameter names shared with the raytracing kernel. Renaming any of these is a
//! breaking change to the kernel interface.

/// Kernel entry point
pub const KERNEL_ENTRY_POINT: &str = "CSMain";

pub const PRIMITIVES: &str = "_Primitives";
pub const MATERIALS: &str = "_Materials";
pub const LIGHTS: &str = "_Lights";

pub const PRIMITIVE_COUNT: &str = "_PrimitiveCount";
pub const MATERIAL_COUNT: &str = "_MaterialCount";
pub const LIGHT_COUNT: &str = "_LightCount";

pub const AMBIENT_COLOR: &str = "_AmbientColor";
pub const REFLECTION_RAY_COUNT: &str = "_ReflectionRayCount";
pub const MAX_BOUNCES: &str = "_MaxBounces";

pub const RESOLUTION: &str = "_Resolution";
pub const CAMERA_INVERSE_PROJECTION: &str = "_CamInvProj";
pub const CAMERA_INVERSE_VIEW: &str = "_CamInvView";
pub const CAMERA_POSITION: &str = "_CamPos";

/// Output image
pub const RESULT: &str = "Result";
