use bytemuck::{Pod, Zeroable};

/// One entry of the `_Lights` storage buffer.
///
/// _Records are tightly packed with a 36 byte stride, which matches an HLSL `StructuredBuffer`
/// of the kernel's light struct. A GLSL `std430` array of a `vec3`-holding struct has a 48 byte
/// stride instead, so a GLSL kernel must declare the buffer as `float lights[]` and read light
/// `i` from `lights[i * LIGHT_RECORD_FLOATS]` onwards._
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightRecord {
    /// World space position
    pub position: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
    pub range: f32,
    /// Emitter radius used for soft shadows
    pub size: f32,
}

/// Stride of [`LightRecord`] in 4 byte floats
pub const LIGHT_RECORD_FLOATS: usize = std::mem::size_of::<LightRecord>() / 4;
