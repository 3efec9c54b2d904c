use bytemuck::{Pod, Zeroable};

/// One entry of the `_Materials` storage buffer.
///
/// _Layout must match the kernel's material struct (48 bytes)_
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MaterialRecord {
    pub albedo: [f32; 4],
    pub emission: f32,
    pub roughness: f32,
    pub metallic: f32,
    pub ior: f32,
    /// Volumetric absorption per color channel
    pub absorption: [f32; 3],
    // keeps the struct a multiple of 16 bytes
    pub pad: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoffset::offset_of;

    #[test]
    fn record_layout_matches_kernel() {
        assert_eq!(std::mem::size_of::<MaterialRecord>(), 48);
        assert_eq!(offset_of!(MaterialRecord, emission), 16);
        assert_eq!(offset_of!(MaterialRecord, ior), 28);
        assert_eq!(offset_of!(MaterialRecord, absorption), 32);
        assert_eq!(offset_of!(MaterialRecord, pad), 44);
    }
}
