use super::binding_names;
use crate::renderer::compute_backend::{BackendError, KernelParam};
use bytemuck::{Pod, Zeroable};

/// Scalar and matrix kernel parameters packed for a single uniform buffer binding.
///
/// _Layout must match the kernel's frame uniform block (std140)_
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    /// Inverse projection matrix. Converts clip space coordinates to view space
    pub cam_inv_proj: [f32; 16],
    /// Camera to world matrix
    pub cam_inv_view: [f32; 16],
    /// Camera position in world space (w component unused)
    pub cam_pos: [f32; 4],
    pub ambient_color: [f32; 4],
    pub resolution: [i32; 2],
    pub primitive_count: i32,
    pub material_count: i32,
    pub light_count: i32,
    pub reflection_ray_count: i32,
    pub max_bounces: i32,
    pub _pad: i32,
}

impl FrameUniforms {
    /// Writes a named parameter into its slot. Names and value shapes follow [`binding_names`].
    pub fn set(&mut self, name: &str, value: KernelParam) -> Result<(), BackendError> {
        match (name, value) {
            (binding_names::CAMERA_INVERSE_PROJECTION, KernelParam::Mat4(m)) => {
                self.cam_inv_proj = m.to_cols_array()
            }
            (binding_names::CAMERA_INVERSE_VIEW, KernelParam::Mat4(m)) => {
                self.cam_inv_view = m.to_cols_array()
            }
            (binding_names::CAMERA_POSITION, KernelParam::Vec4(v)) => self.cam_pos = v.to_array(),
            (binding_names::AMBIENT_COLOR, KernelParam::Vec4(v)) => {
                self.ambient_color = v.to_array()
            }
            (binding_names::RESOLUTION, KernelParam::Int2(v)) => self.resolution = v,
            (binding_names::PRIMITIVE_COUNT, KernelParam::Int(v)) => self.primitive_count = v,
            (binding_names::MATERIAL_COUNT, KernelParam::Int(v)) => self.material_count = v,
            (binding_names::LIGHT_COUNT, KernelParam::Int(v)) => self.light_count = v,
            (binding_names::REFLECTION_RAY_COUNT, KernelParam::Int(v)) => {
                self.reflection_ray_count = v
            }
            (binding_names::MAX_BOUNCES, KernelParam::Int(v)) => self.max_bounces = v,
            (name, value) => {
                return Err(BackendError::UnknownBinding {
                    name: name.to_owned(),
                    detail: format!("no parameter slot accepts {}", value.type_name()),
                })
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec4};
    use memoffset::offset_of;

    #[test]
    fn std140_layout() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 192);
        assert_eq!(offset_of!(FrameUniforms, cam_inv_view), 64);
        assert_eq!(offset_of!(FrameUniforms, cam_pos), 128);
        assert_eq!(offset_of!(FrameUniforms, ambient_color), 144);
        assert_eq!(offset_of!(FrameUniforms, resolution), 160);
        assert_eq!(offset_of!(FrameUniforms, light_count), 176);
    }

    #[test]
    fn set_named_parameters() {
        let mut uniforms = FrameUniforms::default();
        uniforms
            .set(binding_names::MAX_BOUNCES, KernelParam::Int(8))
            .unwrap();
        uniforms
            .set(binding_names::RESOLUTION, KernelParam::Int2([640, 480]))
            .unwrap();
        uniforms
            .set(
                binding_names::CAMERA_INVERSE_VIEW,
                KernelParam::Mat4(Mat4::from_translation(glam::Vec3::X)),
            )
            .unwrap();

        assert_eq!(uniforms.max_bounces, 8);
        assert_eq!(uniforms.resolution, [640, 480]);
        assert_eq!(uniforms.cam_inv_view[12], 1.);
    }

    #[test]
    fn mismatched_parameter_is_rejected() {
        let mut uniforms = FrameUniforms::default();
        assert!(uniforms
            .set(binding_names::MAX_BOUNCES, KernelParam::Vec4(Vec4::ONE))
            .is_err());
        assert!(uniforms.set("_Unknown", KernelParam::Int(1)).is_err());
    }
}
