use super::{
    compute_backend::{BackendError, ComputeBackend, KernelId, KernelParam},
    scene_buffer_manager::SceneBufferManager,
    shader_interfaces::binding_names,
};
use glam::{Mat4, Vec3, Vec4};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

/// Per-frame kernel parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    /// Output image size in pixels
    pub resolution: [u32; 2],
    pub inverse_projection: Mat4,
    /// Camera to world matrix
    pub inverse_view: Mat4,
    pub camera_position: Vec3,
    pub ambient_color: Vec4,
    pub max_bounces: i32,
    pub reflection_ray_count: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Dispatched { group_count: [u32; 3] },
    /// The kernel couldn't be bound or dispatched. `logged` is false when the error was
    /// suppressed because an earlier failure in the same streak was already logged.
    Failed { error: BackendError, logged: bool },
}

/// Binds the scene buffers and frame parameters to the raytracing kernel and dispatches enough
/// thread groups to cover the output image.
#[derive(Debug, Default)]
pub struct DispatchDriver {
    /// Set after a failure has been logged, cleared by the next successful dispatch
    error_logged: bool,
}

impl DispatchDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds missing scene buffers, then binds and dispatches. Buffer allocation errors are
    /// returned, kernel errors are reported through [`DispatchOutcome::Failed`] and only logged
    /// once per failure streak.
    pub fn dispatch<B: ComputeBackend>(
        &mut self,
        backend: &mut B,
        scene_buffers: &mut SceneBufferManager<B>,
        target: &B::Target,
        frame: &FrameParams,
        entry_point: &str,
    ) -> Result<DispatchOutcome, BackendError> {
        scene_buffers.ensure_ready(backend)?;

        match bind_and_dispatch(backend, scene_buffers, target, frame, entry_point) {
            Ok(group_count) => {
                if self.error_logged {
                    info!("kernel '{}' dispatching again", entry_point);
                }
                self.error_logged = false;
                trace!("dispatched kernel '{}' with {:?} groups", entry_point, group_count);
                Ok(DispatchOutcome::Dispatched { group_count })
            }
            Err(error) => {
                let logged = !self.error_logged;
                if logged {
                    error!("error in kernel '{}': {}", entry_point, error);
                }
                self.error_logged = true;
                Ok(DispatchOutcome::Failed { error, logged })
            }
        }
    }

    pub fn error_logged(&self) -> bool {
        self.error_logged
    }
}

fn bind_and_dispatch<B: ComputeBackend>(
    backend: &mut B,
    scene_buffers: &SceneBufferManager<B>,
    target: &B::Target,
    frame: &FrameParams,
    entry_point: &str,
) -> Result<[u32; 3], BackendError> {
    let kernel = backend.find_kernel(entry_point)?;

    let bindings = scene_buffers
        .bindings()
        .ok_or_else(|| BackendError::UnknownBinding {
            name: binding_names::PRIMITIVES.to_owned(),
            detail: "scene buffers were released before binding".to_owned(),
        })?;

    backend.set_buffer(kernel, binding_names::PRIMITIVES, bindings.primitives)?;
    backend.set_buffer(kernel, binding_names::MATERIALS, bindings.materials)?;
    backend.set_buffer(kernel, binding_names::LIGHTS, bindings.lights)?;
    backend.set_param(
        binding_names::PRIMITIVE_COUNT,
        KernelParam::Int(bindings.primitive_count as i32),
    )?;
    backend.set_param(
        binding_names::MATERIAL_COUNT,
        KernelParam::Int(bindings.material_count as i32),
    )?;
    backend.set_param(
        binding_names::LIGHT_COUNT,
        KernelParam::Int(bindings.light_count as i32),
    )?;
    backend.set_param(
        binding_names::AMBIENT_COLOR,
        KernelParam::Vec4(frame.ambient_color),
    )?;
    backend.set_param(
        binding_names::REFLECTION_RAY_COUNT,
        KernelParam::Int(frame.reflection_ray_count),
    )?;
    backend.set_param(
        binding_names::MAX_BOUNCES,
        KernelParam::Int(frame.max_bounces),
    )?;

    backend.set_target(kernel, binding_names::RESULT, target)?;

    backend.set_param(
        binding_names::RESOLUTION,
        KernelParam::Int2([frame.resolution[0] as i32, frame.resolution[1] as i32]),
    )?;
    backend.set_param(
        binding_names::CAMERA_INVERSE_PROJECTION,
        KernelParam::Mat4(frame.inverse_projection),
    )?;
    backend.set_param(
        binding_names::CAMERA_INVERSE_VIEW,
        KernelParam::Mat4(frame.inverse_view),
    )?;
    backend.set_param(
        binding_names::CAMERA_POSITION,
        KernelParam::Vec4(frame.camera_position.extend(1.)),
    )?;

    let group_count = calc_work_group_count(backend, kernel, frame.resolution)?;
    backend.dispatch(kernel, group_count)?;
    Ok(group_count)
}

/// Group count covering `resolution`, checked against the device's per-dispatch limits
fn calc_work_group_count<B: ComputeBackend>(
    backend: &B,
    kernel: KernelId,
    resolution: [u32; 2],
) -> Result<[u32; 3], BackendError> {
    let thread_group_size = backend.thread_group_size(kernel)?;
    let group_count = work_group_count(resolution, thread_group_size).ok_or_else(|| {
        BackendError::DispatchFailed(format!(
            "kernel declared an invalid thread group size {:?}",
            thread_group_size
        ))
    })?;

    let limit = backend.max_work_group_count();
    if group_count.iter().zip(limit).any(|(count, max)| *count > max) {
        return Err(BackendError::DispatchFailed(format!(
            "work group count {:?} for resolution {:?} exceeds device limit {:?}",
            group_count, resolution, limit
        )));
    }
    Ok(group_count)
}

/// Number of thread groups needed to cover every pixel of `resolution`, rounding up. Pixels of
/// the last row/column of groups that fall outside the image are discarded by the kernel.
pub fn work_group_count(resolution: [u32; 2], thread_group_size: [u32; 3]) -> Option<[u32; 3]> {
    let [size_x, size_y, _] = thread_group_size;
    if size_x == 0 || size_y == 0 {
        return None;
    }
    Some([
        resolution[0].div_ceil(size_x),
        resolution[1].div_ceil(size_y),
        1,
    ])
}
