use super::{
    compute_backend::{BackendError, ComputeBackend, KernelId, KernelParam},
    shader_interfaces::uniform_buffers::FrameUniforms,
};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use std::collections::BTreeMap;

/// Lowest `maxComputeWorkGroupCount` a vulkan device may report
pub const MIN_MAX_WORK_GROUP_COUNT: u32 = 65535;

/// Host memory stand-in for a device storage buffer
#[derive(Debug)]
pub struct HeadlessBuffer {
    id: u64,
    name: &'static str,
    stride: usize,
    element_count: usize,
    data: Vec<u8>,
}

impl HeadlessBuffer {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Reinterprets the buffer contents as records of type `T`
    pub fn records<T: bytemuck::Pod>(&self) -> Vec<T> {
        debug_assert_eq!(self.stride, std::mem::size_of::<T>());
        self.data
            .chunks_exact(self.stride)
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }
}

/// Output image stand-in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessTarget {
    pub extent: [u32; 2],
}

/// A [`ComputeBackend`] that keeps everything in host memory and records what it was asked to
/// do. Used when no gpu device is available and for testing.
#[derive(Debug)]
pub struct HeadlessBackend {
    entry_point: String,
    thread_group_size: [u32; 3],

    next_buffer_id: u64,
    live_buffers: BTreeMap<u64, &'static str>,
    peak_live_per_name: BTreeMap<&'static str, usize>,
    allocation_count: usize,
    release_count: usize,

    bound_buffers: BTreeMap<&'static str, u64>,
    bound_target: Option<(&'static str, HeadlessTarget)>,
    uniforms: FrameUniforms,
    dispatches: Vec<[u32; 3]>,

    /// Makes every dispatch fail while set
    pub fail_dispatch: bool,
    /// Allocations above this many bytes fail
    pub allocation_limit: Option<usize>,
    /// Reported by [`ComputeBackend::max_work_group_count`]
    pub work_group_count_limit: [u32; 3],
}

impl HeadlessBackend {
    pub fn new(entry_point: &str, thread_group_size: [u32; 3]) -> Self {
        Self {
            entry_point: entry_point.to_owned(),
            thread_group_size,

            next_buffer_id: 1,
            live_buffers: BTreeMap::new(),
            peak_live_per_name: BTreeMap::new(),
            allocation_count: 0,
            release_count: 0,

            bound_buffers: BTreeMap::new(),
            bound_target: None,
            uniforms: FrameUniforms::default(),
            dispatches: Vec::new(),

            fail_dispatch: false,
            allocation_limit: None,
            work_group_count_limit: [MIN_MAX_WORK_GROUP_COUNT; 3],
        }
    }

    pub fn live_buffer_count(&self) -> usize {
        self.live_buffers.len()
    }

    /// Highest number of simultaneously live buffers created under `name`
    pub fn peak_live_buffers(&self, name: &str) -> usize {
        self.peak_live_per_name.get(name).copied().unwrap_or(0)
    }

    pub fn allocation_count(&self) -> usize {
        self.allocation_count
    }

    pub fn release_count(&self) -> usize {
        self.release_count
    }

    /// Id of the buffer last bound under `name`
    pub fn bound_buffer(&self, name: &str) -> Option<u64> {
        self.bound_buffers.get(name).copied()
    }

    pub fn bound_target(&self) -> Option<(&'static str, HeadlessTarget)> {
        self.bound_target
    }

    pub fn uniforms(&self) -> &FrameUniforms {
        &self.uniforms
    }

    pub fn dispatches(&self) -> &[[u32; 3]] {
        &self.dispatches
    }

    fn check_kernel(&self, kernel: KernelId) -> Result<(), BackendError> {
        if kernel == KernelId(0) {
            Ok(())
        } else {
            Err(BackendError::KernelNotFound(format!("kernel id {}", kernel.0)))
        }
    }
}

impl ComputeBackend for HeadlessBackend {
    type Buffer = HeadlessBuffer;
    type Target = HeadlessTarget;

    fn create_buffer(
        &mut self,
        name: &'static str,
        element_count: usize,
        stride: usize,
    ) -> Result<HeadlessBuffer, BackendError> {
        let size = element_count * stride;
        if let Some(limit) = self.allocation_limit {
            if size > limit {
                return Err(BackendError::AllocationFailed {
                    name,
                    element_count,
                    stride,
                    detail: format!("out of device memory (limit = {} bytes)", limit),
                });
            }
        }

        let id = self.next_buffer_id;
        self.next_buffer_id += 1;
        self.allocation_count += 1;
        self.live_buffers.insert(id, name);

        let live_with_name = self.live_buffers.values().filter(|n| **n == name).count();
        let peak = self.peak_live_per_name.entry(name).or_insert(0);
        *peak = (*peak).max(live_with_name);

        trace!("headless buffer {} '{}' created with {} bytes", id, name, size);
        Ok(HeadlessBuffer {
            id,
            name,
            stride,
            element_count,
            data: vec![0; size],
        })
    }

    fn write_buffer(&mut self, buffer: &mut HeadlessBuffer, data: &[u8]) -> Result<(), BackendError> {
        if data.len() > buffer.data.len() {
            return Err(BackendError::UploadOverflow {
                name: buffer.name,
                size: data.len(),
                capacity: buffer.data.len(),
            });
        }
        buffer.data[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn release_buffer(&mut self, buffer: HeadlessBuffer) {
        trace!("headless buffer {} '{}' released", buffer.id, buffer.name);
        self.live_buffers.remove(&buffer.id);
        self.release_count += 1;
    }

    fn buffer_len(&self, buffer: &HeadlessBuffer) -> usize {
        buffer.element_count
    }

    fn find_kernel(&self, entry_point: &str) -> Result<KernelId, BackendError> {
        if entry_point == self.entry_point {
            Ok(KernelId(0))
        } else {
            Err(BackendError::KernelNotFound(entry_point.to_owned()))
        }
    }

    fn thread_group_size(&self, kernel: KernelId) -> Result<[u32; 3], BackendError> {
        self.check_kernel(kernel)?;
        Ok(self.thread_group_size)
    }

    fn max_work_group_count(&self) -> [u32; 3] {
        self.work_group_count_limit
    }

    fn set_buffer(
        &mut self,
        kernel: KernelId,
        name: &'static str,
        buffer: &HeadlessBuffer,
    ) -> Result<(), BackendError> {
        self.check_kernel(kernel)?;
        if !self.live_buffers.contains_key(&buffer.id) {
            return Err(BackendError::UnknownBinding {
                name: name.to_owned(),
                detail: format!("buffer {} was already released", buffer.id),
            });
        }
        self.bound_buffers.insert(name, buffer.id);
        Ok(())
    }

    fn set_param(&mut self, name: &'static str, value: KernelParam) -> Result<(), BackendError> {
        self.uniforms.set(name, value)
    }

    fn set_target(
        &mut self,
        kernel: KernelId,
        name: &'static str,
        target: &HeadlessTarget,
    ) -> Result<(), BackendError> {
        self.check_kernel(kernel)?;
        self.bound_target = Some((name, *target));
        Ok(())
    }

    fn dispatch(&mut self, kernel: KernelId, group_count: [u32; 3]) -> Result<(), BackendError> {
        self.check_kernel(kernel)?;
        if self.fail_dispatch {
            return Err(BackendError::DispatchFailed(
                "headless dispatch failure requested".to_owned(),
            ));
        }
        self.dispatches.push(group_count);
        Ok(())
    }
}
