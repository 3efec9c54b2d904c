use glam::{Mat4, Vec4};

/// Opaque handle to a kernel entry point returned by [`ComputeBackend::find_kernel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelId(pub u32);

/// Value types accepted by named kernel parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KernelParam {
    Int(i32),
    Int2([i32; 2]),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl KernelParam {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Int2(_) => "int2",
            Self::Vec4(_) => "float4",
            Self::Mat4(_) => "float4x4",
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("failed to allocate {element_count} x {stride} byte buffer '{name}': {detail}")]
    AllocationFailed {
        name: &'static str,
        element_count: usize,
        stride: usize,
        detail: String,
    },
    #[error("upload of {size} bytes exceeds buffer '{name}' capacity of {capacity} bytes")]
    UploadOverflow {
        name: &'static str,
        size: usize,
        capacity: usize,
    },
    #[error("kernel entry point '{0}' not found")]
    KernelNotFound(String),
    #[error("unknown or incompatible binding '{name}': {detail}")]
    UnknownBinding { name: String, detail: String },
    #[error("dispatch failed: {0}")]
    DispatchFailed(String),
}

/// Device side of the raytracer: storage buffers, named kernel bindings and compute dispatch.
///
/// Buffers are owned by the caller once created and must be handed back through
/// [`ComputeBackend::release_buffer`] to free their device memory.
pub trait ComputeBackend {
    type Buffer;
    type Target;

    fn create_buffer(
        &mut self,
        name: &'static str,
        element_count: usize,
        stride: usize,
    ) -> Result<Self::Buffer, BackendError>;

    /// Writes `data` to the start of `buffer`. Bytes past `data.len()` are left untouched.
    fn write_buffer(&mut self, buffer: &mut Self::Buffer, data: &[u8]) -> Result<(), BackendError>;

    fn release_buffer(&mut self, buffer: Self::Buffer);

    /// Number of elements the buffer was created with
    fn buffer_len(&self, buffer: &Self::Buffer) -> usize;

    fn find_kernel(&self, entry_point: &str) -> Result<KernelId, BackendError>;

    /// Fixed thread group dimensions declared by the kernel
    fn thread_group_size(&self, kernel: KernelId) -> Result<[u32; 3], BackendError>;

    /// Largest group count a single dispatch accepts on each axis
    fn max_work_group_count(&self) -> [u32; 3];

    fn set_buffer(
        &mut self,
        kernel: KernelId,
        name: &'static str,
        buffer: &Self::Buffer,
    ) -> Result<(), BackendError>;

    fn set_param(&mut self, name: &'static str, value: KernelParam) -> Result<(), BackendError>;

    fn set_target(
        &mut self,
        kernel: KernelId,
        name: &'static str,
        target: &Self::Target,
    ) -> Result<(), BackendError>;

    fn dispatch(&mut self, kernel: KernelId, group_count: [u32; 3]) -> Result<(), BackendError>;
}
