use super::{
    compute_backend::{BackendError, ComputeBackend, KernelId, KernelParam},
    config_renderer::TIMEOUT_NANOSECS,
    shader_interfaces::{binding_names, uniform_buffers::FrameUniforms},
};
use anyhow::Context;
use ash::vk;
use bort_vk::{
    allocation_info_cpu_accessible, Buffer, BufferProperties, CommandBuffer, CommandPool,
    CommandPoolProperties, DescriptorPool, DescriptorPoolProperties, DescriptorSet,
    DescriptorSetLayout, DescriptorSetLayoutBinding, DescriptorSetLayoutProperties, Device,
    DeviceOwned, Fence, MemoryAllocator, PipelineLayout, PipelineLayoutProperties, Queue,
    ShaderModule,
};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use std::{ffi::CString, mem::size_of, sync::Arc};

/// Descriptor bindings of the raytracing kernel (set 0)
pub mod descriptor {
    pub const BINDING_FRAME_UNIFORMS: u32 = 0;
    pub const BINDING_PRIMITIVES: u32 = 1;
    pub const BINDING_MATERIALS: u32 = 2;
    pub const BINDING_LIGHTS: u32 = 3;
    pub const BINDING_RESULT: u32 = 4;
}

const STORAGE_BUFFER_BINDINGS: [(&str, u32); 3] = [
    (binding_names::PRIMITIVES, descriptor::BINDING_PRIMITIVES),
    (binding_names::MATERIALS, descriptor::BINDING_MATERIALS),
    (binding_names::LIGHTS, descriptor::BINDING_LIGHTS),
];

/// Host visible storage buffer
pub struct VulkanBuffer {
    name: &'static str,
    element_count: usize,
    buffer: Buffer,
}

impl VulkanBuffer {
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }
}

/// Storage image written by the kernel. The image must be in `GENERAL` layout when dispatched.
#[derive(Clone, Copy, Debug)]
pub struct VulkanTarget {
    pub image_view: vk::ImageView,
    pub extent: [u32; 2],
}

/// [`ComputeBackend`] running the raytracing kernel on a vulkan queue.
///
/// The host creates the device, queue and output image. Dispatches return once submitted. The
/// next call that touches a resource the kernel may still be reading waits for that submission
/// first.
pub struct VulkanBackend {
    device: Arc<Device>,
    queue: Arc<Queue>,
    memory_allocator: Arc<MemoryAllocator>,

    entry_point: String,
    thread_group_size: [u32; 3],
    max_work_group_count: [u32; 3],

    pipeline: vk::Pipeline,
    pipeline_layout: Arc<PipelineLayout>,
    _descriptor_pool: Arc<DescriptorPool>,
    descriptor_set: DescriptorSet,

    uniforms: FrameUniforms,
    uniform_buffer: Buffer,
    /// Storage buffer bindings in [`STORAGE_BUFFER_BINDINGS`] order, then the result image
    bound: [bool; 4],

    _command_pool: Arc<CommandPool>,
    command_buffer: CommandBuffer,
    completion_fence: Fence,
    /// A submission that `completion_fence` hasn't been waited on for yet
    submission_pending: bool,
}

impl VulkanBackend {
    /// Loads the SPIR-V kernel at `shader_path`. `thread_group_size` must match the local size
    /// the kernel was compiled with.
    pub fn new(
        memory_allocator: Arc<MemoryAllocator>,
        queue: Arc<Queue>,
        shader_path: &str,
        entry_point: &str,
        thread_group_size: [u32; 3],
    ) -> anyhow::Result<Self> {
        let device = memory_allocator.device().clone();
        let max_work_group_count = device
            .physical_device()
            .properties()
            .limits
            .max_compute_work_group_count;

        let desc_set_layout = create_descriptor_layout(device.clone())?;
        let pipeline_layout = create_pipeline_layout(device.clone(), desc_set_layout.clone())?;
        let pipeline = create_pipeline(&device, &pipeline_layout, shader_path, entry_point)?;

        let descriptor_pool = create_descriptor_pool(device.clone())?;
        let descriptor_set = DescriptorSet::new(descriptor_pool.clone(), desc_set_layout)
            .context("allocating raytrace descriptor set")?;

        let uniform_buffer = create_uniform_buffer(memory_allocator.clone())?;
        write_desc_set_buffer(
            &descriptor_set,
            descriptor::BINDING_FRAME_UNIFORMS,
            vk::DescriptorType::UNIFORM_BUFFER,
            &uniform_buffer,
        );

        let command_pool = create_command_pool(device.clone(), queue.family_index())?;
        let command_buffer = command_pool
            .allocate_command_buffer(vk::CommandBufferLevel::PRIMARY)
            .context("allocating raytrace command buffer")?;
        let completion_fence =
            Fence::new_unsignalled(device.clone()).context("creating raytrace fence")?;

        info!(
            "created vulkan compute backend for kernel '{}' ({})",
            entry_point, shader_path
        );

        Ok(Self {
            device,
            queue,
            memory_allocator,

            entry_point: entry_point.to_owned(),
            thread_group_size,
            max_work_group_count,

            pipeline,
            pipeline_layout,
            _descriptor_pool: descriptor_pool,
            descriptor_set,

            uniforms: FrameUniforms::default(),
            uniform_buffer,
            bound: [false; 4],

            _command_pool: command_pool,
            command_buffer,
            completion_fence,
            submission_pending: false,
        })
    }

    fn check_kernel(&self, kernel: KernelId) -> Result<(), BackendError> {
        if kernel == KernelId(0) {
            Ok(())
        } else {
            Err(BackendError::KernelNotFound(format!("kernel id {}", kernel.0)))
        }
    }

    /// Blocks until the last submitted dispatch finished executing
    fn wait_for_previous_dispatch(&mut self) -> anyhow::Result<()> {
        if self.submission_pending {
            self.completion_fence
                .wait(TIMEOUT_NANOSECS)
                .context("waiting for previous raytrace dispatch")?;
            self.submission_pending = false;
        }
        Ok(())
    }

    fn wait_before_modifying(&mut self, name: &str) -> Result<(), BackendError> {
        self.wait_for_previous_dispatch()
            .map_err(|e| BackendError::UnknownBinding {
                name: name.to_owned(),
                detail: format!("{:#}", e),
            })
    }

    fn record_and_submit(&mut self, group_count: [u32; 3]) -> anyhow::Result<()> {
        self.wait_for_previous_dispatch()?;

        self.uniform_buffer
            .write_iter([self.uniforms], 0)
            .context("uploading frame uniforms")?;

        let device_ash = self.device.inner();
        let command_buffer_handle = self.command_buffer.handle();

        unsafe {
            device_ash
                .reset_fences(&[self.completion_fence.handle()])
                .context("resetting raytrace fence")?;
            device_ash
                .reset_command_buffer(command_buffer_handle, vk::CommandBufferResetFlags::empty())
                .context("resetting raytrace command buffer")?;
        }

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        self.command_buffer
            .begin(&begin_info)
            .context("beginning raytrace command buffer")?;

        unsafe {
            device_ash.cmd_bind_pipeline(
                command_buffer_handle,
                vk::PipelineBindPoint::COMPUTE,
                self.pipeline,
            );
            device_ash.cmd_bind_descriptor_sets(
                command_buffer_handle,
                vk::PipelineBindPoint::COMPUTE,
                self.pipeline_layout.handle(),
                0,
                &[self.descriptor_set.handle()],
                &[],
            );
            device_ash.cmd_dispatch(
                command_buffer_handle,
                group_count[0],
                group_count[1],
                group_count[2],
            );
        }

        self.command_buffer
            .end()
            .context("ending raytrace command buffer")?;

        let submit_command_buffers = [command_buffer_handle];
        let submit_info = vk::SubmitInfo::builder().command_buffers(&submit_command_buffers);
        unsafe {
            device_ash
                .queue_submit(
                    self.queue.handle(),
                    &[submit_info.build()],
                    self.completion_fence.handle(),
                )
                .context("submitting raytrace dispatch")?;
        }
        self.submission_pending = true;

        Ok(())
    }
}

impl ComputeBackend for VulkanBackend {
    type Buffer = VulkanBuffer;
    type Target = VulkanTarget;

    fn create_buffer(
        &mut self,
        name: &'static str,
        element_count: usize,
        stride: usize,
    ) -> Result<VulkanBuffer, BackendError> {
        let allocation_failed = |detail: String| BackendError::AllocationFailed {
            name,
            element_count,
            stride,
            detail,
        };

        let size = element_count
            .checked_mul(stride)
            .ok_or_else(|| allocation_failed("size overflow".to_owned()))?;
        let buffer_props = BufferProperties::new_default(
            size as vk::DeviceSize,
            vk::BufferUsageFlags::STORAGE_BUFFER,
        );
        let buffer = Buffer::new(
            self.memory_allocator.clone(),
            buffer_props,
            allocation_info_cpu_accessible(),
        )
        .map_err(|e| allocation_failed(e.to_string()))?;

        trace!("vulkan buffer '{}' created with {} bytes", name, size);
        Ok(VulkanBuffer {
            name,
            element_count,
            buffer,
        })
    }

    fn write_buffer(&mut self, buffer: &mut VulkanBuffer, data: &[u8]) -> Result<(), BackendError> {
        let capacity = buffer.buffer.properties().size as usize;
        if data.len() > capacity {
            return Err(BackendError::UploadOverflow {
                name: buffer.name,
                size: data.len(),
                capacity,
            });
        }
        self.wait_before_modifying(buffer.name)?;
        buffer
            .buffer
            .write_iter(data.iter().copied(), 0)
            .map_err(|e| BackendError::AllocationFailed {
                name: buffer.name,
                element_count: buffer.element_count,
                stride: capacity / buffer.element_count.max(1),
                detail: format!("writing to mapped memory: {}", e),
            })
    }

    fn release_buffer(&mut self, buffer: VulkanBuffer) {
        if let Err(e) = self.wait_for_previous_dispatch() {
            error!(
                "releasing buffer '{}' without confirming the gpu finished with it: {:#}",
                buffer.name, e
            );
        }
        trace!("vulkan buffer '{}' released", buffer.name);
        drop(buffer);
    }

    fn buffer_len(&self, buffer: &VulkanBuffer) -> usize {
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
        self.max_work_group_count
    }

    fn set_buffer(
        &mut self,
        kernel: KernelId,
        name: &'static str,
        buffer: &VulkanBuffer,
    ) -> Result<(), BackendError> {
        self.check_kernel(kernel)?;
        let (slot, binding) = STORAGE_BUFFER_BINDINGS
            .iter()
            .enumerate()
            .find_map(|(slot, (binding_name, binding))| {
                (*binding_name == name).then_some((slot, *binding))
            })
            .ok_or_else(|| BackendError::UnknownBinding {
                name: name.to_owned(),
                detail: "kernel has no storage buffer with this name".to_owned(),
            })?;

        self.wait_before_modifying(name)?;
        write_desc_set_buffer(
            &self.descriptor_set,
            binding,
            vk::DescriptorType::STORAGE_BUFFER,
            &buffer.buffer,
        );
        self.bound[slot] = true;
        Ok(())
    }

    fn set_param(&mut self, name: &'static str, value: KernelParam) -> Result<(), BackendError> {
        self.uniforms.set(name, value)
    }

    fn set_target(
        &mut self,
        kernel: KernelId,
        name: &'static str,
        target: &VulkanTarget,
    ) -> Result<(), BackendError> {
        self.check_kernel(kernel)?;
        if name != binding_names::RESULT {
            return Err(BackendError::UnknownBinding {
                name: name.to_owned(),
                detail: "kernel has no storage image with this name".to_owned(),
            });
        }

        self.wait_before_modifying(name)?;
        let image_info = vk::DescriptorImageInfo {
            sampler: vk::Sampler::null(),
            image_view: target.image_view,
            image_layout: vk::ImageLayout::GENERAL,
        };
        let image_infos = [image_info];
        let descriptor_writes = [vk::WriteDescriptorSet::builder()
            .dst_set(self.descriptor_set.handle())
            .dst_binding(descriptor::BINDING_RESULT)
            .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
            .image_info(&image_infos)
            .build()];
        unsafe {
            self.device
                .inner()
                .update_descriptor_sets(&descriptor_writes, &[]);
        }

        self.bound[STORAGE_BUFFER_BINDINGS.len()] = true;
        Ok(())
    }

    fn dispatch(&mut self, kernel: KernelId, group_count: [u32; 3]) -> Result<(), BackendError> {
        self.check_kernel(kernel)?;
        if let Some(missing) = self.bound.iter().position(|bound| !bound) {
            let name = STORAGE_BUFFER_BINDINGS
                .get(missing)
                .map_or(binding_names::RESULT, |(name, _)| *name);
            return Err(BackendError::DispatchFailed(format!(
                "'{}' was never bound",
                name
            )));
        }

        self.record_and_submit(group_count)
            .map_err(|e| BackendError::DispatchFailed(format!("{:#}", e)))
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        if let Err(e) = self.wait_for_previous_dispatch() {
            error!("destroying raytrace pipeline while a dispatch may be running: {:#}", e);
        }
        unsafe {
            self.device.inner().destroy_pipeline(self.pipeline, None);
        }
    }
}

// ~~ Helper Functions ~~

fn create_descriptor_layout(device: Arc<Device>) -> anyhow::Result<Arc<DescriptorSetLayout>> {
    let binding = |binding: u32, descriptor_type: vk::DescriptorType| DescriptorSetLayoutBinding {
        binding,
        descriptor_type,
        descriptor_count: 1,
        stage_flags: vk::ShaderStageFlags::COMPUTE,
        ..Default::default()
    };

    let layout_props = DescriptorSetLayoutProperties::new_default(vec![
        binding(
            descriptor::BINDING_FRAME_UNIFORMS,
            vk::DescriptorType::UNIFORM_BUFFER,
        ),
        binding(
            descriptor::BINDING_PRIMITIVES,
            vk::DescriptorType::STORAGE_BUFFER,
        ),
        binding(
            descriptor::BINDING_MATERIALS,
            vk::DescriptorType::STORAGE_BUFFER,
        ),
        binding(descriptor::BINDING_LIGHTS, vk::DescriptorType::STORAGE_BUFFER),
        binding(descriptor::BINDING_RESULT, vk::DescriptorType::STORAGE_IMAGE),
    ]);

    let desc_layout = DescriptorSetLayout::new(device, layout_props)
        .context("creating raytrace descriptor set layout")?;
    Ok(Arc::new(desc_layout))
}

fn create_pipeline_layout(
    device: Arc<Device>,
    desc_set_layout: Arc<DescriptorSetLayout>,
) -> anyhow::Result<Arc<PipelineLayout>> {
    let pipeline_layout_props = PipelineLayoutProperties::new(vec![desc_set_layout], Vec::new());

    let pipeline_layout = PipelineLayout::new(device, pipeline_layout_props)
        .context("creating raytrace pipeline layout")?;
    Ok(Arc::new(pipeline_layout))
}

fn create_pipeline(
    device: &Arc<Device>,
    pipeline_layout: &PipelineLayout,
    shader_path: &str,
    entry_point: &str,
) -> anyhow::Result<vk::Pipeline> {
    let shader = ShaderModule::new_from_file(device.clone(), shader_path)
        .with_context(|| format!("creating raytrace shader from {}", shader_path))?;
    let entry_point_c =
        CString::new(entry_point).context("converting kernel entry point to c-string")?;

    let stage = vk::PipelineShaderStageCreateInfo::builder()
        .stage(vk::ShaderStageFlags::COMPUTE)
        .module(shader.handle())
        .name(&entry_point_c);
    let create_info = vk::ComputePipelineCreateInfo::builder()
        .stage(stage.build())
        .layout(pipeline_layout.handle());

    let pipelines = unsafe {
        device
            .inner()
            .create_compute_pipelines(vk::PipelineCache::null(), &[create_info.build()], None)
    }
    .map_err(|(_, vk_res)| vk_res)
    .context("creating raytrace compute pipeline")?;

    pipelines
        .into_iter()
        .next()
        .context("compute pipeline creation returned no pipeline")
}

fn create_descriptor_pool(device: Arc<Device>) -> anyhow::Result<Arc<DescriptorPool>> {
    let descriptor_pool_props = DescriptorPoolProperties {
        max_sets: 1,
        pool_sizes: vec![
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: 1,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_BUFFER,
                descriptor_count: STORAGE_BUFFER_BINDINGS.len() as u32,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_IMAGE,
                descriptor_count: 1,
            },
        ],
        ..Default::default()
    };

    let descriptor_pool = DescriptorPool::new(device, descriptor_pool_props)
        .context("creating raytrace descriptor pool")?;
    Ok(Arc::new(descriptor_pool))
}

fn create_uniform_buffer(memory_allocator: Arc<MemoryAllocator>) -> anyhow::Result<Buffer> {
    let buffer_props = BufferProperties::new_default(
        size_of::<FrameUniforms>() as vk::DeviceSize,
        vk::BufferUsageFlags::UNIFORM_BUFFER,
    );
    Buffer::new(memory_allocator, buffer_props, allocation_info_cpu_accessible())
        .context("creating frame uniform buffer")
}

fn create_command_pool(
    device: Arc<Device>,
    queue_family_index: u32,
) -> anyhow::Result<Arc<CommandPool>> {
    let command_pool_props = CommandPoolProperties {
        flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        queue_family_index,
    };

    let command_pool = CommandPool::new(device, command_pool_props)
        .context("creating raytrace command pool")?;
    Ok(Arc::new(command_pool))
}

fn write_desc_set_buffer(
    descriptor_set: &DescriptorSet,
    binding: u32,
    descriptor_type: vk::DescriptorType,
    buffer: &Buffer,
) {
    let buffer_infos = [vk::DescriptorBufferInfo {
        buffer: buffer.handle(),
        offset: 0,
        range: buffer.properties().size,
    }];

    let descriptor_writes = [vk::WriteDescriptorSet::builder()
        .dst_set(descriptor_set.handle())
        .dst_binding(binding)
        .descriptor_type(descriptor_type)
        .buffer_info(&buffer_infos)
        .build()];

    unsafe {
        descriptor_set
            .device()
            .inner()
            .update_descriptor_sets(&descriptor_writes, &[]);
    }
}
