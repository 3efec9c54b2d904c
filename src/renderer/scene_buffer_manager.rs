use super::{
    compute_backend::{BackendError, ComputeBackend},
    shader_interfaces::{
        binding_names, light_buffer::LightRecord, material_buffer::MaterialRecord,
        primitive_buffer::PrimitiveRecord,
    },
};
use crate::engine::flatten::FlattenedScene;
use bytemuck::Pod;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use std::mem::size_of;

/// Host-side records plus the device buffer they were last uploaded to
struct StagedBuffer<B: ComputeBackend, T> {
    name: &'static str,
    staging: Vec<T>,
    buffer: Option<B::Buffer>,
}

impl<B: ComputeBackend, T: Pod> StagedBuffer<B, T> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            staging: Vec::new(),
            buffer: None,
        }
    }

    /// Device buffers are never empty so the kernel always gets a valid binding
    fn element_count(&self) -> usize {
        self.staging.len().max(1)
    }

    fn upload(&mut self, backend: &mut B) -> Result<(), BackendError> {
        let element_count = self.element_count();

        let mut buffer = match self.buffer.take() {
            Some(existing) if backend.buffer_len(&existing) == element_count => {
                trace!(
                    "re-uploading {} {} records in place",
                    self.staging.len(),
                    self.name
                );
                existing
            }
            previous => {
                // free the previous generation before allocating its replacement
                if let Some(previous) = previous {
                    backend.release_buffer(previous);
                }
                trace!(
                    "allocating {} buffer for {} records",
                    self.name,
                    element_count
                );
                backend.create_buffer(self.name, element_count, size_of::<T>())?
            }
        };

        let write_res = if self.staging.is_empty() {
            // zeroed placeholder so a reused single element buffer holds no stale record
            backend.write_buffer(&mut buffer, bytemuck::bytes_of(&T::zeroed()))
        } else {
            backend.write_buffer(&mut buffer, bytemuck::cast_slice(&self.staging))
        };
        self.buffer = Some(buffer);
        write_res
    }

    fn release(&mut self, backend: &mut B) {
        if let Some(buffer) = self.buffer.take() {
            backend.release_buffer(buffer);
        }
    }
}

/// Buffers ready to be bound to the kernel along with the number of valid records in each
pub struct SceneBindings<'a, B: ComputeBackend> {
    pub primitives: &'a B::Buffer,
    pub materials: &'a B::Buffer,
    pub lights: &'a B::Buffer,
    pub primitive_count: usize,
    pub material_count: usize,
    pub light_count: usize,
}

/// Owns the primitive, material and light buffers read by the raytracing kernel.
pub struct SceneBufferManager<B: ComputeBackend> {
    primitives: StagedBuffer<B, PrimitiveRecord>,
    materials: StagedBuffer<B, MaterialRecord>,
    lights: StagedBuffer<B, LightRecord>,
}

impl<B: ComputeBackend> SceneBufferManager<B> {
    pub fn new() -> Self {
        Self {
            primitives: StagedBuffer::new(binding_names::PRIMITIVES),
            materials: StagedBuffer::new(binding_names::MATERIALS),
            lights: StagedBuffer::new(binding_names::LIGHTS),
        }
    }

    /// Replaces the contents of all three buffers. Buffers are re-allocated only when their
    /// record count changed, otherwise the data is written in place.
    pub fn rebuild(
        &mut self,
        backend: &mut B,
        primitives: Vec<PrimitiveRecord>,
        materials: Vec<MaterialRecord>,
        lights: Vec<LightRecord>,
    ) -> Result<(), BackendError> {
        self.primitives.staging = primitives;
        self.materials.staging = materials;
        self.lights.staging = lights;

        debug!(
            "rebuilding scene buffers: {} primitives, {} materials, {} lights",
            self.primitives.staging.len(),
            self.materials.staging.len(),
            self.lights.staging.len()
        );

        self.upload_all(backend)
    }

    pub fn rebuild_from(
        &mut self,
        backend: &mut B,
        flattened: FlattenedScene,
    ) -> Result<(), BackendError> {
        self.rebuild(
            backend,
            flattened.primitives,
            flattened.materials,
            flattened.lights,
        )
    }

    /// Uploads the current records if any buffer is missing. Returns true if buffers were built.
    pub fn ensure_ready(&mut self, backend: &mut B) -> Result<bool, BackendError> {
        if self.is_ready() {
            return Ok(false);
        }
        debug!("scene buffers missing, building from staged records");
        self.upload_all(backend)?;
        Ok(true)
    }

    pub fn is_ready(&self) -> bool {
        self.primitives.buffer.is_some()
            && self.materials.buffer.is_some()
            && self.lights.buffer.is_some()
    }

    /// Releases all device buffers. Staged records are kept so [`Self::ensure_ready`] can
    /// rebuild them.
    pub fn teardown(&mut self, backend: &mut B) {
        debug!("releasing scene buffers");
        self.primitives.release(backend);
        self.materials.release(backend);
        self.lights.release(backend);
    }

    pub fn bindings(&self) -> Option<SceneBindings<'_, B>> {
        Some(SceneBindings {
            primitives: self.primitives.buffer.as_ref()?,
            materials: self.materials.buffer.as_ref()?,
            lights: self.lights.buffer.as_ref()?,
            primitive_count: self.primitives.staging.len(),
            material_count: self.materials.staging.len(),
            light_count: self.lights.staging.len(),
        })
    }

    pub fn primitive_records(&self) -> &[PrimitiveRecord] {
        &self.primitives.staging
    }

    pub fn material_records(&self) -> &[MaterialRecord] {
        &self.materials.staging
    }

    pub fn light_records(&self) -> &[LightRecord] {
        &self.lights.staging
    }

    fn upload_all(&mut self, backend: &mut B) -> Result<(), BackendError> {
        self.primitives.upload(backend)?;
        self.materials.upload(backend)?;
        self.lights.upload(backend)?;
        Ok(())
    }
}

impl<B: ComputeBackend> Default for SceneBufferManager<B> {
    fn default() -> Self {
        Self::new()
    }
}
