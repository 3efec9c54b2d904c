use super::{
    flatten::{flatten_scene, FlattenWarning},
    scene::Scene,
    settings::RaytraceSettings,
};
use crate::renderer::{
    compute_backend::{BackendError, ComputeBackend},
    dispatch_driver::{DispatchDriver, DispatchOutcome, FrameParams},
    scene_buffer_manager::SceneBufferManager,
};
use anyhow::Context;
use glam::{Mat4, Vec3};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

/// Camera state supplied by the host each tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    pub resolution: [u32; 2],
    pub inverse_projection: Mat4,
    /// Camera to world matrix
    pub inverse_view: Mat4,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Rendering is disabled
    Idle,
    Rendered {
        /// Whether the scene was flattened and uploaded this tick
        reflattened: bool,
        dispatch: DispatchOutcome,
    },
}

/// Drives the per-tick flatten, upload and dispatch sequence for one output image.
pub struct Raytracer<B: ComputeBackend> {
    settings: RaytraceSettings,
    scene_buffers: SceneBufferManager<B>,
    dispatch_driver: DispatchDriver,
    scene_changed: bool,
    last_warnings: Vec<FlattenWarning>,
}

impl<B: ComputeBackend> Raytracer<B> {
    /// Buffers are created lazily on the first tick or [`Self::execute`]
    pub fn new(settings: RaytraceSettings) -> Self {
        Self {
            settings,
            scene_buffers: SceneBufferManager::new(),
            dispatch_driver: DispatchDriver::new(),
            scene_changed: true,
            last_warnings: Vec::new(),
        }
    }

    pub fn settings(&self) -> &RaytraceSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RaytraceSettings {
        &mut self.settings
    }

    pub fn set_render_enable(&mut self, render_enable: bool) {
        self.settings.render_enable = render_enable;
    }

    /// Schedules a re-flatten on the next tick. Only needed when `always_update_scene` is off.
    pub fn mark_scene_changed(&mut self) {
        self.scene_changed = true;
    }

    pub fn scene_buffers(&self) -> &SceneBufferManager<B> {
        &self.scene_buffers
    }

    /// Authoring defects found by the last flatten
    pub fn last_warnings(&self) -> &[FlattenWarning] {
        &self.last_warnings
    }

    /// One host frame. Does nothing while rendering is disabled, otherwise re-flattens the scene
    /// if needed and dispatches the kernel.
    ///
    /// Buffer errors are returned so the host can report them; the next tick retries. Kernel
    /// errors are reported in the returned outcome.
    pub fn update(
        &mut self,
        backend: &mut B,
        scene: &Scene,
        target: &B::Target,
        camera: &CameraParams,
    ) -> anyhow::Result<TickOutcome> {
        if !self.settings.render_enable {
            return Ok(TickOutcome::Idle);
        }

        let reflattened = self.settings.always_update_scene || self.scene_changed;
        if reflattened {
            self.setup_scene(backend, scene)
                .context("rebuilding scene buffers")?;
        }

        let dispatch = self.execute(backend, scene, target, camera)?;
        Ok(TickOutcome::Rendered {
            reflattened,
            dispatch,
        })
    }

    /// Flattens `scene` and uploads the result
    pub fn setup_scene(&mut self, backend: &mut B, scene: &Scene) -> Result<(), BackendError> {
        let flattened = flatten_scene(scene);
        self.last_warnings = flattened.warnings.clone();
        self.scene_buffers.rebuild_from(backend, flattened)?;
        self.scene_changed = false;
        Ok(())
    }

    /// Dispatches the kernel against the current buffers, flattening `scene` first if no buffers
    /// exist yet.
    pub fn execute(
        &mut self,
        backend: &mut B,
        scene: &Scene,
        target: &B::Target,
        camera: &CameraParams,
    ) -> anyhow::Result<DispatchOutcome> {
        if !self.scene_buffers.is_ready() {
            self.setup_scene(backend, scene)
                .context("building initial scene buffers")?;
        }

        let frame = self.frame_params(camera);
        self.dispatch_driver
            .dispatch(
                backend,
                &mut self.scene_buffers,
                target,
                &frame,
                &self.settings.kernel_entry_point,
            )
            .context("preparing scene buffers for dispatch")
    }

    /// Releases all device buffers. The next tick or execute rebuilds them.
    pub fn teardown(&mut self, backend: &mut B) {
        self.scene_buffers.teardown(backend);
    }

    fn frame_params(&self, camera: &CameraParams) -> FrameParams {
        FrameParams {
            resolution: camera.resolution,
            inverse_projection: camera.inverse_projection,
            inverse_view: camera.inverse_view,
            camera_position: camera.position,
            ambient_color: self.settings.ambient_color,
            max_bounces: self.settings.max_bounces,
            reflection_ray_count: self.settings.reflection_ray_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::scene::{light::Light, operation::BooleanOp, scene_node::SceneNode},
        renderer::{
            headless_backend::{HeadlessBackend, HeadlessTarget},
            shader_interfaces::{binding_names, primitive_buffer::PrimitiveRecord},
        },
    };

    const TARGET: HeadlessTarget = HeadlessTarget { extent: [17, 17] };

    fn camera() -> CameraParams {
        CameraParams {
            resolution: TARGET.extent,
            inverse_projection: Mat4::IDENTITY,
            inverse_view: Mat4::IDENTITY,
            position: Vec3::ZERO,
        }
    }

    fn backend() -> HeadlessBackend {
        HeadlessBackend::new(binding_names::KERNEL_ENTRY_POINT, [8, 8, 1])
    }

    fn scene() -> Scene {
        let mut scene = Scene::new();
        scene
            .push_node(SceneNode::boolean(
                "blob",
                BooleanOp::Union,
                0.5,
                [
                    SceneNode::unit_sphere("a", Vec3::ZERO),
                    SceneNode::unit_sphere("b", Vec3::X),
                ],
            ))
            .push_light(Light::new(Vec3::Y));
        scene
    }

    fn enabled(always_update_scene: bool) -> RaytraceSettings {
        RaytraceSettings {
            render_enable: true,
            always_update_scene,
            ..Default::default()
        }
    }

    #[test]
    fn disabled_rendering_stays_idle() {
        let mut backend = backend();
        let mut raytracer = Raytracer::new(RaytraceSettings::default());

        let outcome = raytracer
            .update(&mut backend, &scene(), &TARGET, &camera())
            .unwrap();

        assert_eq!(outcome, TickOutcome::Idle);
        assert!(!raytracer.scene_buffers().is_ready());
        assert_eq!(backend.allocation_count(), 0);
    }

    #[test]
    fn first_tick_flattens_and_dispatches() {
        let mut backend = backend();
        let mut raytracer = Raytracer::new(enabled(false));

        let outcome = raytracer
            .update(&mut backend, &scene(), &TARGET, &camera())
            .unwrap();

        assert_eq!(
            outcome,
            TickOutcome::Rendered {
                reflattened: true,
                dispatch: DispatchOutcome::Dispatched {
                    group_count: [3, 3, 1]
                },
            }
        );
        assert_eq!(raytracer.scene_buffers().primitive_records().len(), 3);
        assert_eq!(raytracer.scene_buffers().light_records().len(), 1);
    }

    #[test]
    fn unchanged_scene_is_not_reflattened() {
        let mut backend = backend();
        let mut raytracer = Raytracer::new(enabled(false));
        let mut scene = scene();
        raytracer
            .update(&mut backend, &scene, &TARGET, &camera())
            .unwrap();

        scene.push_node(SceneNode::unit_sphere("late", Vec3::Z));
        let outcome = raytracer
            .update(&mut backend, &scene, &TARGET, &camera())
            .unwrap();
        assert!(matches!(
            outcome,
            TickOutcome::Rendered {
                reflattened: false,
                ..
            }
        ));
        assert_eq!(raytracer.scene_buffers().primitive_records().len(), 3);

        raytracer.mark_scene_changed();
        let outcome = raytracer
            .update(&mut backend, &scene, &TARGET, &camera())
            .unwrap();
        assert!(matches!(
            outcome,
            TickOutcome::Rendered {
                reflattened: true,
                ..
            }
        ));
        assert_eq!(raytracer.scene_buffers().primitive_records().len(), 4);
    }

    #[test]
    fn always_update_reflattens_every_tick() {
        let mut backend = backend();
        let mut raytracer = Raytracer::new(enabled(true));
        let scene = scene();

        for _ in 0..3 {
            let outcome = raytracer
                .update(&mut backend, &scene, &TARGET, &camera())
                .unwrap();
            assert!(matches!(
                outcome,
                TickOutcome::Rendered {
                    reflattened: true,
                    ..
                }
            ));
        }
        // same record counts every tick so the first allocation is reused
        assert_eq!(backend.allocation_count(), 3);
        assert_eq!(backend.dispatches().len(), 3);
    }

    #[test]
    fn execute_after_teardown_rebuilds() {
        let mut backend = backend();
        let mut raytracer = Raytracer::new(enabled(false));
        let scene = scene();
        raytracer
            .update(&mut backend, &scene, &TARGET, &camera())
            .unwrap();

        raytracer.teardown(&mut backend);
        assert_eq!(backend.live_buffer_count(), 0);

        let outcome = raytracer
            .execute(&mut backend, &scene, &TARGET, &camera())
            .unwrap();
        assert!(matches!(outcome, DispatchOutcome::Dispatched { .. }));
        let primitives: Vec<PrimitiveRecord> = raytracer
            .scene_buffers()
            .bindings()
            .unwrap()
            .primitives
            .records();
        assert_eq!(primitives.len(), 3);
    }

    #[test]
    fn buffer_failure_is_retried_next_tick() {
        let mut backend = backend();
        backend.allocation_limit = Some(16);
        let mut raytracer = Raytracer::new(enabled(false));
        let scene = scene();

        assert!(raytracer
            .update(&mut backend, &scene, &TARGET, &camera())
            .is_err());

        backend.allocation_limit = None;
        let outcome = raytracer
            .update(&mut backend, &scene, &TARGET, &camera())
            .unwrap();
        assert!(matches!(
            outcome,
            TickOutcome::Rendered {
                reflattened: true,
                dispatch: DispatchOutcome::Dispatched { .. }
            }
        ));
    }

    #[test]
    fn settings_reach_the_kernel() {
        let mut backend = backend();
        let mut raytracer = Raytracer::new(enabled(true));
        raytracer.settings_mut().max_bounces = 2;
        raytracer.settings_mut().reflection_ray_count = 16;

        raytracer
            .update(&mut backend, &scene(), &TARGET, &camera())
            .unwrap();

        assert_eq!(backend.uniforms().max_bounces, 2);
        assert_eq!(backend.uniforms().reflection_ray_count, 16);
        assert_eq!(
            backend.uniforms().ambient_color,
            raytracer.settings().ambient_color.to_array()
        );
    }
}
