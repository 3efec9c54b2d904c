use anyhow::Context;
use csg_raytrace::{
    config::{DEFAULT_LOG_LEVEL, DEFAULT_RESOLUTION, ENGINE_NAME, ENGINE_VERSION},
    engine::{
        config_engine::{
            DEFAULT_CAMERA_POSITION, DEFAULT_FAR_PLANE, DEFAULT_FOV_Y_DEGREES, DEFAULT_NEAR_PLANE,
            LOCAL_STORAGE_DIR,
        },
        raytracer::{CameraParams, Raytracer},
        save_states::{load_state_scene, load_state_settings, save_state_scene, save_state_settings},
        scene::{
            light::Light, material::Material, operation::BooleanOp, scene_node::SceneNode, Scene,
        },
        settings::RaytraceSettings,
    },
    helper::{
        error_chain::{log_error_chain, unwrap_or_report},
        logger::ConsoleLogger,
    },
    renderer::{
        config_renderer::DEFAULT_THREAD_GROUP_SIZE,
        headless_backend::{HeadlessBackend, HeadlessTarget},
    },
};
use glam::{Mat4, Vec3, Vec4};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use std::path::Path;

const DEMO_TICK_COUNT: usize = 3;

fn main() {
    if let Err(e) = ConsoleLogger::init(DEFAULT_LOG_LEVEL) {
        eprintln!("failed to initialize logger: {}", e);
    }
    info!("{} v{}", ENGINE_NAME, ENGINE_VERSION);

    unwrap_or_report(run(Path::new(LOCAL_STORAGE_DIR)), "raytracer demo");
}

/// Renders a few ticks of the saved (or demo) scene with save states kept in `storage_dir`
fn run(storage_dir: &Path) -> anyhow::Result<()> {
    let stored_settings = load_settings(storage_dir);
    let settings = runtime_settings(&stored_settings);
    let scene = load_scene(storage_dir)?;

    for warning in scene.validate() {
        warn!("scene authoring problem: {}", warning);
    }

    let mut backend =
        HeadlessBackend::new(&settings.kernel_entry_point, DEFAULT_THREAD_GROUP_SIZE);
    let target = HeadlessTarget {
        extent: DEFAULT_RESOLUTION,
    };
    let camera = demo_camera(DEFAULT_RESOLUTION);

    let mut raytracer = Raytracer::new(settings);
    raytracer.set_render_enable(true);

    for tick in 0..DEMO_TICK_COUNT {
        match raytracer.update(&mut backend, &scene, &target, &camera) {
            Ok(outcome) => info!("tick {}: {:?}", tick, outcome),
            Err(e) => log_error_chain(&e, "render tick"),
        }
    }

    let uniforms = backend.uniforms();
    info!(
        "last dispatch: {} primitives, {} materials, {} lights, {} buffer allocations",
        uniforms.primitive_count,
        uniforms.material_count,
        uniforms.light_count,
        backend.allocation_count()
    );

    raytracer.teardown(&mut backend);
    save_state_settings(storage_dir, &stored_settings).context("saving raytrace settings")?;
    Ok(())
}

/// Env overrides only apply to this run. The stored settings are what gets saved on exit.
fn runtime_settings(stored: &RaytraceSettings) -> RaytraceSettings {
    stored.clone().with_env_overrides()
}

fn load_settings(storage_dir: &Path) -> RaytraceSettings {
    match load_state_settings(storage_dir) {
        Ok(settings) => settings,
        Err(e) => {
            if !e.is_not_found() {
                warn!("failed to load settings, using defaults: {}", e);
            }
            RaytraceSettings::default()
        }
    }
}

/// Loads the saved scene, or builds and saves the demo scene if nothing was saved yet
fn load_scene(storage_dir: &Path) -> anyhow::Result<Scene> {
    match load_state_scene(storage_dir) {
        Ok(scene) => {
            info!("loaded scene with {} top-level nodes", scene.nodes.len());
            Ok(scene)
        }
        Err(e) => {
            if e.is_not_found() {
                info!("no saved scene, building demo scene");
            } else {
                warn!("failed to load saved scene, building demo scene: {}", e);
            }
            let scene = demo_scene();
            save_state_scene(storage_dir, &scene).context("saving demo scene")?;
            Ok(scene)
        }
    }
}

fn demo_scene() -> Scene {
    let red = Material::with_albedo(Vec4::new(0.9, 0.2, 0.2, 1.));
    let mirror = Material {
        roughness: 0.,
        metallic: 1.,
        ..Default::default()
    };

    let blob = SceneNode::boolean(
        "blob",
        BooleanOp::Union,
        0.4,
        [
            SceneNode::unit_sphere("left", Vec3::new(-0.6, 1., 0.)),
            SceneNode::unit_sphere("right", Vec3::new(0.6, 1., 0.)),
        ],
    )
    .with_material(red);

    let carved = SceneNode::boolean(
        "carved",
        BooleanOp::Difference,
        0.,
        [
            SceneNode::sphere("ball", Vec3::new(3., 1., 0.), 1.),
            SceneNode::plane("cut", Vec3::Y, Vec3::new(3., 1.2, 0.)).single_sided(),
        ],
    )
    .with_material(mirror);

    let mut scene = Scene::new();
    scene
        .push_node(SceneNode::plane("ground", Vec3::Y, Vec3::ZERO))
        .push_node(blob)
        .push_node(carved)
        .push_light(Light {
            intensity: 4.,
            range: 20.,
            ..Light::new(Vec3::new(2., 6., -3.))
        });
    scene
}

fn demo_camera(resolution: [u32; 2]) -> CameraParams {
    let aspect_ratio = resolution[0] as f32 / resolution[1].max(1) as f32;
    let projection = Mat4::perspective_rh(
        DEFAULT_FOV_Y_DEGREES.to_radians(),
        aspect_ratio,
        DEFAULT_NEAR_PLANE,
        DEFAULT_FAR_PLANE,
    );
    let view = Mat4::look_at_rh(DEFAULT_CAMERA_POSITION, Vec3::new(0., 1., 0.), Vec3::Y);

    CameraParams {
        resolution,
        inverse_projection: projection.inverse(),
        inverse_view: view.inverse(),
        position: DEFAULT_CAMERA_POSITION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csg_raytrace::{config::ENV, engine::config_engine::DEFAULT_MAX_BOUNCES};
    use std::env;

    #[test]
    fn env_overrides_are_not_saved() {
        let dir = tempfile::tempdir().unwrap();

        // only this test touches this variable in the binary's tests
        env::set_var(ENV::MAX_BOUNCES, "1");
        let stored = load_settings(dir.path());
        let overridden = runtime_settings(&stored);
        let res = run(dir.path());
        env::remove_var(ENV::MAX_BOUNCES);

        res.unwrap();
        assert_eq!(overridden.max_bounces, 1);
        assert_eq!(stored.max_bounces, DEFAULT_MAX_BOUNCES);

        let saved = load_state_settings(dir.path()).unwrap();
        assert_eq!(saved.max_bounces, DEFAULT_MAX_BOUNCES);
        assert_eq!(saved, RaytraceSettings::default());
    }

    #[test]
    fn saved_settings_survive_a_run() {
        let dir = tempfile::tempdir().unwrap();
        let stored = RaytraceSettings {
            reflection_ray_count: 2,
            ..Default::default()
        };
        save_state_settings(dir.path(), &stored).unwrap();

        run(dir.path()).unwrap();

        assert_eq!(load_state_settings(dir.path()).unwrap(), stored);
        assert!(load_state_scene(dir.path()).is_ok());
    }
}
