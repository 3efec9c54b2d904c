pub mod config_engine;
pub mod flatten;
/// Host entry point
pub mod raytracer;
pub mod save_states;
pub mod scene;
pub mod settings;
