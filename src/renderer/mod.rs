pub mod compute_backend;
pub mod config_renderer;
pub mod dispatch_driver;
pub mod headless_backend;
pub mod scene_buffer_manager;
pub mod shader_interfaces;
#[cfg(feature = "vulkan")]
pub mod vulkan_backend;
