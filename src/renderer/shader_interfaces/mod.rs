pub mod binding_names;
pub mod light_buffer;
pub mod material_buffer;
pub mod primitive_buffer;
pub mod uniform_buffers;
