//! Flattens a tree of signed-distance primitives and boolean operations into fixed-size gpu
//! records and drives a compute raytracing kernel over them.

pub mod config;
pub mod engine;
pub mod helper;
pub mod renderer;
