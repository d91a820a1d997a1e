//! wgpu render backend for meshview.
//!
//! Draws textured, indexed meshes with a single pipeline. Camera and lighting
//! live in a named uniform block at group 0; per-object transforms use a
//! dynamic-offset buffer at group 1; material textures are bound at group 2.
//!
//! # Invariants
//! - Uniform blocks follow WGSL uniform address-space alignment.
//! - A lost or outdated surface is reconfigured and the frame skipped.

mod gpu;
mod mesh;
mod shaders;
mod uniforms;

pub use gpu::{BackendOptions, WgpuBackend};
pub use mesh::{GpuVertex, interleave};
pub use shaders::{MESH_SHADER, ShaderSource};
pub use uniforms::{UniformBlock, UniformField, UniformLayout};

pub fn crate_info() -> &'static str {
    "meshview-render-wgpu v0.1.0"
}
