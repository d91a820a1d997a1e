//! Shared types for the meshview engine: mesh primitives, materials and configuration.

pub mod config;
pub mod types;

pub use config::{
    CameraConfig, ConfigError, EngineConfig, ModelConfig, MovementConfig, RenderConfig,
    WindowConfig,
};
pub use types::{
    CameraMode, Material, MeshPrimitive, TextureSlot, Transform, Vertex, VertexKey,
};

pub fn crate_info() -> &'static str {
    "meshview-common v0.1.0"
}
