//! Camera, movement and frame submission for meshview.
//!
//! Graphics APIs plug in through [`RenderBackend`]; everything here is
//! API-agnostic and can be driven by a recording backend in tests.
//!
//! # Invariants
//! - Camera yaw stays in [0, 360) and pitch in [-89, 89]; front/right/up stay orthonormal.
//! - Each frame submits clear, bind, uniforms, draws, present, in that order.
//! - A missing uniform or scene object never aborts a frame.

pub mod backend;
pub mod camera;
pub mod clock;
pub mod error;
pub mod frame;
pub mod movement;
pub mod renderer;
pub mod scene;

#[cfg(test)]
mod testing;

pub use backend::{
    ColorSpace, DrawCall, MeshHandle, RenderBackend, TextureHandle, TextureSet, UniformKind, UniformValue,
};
pub use camera::{Camera, PITCH_LIMIT, Projection};
pub use clock::FrameClock;
pub use error::RenderError;
pub use frame::{FrameLoop, FrameOutcome, FrameReport};
pub use movement::MovementController;
pub use renderer::{DrawStats, Lighting, Renderer};
pub use scene::{DEFAULT_MATERIAL, Scene, SceneObject};

pub fn crate_info() -> &'static str {
    "meshview-render v0.1.0"
}
