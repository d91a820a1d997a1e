use crate::backend::{MeshHandle, TextureHandle, UniformKind};

/// Errors raised by the renderer and its backends.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("shader compilation failed:\n{0}")]
    ShaderCompile(String),
    #[error("pipeline creation failed:\n{0}")]
    PipelineCreation(String),
    #[error("GPU resource error: {0}")]
    Resource(String),
    #[error("uniform not found: {0}")]
    UniformNotFound(String),
    #[error("uniform {name} is {expected}, got {actual}")]
    UniformTypeMismatch {
        name: String,
        expected: UniformKind,
        actual: UniformKind,
    },
    #[error("scene object not found: {0}")]
    ObjectNotFound(String),
    #[error("unknown mesh handle {0:?}")]
    UnknownMesh(MeshHandle),
    #[error("unknown texture handle {0:?}")]
    UnknownTexture(TextureHandle),
    #[error("surface error: {0}")]
    Surface(String),
}

impl RenderError {
    /// Name or handle lookups that fail without leaving the backend in a bad state.
    /// The frame loop skips the offending step and carries on.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            RenderError::UniformNotFound(_)
                | RenderError::UniformTypeMismatch { .. }
                | RenderError::ObjectNotFound(_)
                | RenderError::UnknownMesh(_)
                | RenderError::UnknownTexture(_)
        )
    }
}
