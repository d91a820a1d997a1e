//! A backend that records calls instead of drawing.

use crate::backend::{ColorSpace, DrawCall, MeshHandle, RenderBackend, TextureHandle, UniformKind, UniformValue};
use crate::error::RenderError;
use meshview_assets::TextureImage;
use meshview_common::MeshPrimitive;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    UploadMesh(String),
    UploadTexture(String),
    Clear([f32; 4]),
    BindProgram,
    SetUniform(String),
    Draw(MeshHandle),
    Present,
}

pub struct RecordingBackend {
    pub calls: Vec<Call>,
    pub uniforms: HashMap<String, UniformKind>,
    textures: HashMap<String, (TextureHandle, ColorSpace)>,
    next_id: u64,
}

impl RecordingBackend {
    /// Knows the `projection` and `view` uniforms.
    pub fn new() -> Self {
        let uniforms = [("projection", UniformKind::Mat4), ("view", UniformKind::Mat4)]
            .into_iter()
            .map(|(n, k)| (n.to_string(), k))
            .collect();
        Self {
            calls: Vec::new(),
            uniforms,
            textures: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn texture_handle(&self, label: &str) -> Option<TextureHandle> {
        self.textures.get(label).map(|&(handle, _)| handle)
    }

    pub fn texture_color_space(&self, label: &str) -> Option<ColorSpace> {
        self.textures.get(label).map(|&(_, space)| space)
    }

    /// Calls made since the last upload, i.e. the per-frame sequence.
    pub fn frame_calls(&self) -> Vec<Call> {
        self.calls
            .iter()
            .filter(|c| !matches!(c, Call::UploadMesh(_) | Call::UploadTexture(_)))
            .cloned()
            .collect()
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl RenderBackend for RecordingBackend {
    fn upload_mesh(&mut self, label: &str, _mesh: &MeshPrimitive) -> Result<MeshHandle, RenderError> {
        self.calls.push(Call::UploadMesh(label.to_string()));
        Ok(MeshHandle(self.next()))
    }

    fn upload_texture(
        &mut self,
        label: &str,
        _image: &TextureImage,
        color_space: ColorSpace,
    ) -> Result<TextureHandle, RenderError> {
        self.calls.push(Call::UploadTexture(label.to_string()));
        let handle = TextureHandle(self.next());
        self.textures.insert(label.to_string(), (handle, color_space));
        Ok(handle)
    }

    fn clear(&mut self, color: [f32; 4]) -> Result<(), RenderError> {
        self.calls.push(Call::Clear(color));
        Ok(())
    }

    fn bind_program(&mut self) -> Result<(), RenderError> {
        self.calls.push(Call::BindProgram);
        Ok(())
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), RenderError> {
        match self.uniforms.get(name) {
            None => Err(RenderError::UniformNotFound(name.to_string())),
            Some(&expected) if expected != value.kind() => Err(RenderError::UniformTypeMismatch {
                name: name.to_string(),
                expected,
                actual: value.kind(),
            }),
            Some(_) => {
                self.calls.push(Call::SetUniform(name.to_string()));
                Ok(())
            }
        }
    }

    fn draw_indexed(&mut self, draw: &DrawCall) -> Result<(), RenderError> {
        self.calls.push(Call::Draw(draw.mesh));
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.calls.push(Call::Present);
        Ok(())
    }
}
