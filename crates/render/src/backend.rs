//! The seam between the frame loop and a concrete graphics API.

use crate::error::RenderError;
use glam::{Mat4, Vec3, Vec4};
use meshview_assets::TextureImage;
use meshview_common::{MeshPrimitive, TextureSlot};
use std::fmt;

/// Backend-owned mesh buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u64);

/// Backend-owned texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// A typed value for a named shader uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat4(_) => UniformKind::Mat4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Int,
    Float,
    Vec3,
    Vec4,
    Mat4,
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniformKind::Int => "i32",
            UniformKind::Float => "f32",
            UniformKind::Vec3 => "vec3<f32>",
            UniformKind::Vec4 => "vec4<f32>",
            UniformKind::Mat4 => "mat4x4<f32>",
        };
        f.write_str(name)
    }
}

/// One texture per material slot, bound to sequential slots in [`TextureSlot::ALL`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSet {
    pub diffuse: TextureHandle,
    pub normal: TextureHandle,
    pub specular: TextureHandle,
    pub roughness: TextureHandle,
}

impl TextureSet {
    /// The same texture in every slot.
    pub fn uniform(texture: TextureHandle) -> Self {
        Self {
            diffuse: texture,
            normal: texture,
            specular: texture,
            roughness: texture,
        }
    }

    pub fn get(&self, slot: TextureSlot) -> TextureHandle {
        match slot {
            TextureSlot::Diffuse => self.diffuse,
            TextureSlot::Normal => self.normal,
            TextureSlot::Specular => self.specular,
            TextureSlot::Roughness => self.roughness,
        }
    }

    pub fn set(&mut self, slot: TextureSlot, texture: TextureHandle) {
        match slot {
            TextureSlot::Diffuse => self.diffuse = texture,
            TextureSlot::Normal => self.normal = texture,
            TextureSlot::Specular => self.specular = texture,
            TextureSlot::Roughness => self.roughness = texture,
        }
    }

    pub fn as_array(&self) -> [TextureHandle; 4] {
        TextureSlot::ALL.map(|slot| self.get(slot))
    }
}

/// How a texture's texels are interpreted when sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Color images, decoded from sRGB to linear by the sampler.
    Srgb,
    /// Data maps (normals, specular, roughness), sampled as stored.
    Linear,
}

impl ColorSpace {
    pub fn for_slot(slot: TextureSlot) -> Self {
        match slot {
            TextureSlot::Diffuse => ColorSpace::Srgb,
            TextureSlot::Normal | TextureSlot::Specular | TextureSlot::Roughness => {
                ColorSpace::Linear
            }
        }
    }
}

/// Everything a backend needs to issue one indexed draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub mesh: MeshHandle,
    pub index_count: u32,
    pub textures: TextureSet,
    pub model: Mat4,
}

/// A graphics API the frame loop can drive.
///
/// Calls arrive once per frame in the order `clear`, `bind_program`, `set_uniform`*,
/// `draw_indexed`*, `present`. Uploads happen outside that sequence.
pub trait RenderBackend {
    fn upload_mesh(&mut self, label: &str, mesh: &MeshPrimitive) -> Result<MeshHandle, RenderError>;

    fn upload_texture(
        &mut self,
        label: &str,
        image: &TextureImage,
        color_space: ColorSpace,
    ) -> Result<TextureHandle, RenderError>;

    /// Begin a frame cleared to `color`.
    fn clear(&mut self, color: [f32; 4]) -> Result<(), RenderError>;

    /// Make the shading program current.
    fn bind_program(&mut self) -> Result<(), RenderError>;

    /// Set a named uniform. Unknown names yield [`RenderError::UniformNotFound`].
    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), RenderError>;

    fn draw_indexed(&mut self, draw: &DrawCall) -> Result<(), RenderError>;

    /// Finish and display the frame.
    fn present(&mut self) -> Result<(), RenderError>;
}
