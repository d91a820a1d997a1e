//! Named uniform blocks laid out with WGSL uniform address-space rules.

use meshview_render::{RenderError, UniformKind, UniformValue};

/// Byte size and alignment of a uniform member, per the WGSL spec.
fn size_align(kind: UniformKind) -> (usize, usize) {
    match kind {
        UniformKind::Int | UniformKind::Float => (4, 4),
        UniformKind::Vec3 => (12, 16),
        UniformKind::Vec4 => (16, 16),
        UniformKind::Mat4 => (64, 16),
    }
}

fn align_to(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    pub kind: UniformKind,
    pub offset: usize,
}

/// Member names, types and offsets of a uniform struct.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    size: usize,
}

impl UniformLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a member in declaration order.
    pub fn with(mut self, name: &str, kind: UniformKind) -> Self {
        let end = self.fields.last().map_or(0, |f| f.offset + size_align(f.kind).0);
        let (size, align) = size_align(kind);
        let offset = align_to(end, align);
        self.fields.push(UniformField {
            name: name.to_string(),
            kind,
            offset,
        });
        // Struct size rounds up to the largest member alignment, and uniform
        // structs are 16-byte aligned.
        self.size = align_to(offset + size, 16);
        self
    }

    /// The `Globals` struct of the built-in mesh shader.
    pub fn mesh_globals() -> Self {
        Self::new()
            .with("projection", UniformKind::Mat4)
            .with("view", UniformKind::Mat4)
            .with("light_dir", UniformKind::Vec3)
            .with("ambient", UniformKind::Float)
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// CPU copy of a uniform buffer, written by name.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    layout: UniformLayout,
    bytes: Vec<u8>,
    dirty: bool,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let bytes = vec![0; layout.size()];
        Self {
            layout,
            bytes,
            dirty: true,
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn set(&mut self, name: &str, value: UniformValue) -> Result<(), RenderError> {
        let field = self
            .layout
            .field(name)
            .ok_or_else(|| RenderError::UniformNotFound(name.to_string()))?;
        if field.kind != value.kind() {
            return Err(RenderError::UniformTypeMismatch {
                name: name.to_string(),
                expected: field.kind,
                actual: value.kind(),
            });
        }

        let offset = field.offset;
        match value {
            UniformValue::Int(v) => self.write(offset, bytemuck::bytes_of(&v)),
            UniformValue::Float(v) => self.write(offset, bytemuck::bytes_of(&v)),
            UniformValue::Vec3(v) => self.write(offset, bytemuck::cast_slice(&v.to_array())),
            UniformValue::Vec4(v) => self.write(offset, bytemuck::cast_slice(&v.to_array())),
            UniformValue::Mat4(m) => self.write(offset, bytemuck::cast_slice(&m.to_cols_array())),
        }
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) {
        let target = &mut self.bytes[offset..offset + data.len()];
        if target != data {
            target.copy_from_slice(data);
            self.dirty = true;
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Return the bytes if they changed since the last call.
    pub fn take_dirty(&mut self) -> Option<&[u8]> {
        if std::mem::take(&mut self.dirty) {
            Some(&self.bytes)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3, Vec4};

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn mesh_globals_offsets() {
        let layout = UniformLayout::mesh_globals();
        let offsets: Vec<_> = layout.fields().iter().map(|f| (f.name.as_str(), f.offset)).collect();
        assert_eq!(
            offsets,
            [("projection", 0), ("view", 64), ("light_dir", 128), ("ambient", 140)]
        );
        assert_eq!(layout.size(), 144);
    }

    #[test]
    fn vec3_after_scalar_is_realigned() {
        let layout = UniformLayout::new()
            .with("time", UniformKind::Float)
            .with("tint", UniformKind::Vec3)
            .with("frame", UniformKind::Int);
        assert_eq!(layout.field("tint").map(|f| f.offset), Some(16));
        assert_eq!(layout.field("frame").map(|f| f.offset), Some(28));
        assert_eq!(layout.size(), 32);
    }

    #[test]
    fn vec4_after_vec3_starts_on_next_16() {
        let layout = UniformLayout::new()
            .with("a", UniformKind::Vec3)
            .with("b", UniformKind::Vec4);
        assert_eq!(layout.field("b").map(|f| f.offset), Some(16));
        assert_eq!(layout.size(), 32);
    }

    #[test]
    fn set_writes_at_offset() {
        let mut block = UniformBlock::new(UniformLayout::mesh_globals());
        block.set("ambient", UniformValue::Float(0.5)).unwrap();
        block.set("light_dir", UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0))).unwrap();
        let floats = floats(block.bytes());
        assert_eq!(&floats[32..36], &[1.0, 2.0, 3.0, 0.5]);
    }

    #[test]
    fn matrices_are_column_major() {
        let mut block = UniformBlock::new(UniformLayout::mesh_globals());
        let m = Mat4::from_translation(Vec3::new(7.0, 8.0, 9.0));
        block.set("view", UniformValue::Mat4(m)).unwrap();
        let floats = floats(block.bytes());
        assert_eq!(&floats[16 + 12..16 + 15], &[7.0, 8.0, 9.0]);
    }

    #[test]
    fn unknown_and_mistyped_uniforms() {
        let mut block = UniformBlock::new(UniformLayout::mesh_globals());
        assert!(matches!(
            block.set("model", UniformValue::Mat4(Mat4::IDENTITY)),
            Err(RenderError::UniformNotFound(_))
        ));
        assert!(matches!(
            block.set("ambient", UniformValue::Vec4(Vec4::ONE)),
            Err(RenderError::UniformTypeMismatch { expected: UniformKind::Float, .. })
        ));
    }

    #[test]
    fn dirty_tracking() {
        let mut block = UniformBlock::new(UniformLayout::mesh_globals());
        assert!(block.take_dirty().is_some());
        assert!(block.take_dirty().is_none());
        block.set("ambient", UniformValue::Float(0.0)).unwrap();
        assert!(block.take_dirty().is_none());
        block.set("ambient", UniformValue::Float(0.3)).unwrap();
        assert!(block.take_dirty().is_some());
    }
}
