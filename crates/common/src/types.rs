use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Model matrix applying scale, then rotation, then translation.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// A fully resolved mesh vertex: position, texture coordinate and normal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex {
    /// Bitwise identity used for deduplication.
    ///
    /// `+0.0` and `-0.0` map to the same key so that values which compare equal
    /// always share an index.
    pub fn key(&self) -> VertexKey {
        let mut bits = [0u32; 8];
        let values = self
            .position
            .iter()
            .chain(self.uv.iter())
            .chain(self.normal.iter());
        for (slot, value) in bits.iter_mut().zip(values) {
            *slot = if *value == 0.0 { 0 } else { value.to_bits() };
        }
        VertexKey(bits)
    }
}

/// Hashable value-equality key of a [`Vertex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexKey([u32; 8]);

/// Indexed triangle mesh with attributes stored as parallel flat arrays.
///
/// # Invariants
/// - `positions.len() / 3 == normals.len() / 3 == uvs.len() / 2` (one entry per vertex).
/// - `indices.len()` is a multiple of 3.
/// - Every index is smaller than [`MeshPrimitive::vertex_count`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshPrimitive {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshPrimitive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vertex's attributes and return its index.
    pub fn push_vertex(&mut self, vertex: &Vertex) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions.extend_from_slice(&vertex.position);
        self.uvs.extend_from_slice(&vertex.uv);
        self.normals.extend_from_slice(&vertex.normal);
        index
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Read back vertex `i`, or `None` if out of range.
    pub fn vertex(&self, i: usize) -> Option<Vertex> {
        if i >= self.vertex_count() {
            return None;
        }
        let p = &self.positions[i * 3..i * 3 + 3];
        let t = &self.uvs[i * 2..i * 2 + 2];
        let n = &self.normals[i * 3..i * 3 + 3];
        Some(Vertex {
            position: [p[0], p[1], p[2]],
            uv: [t[0], t[1]],
            normal: [n[0], n[1], n[2]],
        })
    }

    /// Check the structural invariants listed on the type.
    pub fn is_well_formed(&self) -> bool {
        let count = self.vertex_count();
        self.positions.len() % 3 == 0
            && self.normals.len() == count * 3
            && self.uvs.len() == count * 2
            && self.indices.len() % 3 == 0
            && self.indices.iter().all(|&i| (i as usize) < count)
    }
}

/// Texture map slots a material can reference, in binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TextureSlot {
    Diffuse,
    Normal,
    Specular,
    Roughness,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 4] = [
        TextureSlot::Diffuse,
        TextureSlot::Normal,
        TextureSlot::Specular,
        TextureSlot::Roughness,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TextureSlot::Diffuse => "diffuse",
            TextureSlot::Normal => "normal",
            TextureSlot::Specular => "specular",
            TextureSlot::Roughness => "roughness",
        }
    }
}

/// A named material with optional texture map paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub diffuse_map: Option<PathBuf>,
    pub normal_map: Option<PathBuf>,
    pub specular_map: Option<PathBuf>,
    pub roughness_map: Option<PathBuf>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn map(&self, slot: TextureSlot) -> Option<&Path> {
        match slot {
            TextureSlot::Diffuse => self.diffuse_map.as_deref(),
            TextureSlot::Normal => self.normal_map.as_deref(),
            TextureSlot::Specular => self.specular_map.as_deref(),
            TextureSlot::Roughness => self.roughness_map.as_deref(),
        }
    }

    pub fn set_map(&mut self, slot: TextureSlot, path: impl Into<PathBuf>) {
        let path = Some(path.into());
        match slot {
            TextureSlot::Diffuse => self.diffuse_map = path,
            TextureSlot::Normal => self.normal_map = path,
            TextureSlot::Specular => self.specular_map = path,
            TextureSlot::Roughness => self.roughness_map = path,
        }
    }
}

/// How discrete movement actions translate into camera displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraMode {
    /// Spectator camera: forward follows the full 3D view direction, ascend/descend allowed.
    #[default]
    FreeFly,
    /// Character-style camera: forward is flattened onto the ground plane, no vertical motion.
    Walk,
}

impl CameraMode {
    pub fn toggled(self) -> Self {
        match self {
            CameraMode::FreeFly => CameraMode::Walk,
            CameraMode::Walk => CameraMode::FreeFly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32) -> Vertex {
        Vertex {
            position: [x, 1.0, 2.0],
            uv: [0.5, 0.5],
            normal: [0.0, 1.0, 0.0],
        }
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn transform_matrix_scales_before_translating() {
        let t = Transform {
            position: Vec3::new(0.0, -1.0, -4.0),
            scale: Vec3::splat(2.0),
            ..Transform::default()
        };
        let p = t.matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(p, Vec3::new(2.0, -1.0, -4.0));
    }

    #[test]
    fn signed_zero_shares_key() {
        let a = vertex(0.0);
        let b = vertex(-0.0);
        assert_eq!(a.key(), b.key());
        assert_ne!(vertex(1.0).key(), a.key());
    }

    #[test]
    fn push_and_read_back_vertex() {
        let mut mesh = MeshPrimitive::new();
        let v = vertex(3.0);
        assert_eq!(mesh.push_vertex(&v), 0);
        assert_eq!(mesh.push_vertex(&vertex(4.0)), 1);
        assert_eq!(mesh.vertex_count(), 2);
        assert_eq!(mesh.vertex(0), Some(v));
        assert_eq!(mesh.vertex(2), None);
    }

    #[test]
    fn well_formed_rejects_out_of_range_index() {
        let mut mesh = MeshPrimitive::new();
        mesh.push_vertex(&vertex(0.0));
        mesh.indices = vec![0, 0, 0];
        assert!(mesh.is_well_formed());
        mesh.indices = vec![0, 0, 1];
        assert!(!mesh.is_well_formed());
        mesh.indices = vec![0, 0];
        assert!(!mesh.is_well_formed());
    }

    #[test]
    fn material_maps_by_slot() {
        let mut mat = Material::new("Body");
        mat.set_map(TextureSlot::Specular, "spec.png");
        assert_eq!(mat.map(TextureSlot::Specular), Some(Path::new("spec.png")));
        assert_eq!(mat.map(TextureSlot::Diffuse), None);
    }

    #[test]
    fn camera_mode_toggles() {
        assert_eq!(CameraMode::default(), CameraMode::FreeFly);
        assert_eq!(CameraMode::FreeFly.toggled(), CameraMode::Walk);
        assert_eq!(CameraMode::Walk.toggled(), CameraMode::FreeFly);
    }
}
