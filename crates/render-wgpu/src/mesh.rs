use bytemuck::{Pod, Zeroable};
use meshview_common::MeshPrimitive;

/// Interleaved vertex as laid out in the GPU vertex buffer: 32 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl GpuVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x2,
        2 => Float32x3,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Interleave a mesh's parallel attribute arrays.
///
/// Missing trailing UVs or normals read as zero.
pub fn interleave(mesh: &MeshPrimitive) -> Vec<GpuVertex> {
    (0..mesh.vertex_count())
        .map(|i| {
            let read = |data: &[f32], n: usize, out: &mut [f32]| {
                if let Some(src) = data.get(i * n..i * n + n) {
                    out.copy_from_slice(src);
                }
            };
            let mut v = GpuVertex::zeroed();
            read(&mesh.positions, 3, &mut v.position);
            read(&mesh.uvs, 2, &mut v.uv);
            read(&mesh.normals, 3, &mut v.normal);
            v
        })
        .collect()
}

/// Vertex and index buffers of an uploaded mesh.
#[derive(Debug)]
pub(crate) struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshview_common::Vertex;

    #[test]
    fn stride_is_32_bytes() {
        assert_eq!(std::mem::size_of::<GpuVertex>(), 32);
        assert_eq!(GpuVertex::layout().array_stride, 32);
        let offsets: Vec<_> = GpuVertex::ATTRIBUTES.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, [0, 12, 20]);
    }

    #[test]
    fn interleaves_in_vertex_order() {
        let mut mesh = MeshPrimitive::new();
        let a = Vertex {
            position: [1.0, 2.0, 3.0],
            uv: [0.25, 0.75],
            normal: [0.0, 0.0, 1.0],
        };
        let b = Vertex {
            position: [4.0, 5.0, 6.0],
            uv: [1.0, 0.0],
            normal: [0.0, 1.0, 0.0],
        };
        mesh.push_vertex(&a);
        mesh.push_vertex(&b);

        let out = interleave(&mesh);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].position, b.position);
        assert_eq!(out[0].uv, a.uv);
        assert_eq!(out[1].normal, b.normal);
    }

    #[test]
    fn short_attribute_arrays_read_as_zero() {
        let mesh = MeshPrimitive {
            positions: vec![1.0, 1.0, 1.0],
            ..MeshPrimitive::default()
        };
        let out = interleave(&mesh);
        assert_eq!(out[0].uv, [0.0, 0.0]);
        assert_eq!(out[0].normal, [0.0; 3]);
    }
}
