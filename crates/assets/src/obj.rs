//! Wavefront OBJ mesh import.
//!
//! Supported records: `v`, `vn`, `vt`, `f` (with `p/t/n` references) and `mtllib`.
//! Everything else, including comments and blank lines, is skipped.
//!
//! Attribute tables are kept in file order and are never deduplicated; deduplication
//! happens on fully resolved [`Vertex`] values so the output holds one entry per
//! distinct (position, uv, normal) combination.

use crate::AssetError;
use meshview_common::{MeshPrimitive, Vertex, VertexKey};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Result of parsing an OBJ document.
#[derive(Debug, Clone, Default)]
pub struct ObjData {
    pub mesh: MeshPrimitive,
    /// Material libraries named by `mtllib` records, in file order.
    pub material_libs: Vec<String>,
}

/// Load and parse an OBJ file.
pub fn load_obj(path: impl AsRef<Path>) -> Result<ObjData, AssetError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| AssetError::io(path, e))?;
    let data = parse_obj(std::io::BufReader::new(file)).map_err(|e| e.with_path(path))?;
    tracing::info!(
        path = %path.display(),
        vertices = data.mesh.vertex_count(),
        triangles = data.mesh.triangle_count(),
        "loaded mesh"
    );
    Ok(data)
}

/// Parse OBJ records from any buffered reader.
pub fn parse_obj<R: BufRead>(reader: R) -> Result<ObjData, AssetError> {
    let mut builder = MeshBuilder::default();
    for (number, line) in crate::text_lines(reader).enumerate() {
        let line = line.map_err(|e| AssetError::io(PathBuf::new(), e))?;
        builder
            .parse_line(&line)
            .map_err(|message| AssetError::Parse {
                path: PathBuf::new(),
                line: number + 1,
                message,
            })?;
    }
    Ok(builder.finish())
}

#[derive(Default)]
struct MeshBuilder {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    lookup: HashMap<VertexKey, u32>,
    mesh: MeshPrimitive,
    material_libs: Vec<String>,
    corners: Vec<u32>,
}

impl MeshBuilder {
    fn parse_line(&mut self, line: &str) -> Result<(), String> {
        let line = line.trim();
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            return Ok(());
        };

        match keyword {
            "v" => {
                let [x, y, z] = parse_floats::<3>(&mut tokens, keyword)?;
                self.positions.push([x, y, z]);
            }
            "vn" => {
                let [x, y, z] = parse_floats::<3>(&mut tokens, keyword)?;
                self.normals.push([x, y, z]);
            }
            "vt" => {
                let [u] = parse_floats::<1>(&mut tokens, keyword)?;
                let v = match tokens.next() {
                    Some(token) => parse_float(token)?,
                    None => 0.0,
                };
                self.uvs.push([u, v]);
            }
            "f" => self.add_face(tokens)?,
            "mtllib" => {
                // One record may name several libraries, separated by whitespace.
                self.material_libs.extend(tokens.map(str::to_string));
            }
            _ => {}
        }
        Ok(())
    }

    fn add_face<'a>(&mut self, tokens: impl Iterator<Item = &'a str>) -> Result<(), String> {
        self.corners.clear();
        for token in tokens {
            let vertex = self.resolve(token)?;
            let index = self.index_of(vertex);
            self.corners.push(index);
        }

        if self.corners.len() < 3 {
            return Err(format!(
                "face has {} vertices, at least 3 are required",
                self.corners.len()
            ));
        }

        // Fan triangulation; a triangle yields exactly its own three corners.
        let first = self.corners[0];
        for pair in self.corners[1..].windows(2) {
            self.mesh.indices.extend_from_slice(&[first, pair[0], pair[1]]);
        }
        Ok(())
    }

    fn resolve(&self, reference: &str) -> Result<Vertex, String> {
        let mut parts = reference.split('/');
        let (Some(p), Some(t), Some(n), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(format!(
                "face vertex '{reference}' must have the form position/uv/normal"
            ));
        };

        let p = lookup(&self.positions, p, "position")?;
        let t = lookup(&self.uvs, t, "uv")?;
        let n = lookup(&self.normals, n, "normal")?;
        Ok(Vertex {
            position: p,
            uv: t,
            normal: n,
        })
    }

    fn index_of(&mut self, vertex: Vertex) -> u32 {
        *self
            .lookup
            .entry(vertex.key())
            .or_insert_with(|| self.mesh.push_vertex(&vertex))
    }

    fn finish(self) -> ObjData {
        ObjData {
            mesh: self.mesh,
            material_libs: self.material_libs,
        }
    }
}

/// Resolve a 1-based (or negative, relative) OBJ index into `table`.
fn lookup<T: Copy>(table: &[T], token: &str, what: &str) -> Result<T, String> {
    if token.is_empty() {
        return Err(format!("missing {what} index"));
    }
    let raw: i64 = token
        .parse()
        .map_err(|_| format!("invalid {what} index '{token}'"))?;
    let len = table.len() as i64;
    let resolved = match raw {
        i if i > 0 && i <= len => i - 1,
        i if i < 0 && -i <= len => len + i,
        _ => {
            return Err(format!(
                "{what} index {raw} is out of range ({len} defined so far)"
            ));
        }
    };
    Ok(table[resolved as usize])
}

fn parse_float(token: &str) -> Result<f32, String> {
    token
        .parse()
        .map_err(|_| format!("invalid number '{token}'"))
}

fn parse_floats<const N: usize>(
    tokens: &mut std::str::SplitWhitespace<'_>,
    keyword: &str,
) -> Result<[f32; N], String> {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        let token = tokens
            .next()
            .ok_or_else(|| format!("'{keyword}' needs {N} components, found {i}"))?;
        *slot = parse_float(token)?;
    }
    Ok(out)
}
