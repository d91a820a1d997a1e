//! A mesh paired with its material library.

use crate::AssetError;
use crate::mtl::{MaterialLibrary, load_mtl};
use crate::obj::load_obj;
use crate::texture::{LoadedTexture, load_texture_or_placeholder};
use meshview_common::{Material, MeshPrimitive, TextureSlot};
use std::path::{Path, PathBuf};

/// An imported model: geometry plus whatever materials could be loaded.
#[derive(Debug, Clone)]
pub struct ModelAsset {
    pub name: String,
    pub mesh: MeshPrimitive,
    pub materials: MaterialLibrary,
    /// The material library that was actually read, if any.
    pub material_source: Option<PathBuf>,
    /// Base directory for relative texture paths.
    pub texture_dir: PathBuf,
}

impl ModelAsset {
    /// Full path of a material's map, resolved against [`ModelAsset::texture_dir`].
    pub fn texture_path(&self, material: &Material, slot: TextureSlot) -> Option<PathBuf> {
        material.map(slot).map(|p| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                self.texture_dir.join(p)
            }
        })
    }

    /// Load every slot of a material, in [`TextureSlot::ALL`] order, with placeholders
    /// for anything missing.
    pub fn load_material_textures(&self, material: &Material) -> [LoadedTexture; 4] {
        TextureSlot::ALL.map(|slot| {
            let path = self.texture_path(material, slot);
            load_texture_or_placeholder(path.as_deref(), slot, &material.name)
        })
    }
}

/// Load an OBJ and its material library.
///
/// The mesh must load; the material library is optional. It is looked up, in order,
/// at `mtl_path`, at each `mtllib` named by the OBJ, and next to the OBJ with an
/// `.mtl` extension. If none can be read the model has no materials and renders
/// with placeholder textures.
pub fn load_model(
    name: impl Into<String>,
    obj_path: impl AsRef<Path>,
    mtl_path: Option<&Path>,
) -> Result<ModelAsset, AssetError> {
    let name = name.into();
    let obj_path = obj_path.as_ref();
    let obj = load_obj(obj_path)?;
    let obj_dir = obj_path.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut candidates = Vec::new();
    if let Some(path) = mtl_path {
        candidates.push(path.to_path_buf());
    }
    candidates.extend(obj.material_libs.iter().map(|lib| obj_dir.join(lib)));
    candidates.push(obj_path.with_extension("mtl"));
    candidates.dedup();

    let mut materials = MaterialLibrary::new();
    let mut material_source = None;
    for candidate in &candidates {
        match load_mtl(candidate) {
            Ok(found) => {
                materials = found;
                material_source = Some(candidate.clone());
                break;
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(model = %name, path = %candidate.display(), "no material library here");
            }
            Err(e) => {
                tracing::warn!(model = %name, "failed to read material library: {e}");
            }
        }
    }
    if material_source.is_none() {
        tracing::warn!(model = %name, "no material library found, using placeholder textures");
    }

    let texture_dir = material_source
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or(obj_dir);

    Ok(ModelAsset {
        name,
        mesh: obj.mesh,
        materials,
        material_source,
        texture_dir,
    })
}
