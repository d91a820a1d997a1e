//! MTL material library import.

use crate::AssetError;
use meshview_common::{Material, TextureSlot};
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Materials keyed by name, in deterministic order.
pub type MaterialLibrary = BTreeMap<String, Material>;

/// Load and parse an MTL file.
pub fn load_mtl(path: impl AsRef<Path>) -> Result<MaterialLibrary, AssetError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| AssetError::io(path, e))?;
    let materials = parse_mtl(std::io::BufReader::new(file)).map_err(|e| e.with_path(path))?;
    tracing::info!(
        path = %path.display(),
        materials = materials.len(),
        "loaded material library"
    );
    Ok(materials)
}

/// Parse MTL records from any buffered reader.
///
/// Only reading can fail; malformed or unknown records are skipped.
pub fn parse_mtl<R: BufRead>(reader: R) -> Result<MaterialLibrary, AssetError> {
    let mut materials = MaterialLibrary::new();
    let mut current: Option<String> = None;

    for line in crate::text_lines(reader) {
        let line = line.map_err(|e| AssetError::io(PathBuf::new(), e))?;
        let line = line.trim();
        let Some(keyword) = line.split_whitespace().next() else {
            continue;
        };
        let rest = line[keyword.len()..].trim();

        if keyword == "newmtl" {
            if rest.is_empty() {
                tracing::debug!("skipping newmtl without a name");
                current = None;
                continue;
            }
            materials.insert(rest.to_string(), Material::new(rest));
            current = Some(rest.to_string());
            continue;
        }

        let Some(slot) = map_slot(keyword) else {
            continue;
        };
        let Some(material) = current.as_ref().and_then(|name| materials.get_mut(name)) else {
            continue;
        };
        if let Some(path) = map_path(rest) {
            material.set_map(slot, path);
        }
    }

    Ok(materials)
}

fn map_slot(keyword: &str) -> Option<TextureSlot> {
    match keyword {
        "map_Kd" => Some(TextureSlot::Diffuse),
        "map_Bump" | "map_bump" | "bump" | "norm" => Some(TextureSlot::Normal),
        "map_Ks" => Some(TextureSlot::Specular),
        "map_Pr" => Some(TextureSlot::Roughness),
        _ => None,
    }
}

/// The file path of a map record; option flags like `-bm 1.0` precede it.
fn map_path(rest: &str) -> Option<&str> {
    if rest.is_empty() {
        None
    } else if rest.starts_with('-') {
        rest.split_whitespace().last()
    } else {
        Some(rest)
    }
}
