//! Asset import: Wavefront OBJ meshes, MTL material libraries and textures.
//!
//! Meshes come out as deduplicated, indexed [`MeshPrimitive`]s ready for GPU upload.
//! Material and texture problems never fail a model load: missing maps resolve to a
//! placeholder texture and a missing material library leaves the model untextured.
//!
//! # Invariants
//! - Emitted index count is a multiple of 3 and every index is in range.
//! - Face references to undefined attributes are a parse error, never an out-of-bounds read.

pub mod model;
pub mod mtl;
pub mod obj;
pub mod texture;

use std::io::BufRead;
use std::path::{Path, PathBuf};

pub use meshview_common::{Material, MeshPrimitive, TextureSlot};
pub use model::{ModelAsset, load_model};
pub use mtl::{MaterialLibrary, load_mtl, parse_mtl};
pub use obj::{ObjData, load_obj, parse_obj};
pub use texture::{LoadedTexture, TextureImage, load_texture, load_texture_or_placeholder};

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error in {} line {line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("failed to decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl AssetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach a file path to an error produced while parsing an anonymous reader.
    pub(crate) fn with_path(self, file: &Path) -> Self {
        match self {
            Self::Io { path, source } if path.as_os_str().is_empty() => Self::Io {
                path: file.to_path_buf(),
                source,
            },
            Self::Parse {
                path,
                line,
                message,
            } if path.as_os_str().is_empty() => Self::Parse {
                path: file.to_path_buf(),
                line,
                message,
            },
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Lines of a text asset, decoded lossily so stray non-UTF-8 bytes (Latin-1 comments,
/// group names) never fail a load on their own.
pub(crate) fn text_lines<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = std::io::Result<String>> {
    reader
        .split(b'\n')
        .map(|line| line.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

pub fn crate_info() -> &'static str {
    "meshview-assets v0.1.0"
}
