//! PKG container codec
//!
//! A PKG archive is a flat sequence of `FILE` chunks behind a 4-byte magic.
//! Recognized chunk names are `shaders`, `offset` and `xrefs`; any other
//! name is a geometry mesh named after the chunk. PKG3 chunks carry an
//! explicit payload length, PKG2 chunks do not - their payloads are
//! self-terminating.

pub mod geometry;
pub mod mtx;
pub mod reader;
pub mod shaders;
pub mod topology;
pub mod vertex;
pub mod writer;
pub mod xref;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glam::Vec3;

use crate::error::Diagnostic;
use crate::scene::{CollapsedVariants, Mesh, ShaderSet, Xref};

pub use reader::{import_pkg, import_pkg_with_context, PkgReader};
pub use writer::{export_pkg, PkgWriter};

/// Magic for archives without per-chunk payload lengths.
pub const MAGIC_PKG2: [u8; 4] = *b"PKG2";
/// Magic for archives with explicit per-chunk payload lengths.
pub const MAGIC_PKG3: [u8; 4] = *b"PKG3";

/// Chunk name of the shader/material variant set.
pub const CHUNK_SHADERS: &str = "shaders";
/// Chunk name of the 12-byte model origin record.
pub const CHUNK_OFFSET: &str = "offset";
/// Chunk name of the external-reference placement list.
pub const CHUNK_XREFS: &str = "xrefs";

/// Container framing version, fixed by the archive magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkgVersion {
    Pkg2,
    Pkg3,
}

impl PkgVersion {
    /// Map a magic tag to a version, if recognized.
    pub fn from_magic(magic: [u8; 4]) -> Option<Self> {
        match &magic {
            b"PKG2" => Some(Self::Pkg2),
            b"PKG3" => Some(Self::Pkg3),
            _ => None,
        }
    }

    pub const fn magic(self) -> [u8; 4] {
        match self {
            Self::Pkg2 => MAGIC_PKG2,
            Self::Pkg3 => MAGIC_PKG3,
        }
    }

    /// Whether chunks carry an explicit u32 payload length.
    pub const fn has_chunk_lengths(self) -> bool {
        matches!(self, Self::Pkg3)
    }
}

/// Immutable context for one import pass.
///
/// The archive path and texture search roots are fixed up front and
/// threaded through every call that needs to resolve a side file.
#[derive(Debug, Clone)]
pub struct ImportContext {
    /// Path of the archive being imported; `.mtx` side files live next to it.
    pub pkg_path: PathBuf,
    /// Directories searched for textures named by shader records.
    pub texture_roots: Vec<PathBuf>,
}

/// Extensions tried when resolving a texture name, in priority order.
const TEXTURE_EXTENSIONS: [&str; 3] = ["tga", "bmp", "png"];

impl ImportContext {
    /// Context for an archive path, with the conventional `../texture`
    /// directory as the single search root.
    pub fn for_archive(pkg_path: impl Into<PathBuf>) -> Self {
        let pkg_path = pkg_path.into();
        let mut texture_roots = Vec::new();
        if let Some(dir) = pkg_path.parent() {
            texture_roots.push(dir.join("..").join("texture"));
        }
        Self {
            pkg_path,
            texture_roots,
        }
    }

    /// Add a texture search root, keeping earlier roots at higher priority.
    #[must_use]
    pub fn with_texture_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.texture_roots.push(root.into());
        self
    }

    /// Resolve a texture name against the search roots.
    ///
    /// Tries each root in order with `.tga`, `.bmp` and `.png` extensions
    /// and returns the first file that exists.
    pub fn resolve_texture(&self, name: &str) -> Option<PathBuf> {
        for root in &self.texture_roots {
            for ext in TEXTURE_EXTENSIONS {
                let candidate = root.join(format!("{name}.{ext}"));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Expected `.mtx` side file path for a mesh: the archive path with its
    /// extension replaced by `_<RAWNAME>.mtx`.
    pub fn mtx_path(&self, mesh_name: &str) -> PathBuf {
        let raw = mtx::raw_object_name(mesh_name);
        let stem = self
            .pkg_path
            .file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
        self.pkg_path.with_file_name(format!("{stem}_{raw}.mtx"))
    }
}

/// Everything produced by one import pass.
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub meshes: Vec<Mesh>,
    /// The full variant-major shader set as stored in the archive.
    pub shaders: ShaderSet,
    /// Redundancy-collapsed view: base records plus sparse overrides.
    pub variants: CollapsedVariants,
    pub xrefs: Vec<Xref>,
    /// Model origin from the `offset` chunk, when present.
    pub origin: Option<Vec3>,
    /// Texture names resolved to on-disk paths via the import context.
    pub resolved_textures: BTreeMap<String, PathBuf>,
    /// Non-fatal conditions encountered during the pass.
    pub diagnostics: Vec<Diagnostic>,
}

/// Options controlling one export pass.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Interface parity with the original exporter; mesh data arrives
    /// already evaluated, so this is informational.
    pub apply_modifiers: bool,
    /// Write per-vertex diffuse colors (sets the DIFFUSE FVF bit).
    pub vertex_color_diffuse: bool,
    /// Write per-vertex specular colors (sets the SPECULAR FVF bit).
    pub vertex_color_specular: bool,
    /// The caller pre-filtered the mesh list to a selection.
    pub selection_only: bool,
    /// Shader color storage for the whole archive.
    pub color_mode: crate::scene::ColorMode,
    /// Container framing to write.
    pub version: PkgVersion,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            apply_modifiers: true,
            vertex_color_diffuse: false,
            vertex_color_specular: false,
            selection_only: false,
            color_mode: crate::scene::ColorMode::default(),
            version: PkgVersion::Pkg3,
        }
    }
}

/// Check that `path` looks like a PKG archive without parsing it fully.
pub fn sniff_version(path: impl AsRef<Path>) -> crate::error::Result<PkgVersion> {
    use std::io::Read;

    let mut magic = [0u8; 4];
    std::fs::File::open(path)?.read_exact(&mut magic)?;
    PkgVersion::from_magic(magic).ok_or(crate::error::Error::InvalidPkgMagic(magic))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_from_magic() {
        assert_eq!(Some(PkgVersion::Pkg2), PkgVersion::from_magic(*b"PKG2"));
        assert_eq!(Some(PkgVersion::Pkg3), PkgVersion::from_magic(*b"PKG3"));
        assert_eq!(None, PkgVersion::from_magic(*b"PKG1"));
        assert!(PkgVersion::Pkg3.has_chunk_lengths());
        assert!(!PkgVersion::Pkg2.has_chunk_lengths());
    }

    #[test]
    fn test_mtx_path_strips_lod_suffix() {
        let ctx = ImportContext::for_archive("/tmp/vpcop.pkg");
        assert_eq!(
            PathBuf::from("/tmp/vpcop_WHL0.mtx"),
            ctx.mtx_path("whl0_h")
        );
    }
}
