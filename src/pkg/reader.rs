//! Archive import
//!
//! Walks the chunk stream, dispatching on chunk name: `shaders`, `offset`
//! and `xrefs` are handled specially, any other chunk is a geometry mesh
//! named after the chunk. Recoverable problems are collected as
//! [`Diagnostic`] values on the result; anything structural aborts the
//! whole pass.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{debug, info};

use crate::binary::{read_chunk_intro, vec3_to_scene, ReadPkgExt};
use crate::error::{Diagnostic, Error, Result};

use super::{
    geometry, mtx, shaders, xref, ImportContext, ImportResult, PkgVersion, CHUNK_OFFSET,
    CHUNK_SHADERS, CHUNK_XREFS,
};

/// Streaming archive reader.
///
/// Wraps any seekable byte source; [`import_pkg`] is the file-path
/// convenience front end.
pub struct PkgReader<R> {
    reader: R,
    version: PkgVersion,
}

impl<R: Read + Seek> PkgReader<R> {
    /// Consume the magic and set up the framing version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPkgMagic`] for anything that is not a PKG2
    /// or PKG3 archive.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        let version =
            PkgVersion::from_magic(magic).ok_or(Error::InvalidPkgMagic(magic))?;
        Ok(Self { reader, version })
    }

    pub fn version(&self) -> PkgVersion {
        self.version
    }

    /// Read every chunk in the archive, resolving side files through `ctx`.
    pub fn read_archive(&mut self, ctx: &ImportContext) -> Result<ImportResult> {
        let mut result = ImportResult::default();

        while let Some(name) = read_chunk_intro(&mut self.reader)? {
            let declared_len = if self.version.has_chunk_lengths() {
                let len = self.reader.read_u32::<LittleEndian>()?;
                // A small batch of original archives shipped with zero chunk
                // lengths; those files cannot be walked at all.
                if len == 0 {
                    return Err(Error::ZeroLengthChunk { name });
                }
                Some(u64::from(len))
            } else {
                None
            };
            let body_start = self.reader.stream_position()?;
            debug!(chunk = %name, offset = body_start, "processing chunk");

            match name.as_str() {
                CHUNK_SHADERS => {
                    let set = shaders::read_shader_set(&mut self.reader)?;
                    resolve_textures(&set, ctx, &mut result);
                    result.variants = shaders::collapse_variants(&set);
                    result.shaders = set;
                }
                CHUNK_OFFSET => {
                    result.origin = Some(vec3_to_scene(self.reader.read_vec3()?));
                }
                CHUNK_XREFS => {
                    result.xrefs = xref::read_xrefs(&mut self.reader)?;
                }
                _ => {
                    let chunk = geometry::read_geometry(&mut self.reader)?;
                    let mut mesh =
                        geometry::assemble_mesh(&name, &chunk, &mut result.diagnostics);
                    attach_placement(&mut mesh, ctx, &mut result.diagnostics)?;
                    result.meshes.push(mesh);
                }
            }

            // PKG3 declares payload lengths, so the walk can resynchronize
            // at the declared boundary no matter what the codec consumed.
            if let Some(len) = declared_len {
                self.reader.seek(SeekFrom::Start(body_start + len))?;
            }
        }

        info!(
            meshes = result.meshes.len(),
            variants = result.shaders.variants.len(),
            xrefs = result.xrefs.len(),
            diagnostics = result.diagnostics.len(),
            "archive imported"
        );
        Ok(result)
    }
}

fn resolve_textures(
    set: &crate::scene::ShaderSet,
    ctx: &ImportContext,
    result: &mut ImportResult,
) {
    for records in &set.variants {
        for name in records.iter().filter_map(|r| r.texture.as_deref()) {
            if result.resolved_textures.contains_key(name) {
                continue;
            }
            match ctx.resolve_texture(name) {
                Some(path) => {
                    result.resolved_textures.insert(name.to_owned(), path);
                }
                None => {
                    let missing = Diagnostic::MissingTexture {
                        name: name.to_owned(),
                    };
                    if !result.diagnostics.contains(&missing) {
                        result.diagnostics.push(missing);
                    }
                }
            }
        }
    }
}

fn attach_placement(
    mesh: &mut crate::scene::Mesh,
    ctx: &ImportContext,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<()> {
    let path = ctx.mtx_path(&mesh.name);
    if path.is_file() {
        mesh.placement = Some(mtx::load_mtx(&path, &mesh.name)?);
    } else {
        diagnostics.push(Diagnostic::MissingMtx {
            mesh: mesh.name.clone(),
        });
    }
    Ok(())
}

/// Import the archive at `path` with the conventional texture search root.
///
/// # Errors
///
/// Any structural failure aborts the import; recoverable conditions are
/// returned in [`ImportResult::diagnostics`] instead.
pub fn import_pkg(path: impl AsRef<Path>) -> Result<ImportResult> {
    import_pkg_with_context(&ImportContext::for_archive(path.as_ref()))
}

/// Import using an explicit [`ImportContext`].
pub fn import_pkg_with_context(ctx: &ImportContext) -> Result<ImportResult> {
    info!(path = %ctx.pkg_path.display(), "importing PKG archive");
    let file = BufReader::new(File::open(&ctx.pkg_path)?);
    PkgReader::new(file)?.read_archive(ctx)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn ctx() -> ImportContext {
        ImportContext::for_archive("/nonexistent/test.pkg")
    }

    #[test]
    fn test_rejects_unknown_magic() {
        let reader = Cursor::new(b"PKG9garbage".to_vec());
        assert!(matches!(
            PkgReader::new(reader),
            Err(Error::InvalidPkgMagic(m)) if &m == b"PKG9"
        ));
    }

    #[test]
    fn test_empty_archive_imports_cleanly() {
        let mut reader = PkgReader::new(Cursor::new(b"PKG3".to_vec())).unwrap();
        assert_eq!(PkgVersion::Pkg3, reader.version());
        let result = reader.read_archive(&ctx()).unwrap();
        assert!(result.meshes.is_empty());
        assert!(result.xrefs.is_empty());
        assert!(result.origin.is_none());
    }

    #[test]
    fn test_zero_length_chunk_is_fatal() {
        let mut data = b"PKG3FILE".to_vec();
        data.extend_from_slice(b"\x07offset\x00");
        data.extend_from_slice(&0u32.to_le_bytes());

        let mut reader = PkgReader::new(Cursor::new(data)).unwrap();
        assert!(matches!(
            reader.read_archive(&ctx()),
            Err(Error::ZeroLengthChunk { name }) if name == "offset"
        ));
    }

    #[test]
    fn test_offset_chunk_converted_to_scene_axes() {
        let mut data = b"PKG3FILE".to_vec();
        data.extend_from_slice(b"\x07offset\x00");
        data.extend_from_slice(&12u32.to_le_bytes());
        for f in [1.0f32, 2.0, 3.0] {
            data.extend_from_slice(&f.to_le_bytes());
        }

        let mut reader = PkgReader::new(Cursor::new(data)).unwrap();
        let result = reader.read_archive(&ctx()).unwrap();
        assert_eq!(Some(glam::Vec3::new(1.0, -3.0, 2.0)), result.origin);
    }

    #[test]
    fn test_pkg2_framing_has_no_lengths() {
        // offset chunk without a length word, PKG2 style.
        let mut data = b"PKG2FILE".to_vec();
        data.extend_from_slice(b"\x07offset\x00");
        for f in [0.0f32, 0.0, 0.0] {
            data.extend_from_slice(&f.to_le_bytes());
        }

        let mut reader = PkgReader::new(Cursor::new(data)).unwrap();
        let result = reader.read_archive(&ctx()).unwrap();
        assert_eq!(Some(glam::Vec3::ZERO), result.origin);
    }
}
