//! Archive export
//!
//! Writes chunks in the order shipped archives use: geometry chunks first,
//! then `shaders`, then `xrefs` (only when any exist), then the `offset`
//! record. The written shader table is compacted to the material slots the
//! meshes actually use, in ascending slot order, and geometry sections are
//! remapped to match. `.mtx` side files are written last, next to the
//! archive.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use glam::Vec3;
use tracing::{debug, info};

use crate::binary::{vec3_to_file, write_chunk, WritePkgExt};
use crate::error::{Error, Result};
use crate::fvf::Fvf;
use crate::scene::{MaterialParams, Mesh, ShaderSet, Xref};

use super::geometry::{self, GeometryChunk};
use super::{
    mtx, shaders, xref, ExportOptions, PkgVersion, CHUNK_OFFSET, CHUNK_SHADERS, CHUNK_XREFS,
};

/// Streaming archive writer over any seekable sink.
///
/// [`export_pkg`] is the whole-scene front end; the writer itself just
/// frames chunks in the requested version.
pub struct PkgWriter<W: Write + Seek> {
    writer: W,
    version: PkgVersion,
}

impl<W: Write + Seek> PkgWriter<W> {
    /// Write the magic and fix the framing version.
    pub fn new(mut writer: W, version: PkgVersion) -> Result<Self> {
        writer.write_all(&version.magic())?;
        Ok(Self { writer, version })
    }

    fn chunk<F>(&mut self, name: &str, body: F) -> Result<()>
    where
        F: FnOnce(&mut W) -> Result<()>,
    {
        write_chunk(
            &mut self.writer,
            name,
            self.version.has_chunk_lengths(),
            body,
        )
    }

    /// Write one geometry chunk under the mesh's name.
    pub fn write_mesh(&mut self, name: &str, chunk: &GeometryChunk) -> Result<()> {
        debug!(mesh = name, sections = chunk.sections.len(), "writing geometry chunk");
        self.chunk(name, |w| geometry::write_geometry(w, chunk))
    }

    pub fn write_shaders(&mut self, set: &ShaderSet) -> Result<()> {
        self.chunk(CHUNK_SHADERS, |w| shaders::write_shader_set(w, set))
    }

    pub fn write_xrefs(&mut self, xrefs: &[Xref]) -> Result<()> {
        self.chunk(CHUNK_XREFS, |w| xref::write_xrefs(w, xrefs))
    }

    /// Write the 12-byte model origin record.
    pub fn write_offset(&mut self, origin: Vec3) -> Result<()> {
        self.chunk(CHUNK_OFFSET, |w| w.write_vec3(vec3_to_file(origin)))
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// `.mtx` side file path for a mesh exported next to `pkg_path`.
fn sidecar_path(pkg_path: &Path, mesh_name: &str) -> PathBuf {
    let raw = mtx::raw_object_name(mesh_name);
    let stem = pkg_path
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    pkg_path.with_file_name(format!("{stem}_{raw}.mtx"))
}

/// Material slots referenced by any mesh, ascending and deduplicated.
fn used_slots(meshes: &[Mesh]) -> Vec<u32> {
    let mut used: Vec<u32> = meshes.iter().flat_map(Mesh::used_materials).collect();
    used.sort_unstable();
    used.dedup();
    used
}

/// Compact the shader set to the used slots, in slot order.
///
/// An empty set gets a single synthesized variant of default records so
/// the archive always carries a valid table.
fn compact_shader_set(
    set: &ShaderSet,
    used: &[u32],
    options: &ExportOptions,
) -> ShaderSet {
    if set.variants.is_empty() {
        return ShaderSet {
            color_mode: options.color_mode,
            variants: vec![vec![MaterialParams::default(); used.len().max(1)]],
        };
    }

    let variants = set
        .variants
        .iter()
        .map(|records| {
            used.iter()
                .map(|&slot| {
                    records
                        .get(slot as usize)
                        .cloned()
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    ShaderSet {
        color_mode: options.color_mode,
        variants,
    }
}

/// Export a whole scene as a PKG archive at `path`.
///
/// # Errors
///
/// Returns [`Error::MaterialSlotOutOfRange`] when a mesh references a slot
/// past the supplied (non-empty) shader table, and
/// [`Error::VertexIndexOutOfRange`] when a face corner indexes past a
/// mesh's vertex array, besides I/O and shader shape failures.
pub fn export_pkg(
    path: impl AsRef<Path>,
    meshes: &[Mesh],
    shader_set: &ShaderSet,
    xrefs: &[Xref],
    origin: Vec3,
    options: &ExportOptions,
) -> Result<()> {
    let path = path.as_ref();
    info!(path = %path.display(), meshes = meshes.len(), "exporting PKG archive");

    if !shader_set.variants.is_empty() {
        let table_len = shader_set.slot_count();
        for mesh in meshes {
            if let Some(&slot) = mesh
                .used_materials()
                .iter()
                .find(|&&s| s as usize >= table_len)
            {
                return Err(Error::MaterialSlotOutOfRange {
                    mesh: mesh.name.clone(),
                    slot,
                    table_len,
                });
            }
        }
    }

    let used = used_slots(meshes);
    let remap: HashMap<u32, u32> = used
        .iter()
        .enumerate()
        .map(|(new, &old)| (old, new as u32))
        .collect();
    let table = compact_shader_set(shader_set, &used, options);

    // A shadeless base material suppresses normals for the whole archive.
    let shadeless = table
        .variants
        .first()
        .is_some_and(|records| records.iter().any(|r| r.shadeless));
    let mut fvf = Fvf::new(Fvf::POSITION | Fvf::NORMAL | Fvf::TEX1);
    if shadeless {
        fvf.clear_normal();
    }
    if options.vertex_color_diffuse {
        fvf.set_diffuse();
    }
    if options.vertex_color_specular {
        fvf.set_specular();
    }

    let mut writer = PkgWriter::new(BufWriter::new(File::create(path)?), options.version)?;
    for mesh in meshes {
        let chunk = geometry::build_geometry(mesh, fvf, &remap)?;
        writer.write_mesh(&mesh.name, &chunk)?;
    }
    writer.write_shaders(&table)?;
    if !xrefs.is_empty() {
        writer.write_xrefs(xrefs)?;
    }
    writer.write_offset(origin)?;
    writer.into_inner().flush()?;

    for mesh in meshes {
        if let Some(placement) = &mesh.placement {
            mtx::save_mtx(&sidecar_path(path, &mesh.name), placement)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec4};
    use pretty_assertions::assert_eq;

    use crate::pkg::{import_pkg, ImportContext};
    use crate::scene::{ColorMode, Corner, Face, Placement};

    use super::*;

    fn triangle_mesh(name: &str, material: u32) -> Mesh {
        let corner = |vertex: u32, u: f32| Corner {
            vertex,
            uv: Vec2::new(u, 0.5),
            color: Vec4::ZERO,
        };
        Mesh {
            name: name.to_owned(),
            positions: vec![
                Vec3::ZERO,
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            normals: vec![Vec3::Z; 3],
            faces: vec![Face {
                corners: [corner(0, 0.0), corner(1, 0.5), corner(2, 1.0)],
                material,
            }],
            placement: None,
        }
    }

    fn table(names: &[&str]) -> ShaderSet {
        ShaderSet {
            color_mode: ColorMode::Byte,
            variants: vec![names
                .iter()
                .map(|n| MaterialParams {
                    texture: Some((*n).to_owned()),
                    ..MaterialParams::default()
                })
                .collect()],
        }
    }

    #[test]
    fn test_export_import_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.pkg");

        let mesh = triangle_mesh("body_h", 1);
        let set = table(&["paint", "glass"]);
        export_pkg(
            &path,
            std::slice::from_ref(&mesh),
            &set,
            &[],
            Vec3::ZERO,
            &ExportOptions::default(),
        )
        .unwrap();

        let result = import_pkg(&path).unwrap();
        assert_eq!(1, result.meshes.len());

        let back = &result.meshes[0];
        assert_eq!("body_h", back.name);
        assert_eq!(mesh.positions, back.positions);
        assert_eq!(mesh.normals, back.normals);
        assert_eq!(1, back.faces.len());
        // Slot 1 was the only used slot, so it compacted to 0.
        assert_eq!(0, back.faces[0].material);
        assert_eq!(mesh.faces[0].corners[1].uv, back.faces[0].corners[1].uv);

        // The written table keeps only the used material.
        assert_eq!(1, result.shaders.slot_count());
        assert_eq!(
            Some("glass"),
            result.shaders.variants[0][0].texture.as_deref()
        );
        assert_eq!(Some(Vec3::ZERO), result.origin);
    }

    #[test]
    fn test_out_of_range_slot_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pkg");

        let err = export_pkg(
            &path,
            &[triangle_mesh("body_h", 7)],
            &table(&["paint"]),
            &[],
            Vec3::ZERO,
            &ExportOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::MaterialSlotOutOfRange {
                slot: 7,
                table_len: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_out_of_range_vertex_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pkg");

        let mut mesh = triangle_mesh("body_h", 0);
        mesh.faces[0].corners[2].vertex = 9;
        let err = export_pkg(
            &path,
            &[mesh],
            &table(&["paint"]),
            &[],
            Vec3::ZERO,
            &ExportOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::VertexIndexOutOfRange {
                index: 9,
                vertex_count: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_shader_set_synthesized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dummy.pkg");

        export_pkg(
            &path,
            &[triangle_mesh("body_h", 0)],
            &ShaderSet::default(),
            &[],
            Vec3::ZERO,
            &ExportOptions::default(),
        )
        .unwrap();

        let result = import_pkg(&path).unwrap();
        assert_eq!(1, result.shaders.variants.len());
        assert_eq!(1, result.shaders.slot_count());
        assert_eq!(None, result.shaders.variants[0][0].texture);
    }

    #[test]
    fn test_sidecar_written_for_placed_mesh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vpcop.pkg");

        let mut mesh = triangle_mesh("whl0_h", 0);
        mesh.placement = Some(Placement::Bound {
            min: Vec3::ZERO,
            max: Vec3::ONE,
            pivot: Vec3::ZERO,
            origin: Vec3::new(0.5, 0.5, 0.0),
        });
        // Matte material: a missing texture would add a diagnostic below.
        let matte = ShaderSet {
            color_mode: ColorMode::Byte,
            variants: vec![vec![MaterialParams::default()]],
        };
        export_pkg(
            &path,
            std::slice::from_ref(&mesh),
            &matte,
            &[],
            Vec3::ZERO,
            &ExportOptions::default(),
        )
        .unwrap();

        assert!(dir.path().join("vpcop_WHL0.mtx").is_file());

        // Import picks the placement back up through the same path rule.
        let result = import_pkg(&path).unwrap();
        assert_eq!(mesh.placement, result.meshes[0].placement);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_xrefs_survive_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("props.pkg");

        let xrefs = vec![Xref {
            name: "sp_tree_f".to_owned(),
            transform: glam::Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0)),
        }];
        export_pkg(
            &path,
            &[triangle_mesh("ground_h", 0)],
            &table(&["paint"]),
            &xrefs,
            Vec3::ZERO,
            &ExportOptions::default(),
        )
        .unwrap();

        let result = import_pkg(&path).unwrap();
        assert_eq!(xrefs, result.xrefs);
    }

    #[test]
    fn test_pkg2_archive_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.pkg");

        let options = ExportOptions {
            version: PkgVersion::Pkg2,
            ..ExportOptions::default()
        };
        export_pkg(
            &path,
            &[triangle_mesh("body_h", 0)],
            &table(&["paint"]),
            &[],
            Vec3::ZERO,
            &options,
        )
        .unwrap();

        assert_eq!(PkgVersion::Pkg2, crate::pkg::sniff_version(&path).unwrap());
        let result = import_pkg(&path).unwrap();
        assert_eq!(1, result.meshes.len());
        assert_eq!(3, result.meshes[0].positions.len());
    }

    #[test]
    fn test_sidecar_path_shared_with_import() {
        let ctx = ImportContext::for_archive("/tmp/vpcop.pkg");
        assert_eq!(
            ctx.mtx_path("whl0_h"),
            sidecar_path(Path::new("/tmp/vpcop.pkg"), "whl0_h")
        );
    }
}
