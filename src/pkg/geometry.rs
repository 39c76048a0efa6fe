//! Geometry chunk codec and mesh assembly
//!
//! A geometry chunk is a five-word header followed by sections. Each
//! section binds one material slot and holds one or more strips; the
//! section's compact flag (bit 8 of its flags word) selects 16-bit strip
//! counts and quantized vertex attributes. Raw decoded chunks are turned
//! into welded scene meshes here, and scene meshes back into chunks.

use std::collections::HashMap;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Vec2, Vec3, Vec4};
use tracing::debug;

use crate::binary::{vec3_to_file, vec3_to_scene};
use crate::error::{Diagnostic, Result};
use crate::fvf::Fvf;
use crate::scene::{Corner, Face, Mesh};

use super::topology::{self, PrimitiveKind};
use super::vertex::{RawVertex, VertexLayout};

/// Section flag selecting 16-bit counts and quantized vertices.
pub const SECTION_COMPACT: u16 = 1 << 8;

/// One strip record: its vertices plus locally-indexed triangles.
///
/// Triangles are always stored expanded, whatever topology the payload
/// declared; re-emitting therefore always declares list topology.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Strip {
    pub vertices: Vec<RawVertex>,
    /// Flat triangle list indexing into `vertices`.
    pub triangles: Vec<u32>,
}

/// One section: a material binding over a run of strips.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub flags: u16,
    /// Slot into the archive's shader table.
    pub shader_slot: u32,
    pub strips: Vec<Strip>,
}

impl Section {
    pub const fn is_compact(&self) -> bool {
        self.flags & SECTION_COMPACT != 0
    }
}

/// A fully decoded geometry chunk, still in archive space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryChunk {
    pub fvf: Fvf,
    pub sections: Vec<Section>,
}

impl GeometryChunk {
    fn vertex_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| &s.strips)
            .map(|s| s.vertices.len())
            .sum()
    }

    fn index_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| &s.strips)
            .map(|s| s.triangles.len())
            .sum()
    }
}

/// Decode a geometry chunk payload.
pub fn read_geometry<R: Read>(reader: &mut R) -> Result<GeometryChunk> {
    let num_sections = reader.read_u32::<LittleEndian>()?;
    let _total_vertices = reader.read_u32::<LittleEndian>()?;
    let _total_indices = reader.read_u32::<LittleEndian>()?;
    let _num_sections_dup = reader.read_u32::<LittleEndian>()?;
    let fvf = Fvf::new(reader.read_u32::<LittleEndian>()?);

    let mut sections = Vec::with_capacity(num_sections as usize);
    for _ in 0..num_sections {
        let strip_count = reader.read_u16::<LittleEndian>()?;
        let flags = reader.read_u16::<LittleEndian>()?;
        let compact = flags & SECTION_COMPACT != 0;

        let shader_slot = if compact {
            u32::from(reader.read_u16::<LittleEndian>()?)
        } else {
            reader.read_u32::<LittleEndian>()?
        };

        let layout = VertexLayout::new(fvf, compact);
        let mut strips = Vec::with_capacity(strip_count as usize);
        for _ in 0..strip_count {
            strips.push(read_strip(reader, layout, compact)?);
        }
        sections.push(Section {
            flags,
            shader_slot,
            strips,
        });
    }

    let chunk = GeometryChunk { fvf, sections };
    debug!(
        sections = chunk.sections.len(),
        vertices = chunk.vertex_count(),
        fvf = chunk.fvf.bits(),
        "decoded geometry chunk"
    );
    Ok(chunk)
}

fn read_strip<R: Read>(reader: &mut R, layout: VertexLayout, compact: bool) -> Result<Strip> {
    let (kind_raw, vertex_count) = if compact {
        (
            u32::from(reader.read_u16::<LittleEndian>()?),
            u32::from(reader.read_u16::<LittleEndian>()?),
        )
    } else {
        (
            reader.read_u32::<LittleEndian>()?,
            reader.read_u32::<LittleEndian>()?,
        )
    };

    let mut vertices = Vec::with_capacity(vertex_count as usize);
    for _ in 0..vertex_count {
        vertices.push(layout.read(reader)?);
    }

    let index_count = if compact {
        u32::from(reader.read_u16::<LittleEndian>()?)
    } else {
        reader.read_u32::<LittleEndian>()?
    } as usize;

    let triangles = match PrimitiveKind::from_raw(kind_raw) {
        PrimitiveKind::TriangleStrip => topology::read_strip_indices(reader, index_count)?,
        PrimitiveKind::TriangleList => topology::read_list_indices(reader, index_count)?,
    };

    Ok(Strip {
        vertices,
        triangles,
    })
}

/// Encode a geometry chunk payload; the mirror of [`read_geometry`].
pub fn write_geometry<W: Write>(writer: &mut W, chunk: &GeometryChunk) -> Result<()> {
    writer.write_u32::<LittleEndian>(chunk.sections.len() as u32)?;
    writer.write_u32::<LittleEndian>(chunk.vertex_count() as u32)?;
    writer.write_u32::<LittleEndian>(chunk.index_count() as u32)?;
    writer.write_u32::<LittleEndian>(chunk.sections.len() as u32)?;
    writer.write_u32::<LittleEndian>(chunk.fvf.bits())?;

    for section in &chunk.sections {
        writer.write_u16::<LittleEndian>(section.strips.len() as u16)?;
        writer.write_u16::<LittleEndian>(section.flags)?;
        let compact = section.is_compact();
        if compact {
            writer.write_u16::<LittleEndian>(section.shader_slot as u16)?;
        } else {
            writer.write_u32::<LittleEndian>(section.shader_slot)?;
        }

        let layout = VertexLayout::new(chunk.fvf, compact);
        // Decoded triangles are already expanded, so the primitive type
        // written back is always a list regardless of what was read.
        let primtype = PrimitiveKind::TriangleList.raw();
        for strip in &section.strips {
            if compact {
                writer.write_u16::<LittleEndian>(primtype as u16)?;
                writer.write_u16::<LittleEndian>(strip.vertices.len() as u16)?;
            } else {
                writer.write_u32::<LittleEndian>(primtype)?;
                writer.write_u32::<LittleEndian>(strip.vertices.len() as u32)?;
            }
            for vertex in &strip.vertices {
                layout.write(writer, vertex)?;
            }
            if compact {
                writer.write_u16::<LittleEndian>(strip.triangles.len() as u16)?;
            } else {
                writer.write_u32::<LittleEndian>(strip.triangles.len() as u32)?;
            }
            topology::write_list_indices(writer, &strip.triangles)?;
        }
    }
    Ok(())
}

/// Weld key over attribute bit patterns, so equal floats compare exactly
/// and NaNs never merge by accident.
#[derive(PartialEq, Eq, Hash)]
struct WeldKey {
    position: [u32; 3],
    normal: [u32; 3],
    uv: [u32; 2],
    color: [u32; 4],
}

impl WeldKey {
    fn import(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array().map(f32::to_bits),
            normal: normal.to_array().map(f32::to_bits),
            uv: [0; 2],
            color: [0; 4],
        }
    }

    fn export(position: Vec3, normal: Vec3, uv: Vec2, color: Vec4) -> Self {
        Self {
            position: position.to_array().map(f32::to_bits),
            normal: normal.to_array().map(f32::to_bits),
            uv: uv.to_array().map(f32::to_bits),
            color: color.to_array().map(f32::to_bits),
        }
    }
}

/// Assemble a scene mesh from a decoded chunk.
///
/// Vertices are converted to scene axes, welded on (position, normal), and
/// UVs get their V coordinate flipped. Strip-local indices are offset by
/// the running vertex count of all preceding strips; any triangle indexing
/// past the chunk's vertices is reported and skipped.
pub fn assemble_mesh(
    name: &str,
    chunk: &GeometryChunk,
    diagnostics: &mut Vec<Diagnostic>,
) -> Mesh {
    let mut mesh = Mesh::new(name);
    let has_normals = chunk.fvf.has_normal();

    // Per-raw-vertex welded index plus the corner attributes welding
    // deliberately leaves per-face.
    let mut welded: Vec<u32> = Vec::new();
    let mut uvs: Vec<Vec2> = Vec::new();
    let mut colors: Vec<Vec4> = Vec::new();
    let mut weld_map: HashMap<WeldKey, u32> = HashMap::new();

    for section in &chunk.sections {
        for strip in &section.strips {
            for vertex in &strip.vertices {
                let position = vec3_to_scene(vertex.position);
                let normal = vec3_to_scene(vertex.normal);
                let index = *weld_map
                    .entry(WeldKey::import(position, normal))
                    .or_insert_with(|| {
                        mesh.positions.push(position);
                        if has_normals {
                            mesh.normals.push(normal);
                        }
                        (mesh.positions.len() - 1) as u32
                    });
                welded.push(index);
                uvs.push(Vec2::new(vertex.uv.x, 1.0 - vertex.uv.y));
                colors.push(vertex.color);
            }
        }
    }

    let mut offset = 0u32;
    for (section_index, section) in chunk.sections.iter().enumerate() {
        for strip in &section.strips {
            for tri in strip.triangles.chunks_exact(3) {
                let raw = [tri[0] + offset, tri[1] + offset, tri[2] + offset];
                if let Some(&bad) = raw.iter().find(|&&i| i as usize >= welded.len()) {
                    diagnostics.push(Diagnostic::FaceIndexOutOfRange {
                        mesh: name.to_owned(),
                        section: section_index,
                        index: bad,
                        vertex_count: welded.len(),
                    });
                    continue;
                }
                let corner = |i: u32| Corner {
                    vertex: welded[i as usize],
                    uv: uvs[i as usize],
                    color: colors[i as usize],
                };
                mesh.faces.push(Face {
                    corners: [corner(raw[0]), corner(raw[1]), corner(raw[2])],
                    material: section.shader_slot,
                });
            }
            offset += strip.vertices.len() as u32;
        }
    }

    mesh
}

/// Build a chunk from a scene mesh: one non-compact section per used
/// material slot, each holding a single triangle-list strip.
///
/// Export welding is stricter than import welding: the key includes UV and
/// color so corners that differ in either stay separate vertices. A face
/// corner indexing past the mesh's vertex array fails the whole build.
pub fn build_geometry(
    mesh: &Mesh,
    fvf: Fvf,
    material_remap: &HashMap<u32, u32>,
) -> Result<GeometryChunk> {
    let layout_has_normals = fvf.has_normal();
    let mut sections = Vec::new();

    for slot in mesh.used_materials() {
        let mut vertices: Vec<RawVertex> = Vec::new();
        let mut triangles: Vec<u32> = Vec::new();
        let mut weld_map: HashMap<WeldKey, u32> = HashMap::new();

        for face in mesh.faces.iter().filter(|f| f.material == slot) {
            for corner in &face.corners {
                let position = *mesh.positions.get(corner.vertex as usize).ok_or_else(|| {
                    crate::error::Error::VertexIndexOutOfRange {
                        mesh: mesh.name.clone(),
                        index: corner.vertex,
                        vertex_count: mesh.positions.len(),
                    }
                })?;
                let normal = if layout_has_normals {
                    mesh.normals
                        .get(corner.vertex as usize)
                        .copied()
                        .unwrap_or(Vec3::Z)
                } else {
                    Vec3::ZERO
                };
                let key = WeldKey::export(position, normal, corner.uv, corner.color);
                let index = *weld_map.entry(key).or_insert_with(|| {
                    vertices.push(RawVertex {
                        position: vec3_to_file(position),
                        normal: vec3_to_file(normal),
                        uv: Vec2::new(corner.uv.x, 1.0 - corner.uv.y),
                        color: corner.color,
                    });
                    (vertices.len() - 1) as u32
                });
                triangles.push(index);
            }
        }

        sections.push(Section {
            flags: 0,
            shader_slot: material_remap.get(&slot).copied().unwrap_or(slot),
            strips: vec![Strip {
                vertices,
                triangles,
            }],
        });
    }

    Ok(GeometryChunk { fvf, sections })
}
