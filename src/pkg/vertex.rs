//! Per-vertex attribute codec
//!
//! A vertex layout is fixed by the chunk's FVF word plus the section's
//! compact flag. Position is always three raw floats; the optional
//! attributes switch between raw-float and quantized encodings in compact
//! sections. Values stay in archive space here - axis conversion and
//! V-flipping belong to mesh assembly.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Vec2, Vec3, Vec4};

use crate::binary::{ReadPkgExt, WritePkgExt};
use crate::error::Result;
use crate::fvf::Fvf;

/// One decoded vertex, still in archive space.
///
/// Attributes the layout does not contain keep their default values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub color: Vec4,
}

/// Attribute layout for all vertices of one section.
#[derive(Debug, Clone, Copy)]
pub struct VertexLayout {
    fvf: Fvf,
    compact: bool,
}

impl VertexLayout {
    pub const fn new(fvf: Fvf, compact: bool) -> Self {
        Self { fvf, compact }
    }

    /// Bytes one vertex occupies on disk.
    pub fn stride(&self) -> usize {
        let mut stride = 12; // position, always 3 raw floats
        if self.fvf.has_normal() {
            stride += if self.compact { 3 } else { 12 };
        }
        if self.fvf.has_diffuse() {
            stride += 4;
        }
        if self.fvf.has_specular() {
            stride += 4;
        }
        if self.fvf.has_uv() {
            stride += if self.compact { 4 } else { 8 };
        }
        stride
    }

    /// Decode one vertex.
    pub fn read<R: Read>(&self, reader: &mut R) -> Result<RawVertex> {
        let mut vertex = RawVertex {
            position: reader.read_vec3()?,
            ..RawVertex::default()
        };

        if self.fvf.has_normal() {
            vertex.normal = if self.compact {
                let mut b = [0u8; 3];
                reader.read_exact(&mut b)?;
                Vec3::new(
                    (f32::from(b[0]) - 128.0) / 128.0,
                    (f32::from(b[1]) - 128.0) / 128.0,
                    (f32::from(b[2]) - 128.0) / 128.0,
                )
            } else {
                reader.read_vec3()?
            };
        }

        // The color is read the same way whichever flag asked for it; with
        // both flags set the second read wins.
        if self.fvf.has_diffuse() {
            vertex.color = reader.read_color4b()?;
        }
        if self.fvf.has_specular() {
            vertex.color = reader.read_color4b()?;
        }

        if self.fvf.has_uv() {
            vertex.uv = if self.compact {
                let u = reader.read_u16::<LittleEndian>()?;
                let v = reader.read_u16::<LittleEndian>()?;
                Vec2::new(
                    f32::from(u) / 128.0 - 128.0,
                    f32::from(v) / 128.0 - 128.0,
                )
            } else {
                reader.read_vec2()?
            };
        }

        Ok(vertex)
    }

    /// Encode one vertex; the exact mirror of [`VertexLayout::read`].
    pub fn write<W: Write>(&self, writer: &mut W, vertex: &RawVertex) -> Result<()> {
        writer.write_vec3(vertex.position)?;

        if self.fvf.has_normal() {
            if self.compact {
                let pack = |v: f32| (v.clamp(-1.0, 1.0) * 128.0 + 128.0).min(255.0) as u8;
                writer.write_all(&[
                    pack(vertex.normal.x),
                    pack(vertex.normal.y),
                    pack(vertex.normal.z),
                ])?;
            } else {
                writer.write_vec3(vertex.normal)?;
            }
        }

        if self.fvf.has_diffuse() {
            writer.write_color4b(vertex.color)?;
        }
        if self.fvf.has_specular() {
            writer.write_color4b(vertex.color)?;
        }

        if self.fvf.has_uv() {
            if self.compact {
                let pack = |v: f32| ((v + 128.0) * 128.0).clamp(0.0, 65535.0).round() as u16;
                writer.write_u16::<LittleEndian>(pack(vertex.uv.x))?;
                writer.write_u16::<LittleEndian>(pack(vertex.uv.y))?;
            } else {
                writer.write_vec2(vertex.uv)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn roundtrip(layout: VertexLayout, vertex: RawVertex) -> RawVertex {
        let mut buf = Vec::new();
        layout.write(&mut buf, &vertex).unwrap();
        assert_eq!(layout.stride(), buf.len());
        layout.read(&mut &buf[..]).unwrap()
    }

    #[test]
    fn test_position_only_stride_ignores_compact() {
        let fvf = Fvf::new(Fvf::POSITION);
        assert_eq!(12, VertexLayout::new(fvf, false).stride());
        assert_eq!(12, VertexLayout::new(fvf, true).stride());
    }

    #[test]
    fn test_normal_stride() {
        let fvf = Fvf::new(Fvf::POSITION | Fvf::NORMAL);
        assert_eq!(24, VertexLayout::new(fvf, false).stride());
        assert_eq!(15, VertexLayout::new(fvf, true).stride());
    }

    #[test]
    fn test_full_uncompressed_roundtrip() {
        let fvf = Fvf::new(Fvf::POSITION | Fvf::NORMAL | Fvf::DIFFUSE | Fvf::TEX1);
        let vertex = RawVertex {
            position: Vec3::new(1.0, -2.0, 3.5),
            normal: Vec3::new(0.0, 1.0, 0.0),
            uv: Vec2::new(0.25, 0.75),
            color: Vec4::new(1.0, 0.5019608, 0.0, 1.0),
        };
        assert_eq!(vertex, roundtrip(VertexLayout::new(fvf, false), vertex));
    }

    #[test]
    fn test_compact_normal_quantization() {
        let fvf = Fvf::new(Fvf::POSITION | Fvf::NORMAL);
        let layout = VertexLayout::new(fvf, true);

        let mut buf = Vec::new();
        buf.extend_from_slice(&[0u8; 12]); // position
        buf.extend_from_slice(&[128, 0, 255]);

        let vertex = layout.read(&mut &buf[..]).unwrap();
        assert_eq!(0.0, vertex.normal.x);
        assert_eq!(-1.0, vertex.normal.y);
        assert!((vertex.normal.z - 127.0 / 128.0).abs() < 1e-6);
    }

    #[test]
    fn test_compact_uv_quantization() {
        let fvf = Fvf::new(Fvf::POSITION | Fvf::TEX1);
        let layout = VertexLayout::new(fvf, true);

        // (v / 128) - 128: 16384 -> 0.0, 16512 -> 1.0
        let mut buf = Vec::new();
        buf.extend_from_slice(&[0u8; 12]);
        buf.extend_from_slice(&16384u16.to_le_bytes());
        buf.extend_from_slice(&16512u16.to_le_bytes());

        let vertex = layout.read(&mut &buf[..]).unwrap();
        assert_eq!(Vec2::new(0.0, 1.0), vertex.uv);
    }

    #[test]
    fn test_both_color_flags_last_read_wins() {
        let fvf = Fvf::new(Fvf::POSITION | Fvf::DIFFUSE | Fvf::SPECULAR);
        let layout = VertexLayout::new(fvf, false);
        assert_eq!(20, layout.stride());

        let mut buf = Vec::new();
        buf.extend_from_slice(&[0u8; 12]);
        buf.extend_from_slice(&[255, 0, 0, 255]); // diffuse slot
        buf.extend_from_slice(&[0, 255, 0, 255]); // specular slot

        let vertex = layout.read(&mut &buf[..]).unwrap();
        assert_eq!(Vec4::new(0.0, 1.0, 0.0, 1.0), vertex.color);
    }
}
