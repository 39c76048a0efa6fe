//! Low-level chunk stream primitives shared by the PKG reader and writer
//!
//! Covers the container's primitive types: length-prefixed strings, float
//! vectors, packed byte colors, 3x4 transform matrices with axis-space
//! conversion, and the `FILE` chunk framing with its deferred-length pattern.

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::error::{Error, Result};

/// Fixed 4-byte introducer tag that precedes every chunk.
pub const CHUNK_TAG: [u8; 4] = *b"FILE";

/// Converts a point or direction from archive space to scene space.
///
/// The archive uses a Y-up, Z-forward frame; the neutral scene types are
/// Z-up. The mapping is `(x, y, z) -> (x, -z, y)`.
#[inline]
pub fn vec3_to_scene(v: Vec3) -> Vec3 {
    Vec3::new(v.x, -v.z, v.y)
}

/// Inverse of [`vec3_to_scene`]: `(x, y, z) -> (x, z, -y)`.
#[inline]
pub fn vec3_to_file(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, -v.y)
}

/// The axis-permutation matrix corresponding to [`vec3_to_scene`].
fn axis_basis() -> Mat4 {
    Mat4::from_cols(
        Vec4::new(1.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(0.0, -1.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 0.0, 1.0),
    )
}

/// Reader extension for the archive's primitive types.
pub trait ReadPkgExt: Read {
    /// Read a length-prefixed string.
    ///
    /// The length byte `L` covers the payload plus one terminator byte:
    /// `L == 0` is the empty string, otherwise `L - 1` payload bytes follow
    /// and the final byte is discarded.
    fn read_angel_string(&mut self) -> Result<String> {
        let len = self.read_u8()? as usize;
        if len == 0 {
            return Ok(String::new());
        }

        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        buf.pop(); // terminator
        Ok(String::from_utf8(buf)?)
    }

    /// Read two little-endian f32s.
    fn read_vec2(&mut self) -> Result<Vec2> {
        let x = self.read_f32::<LittleEndian>()?;
        let y = self.read_f32::<LittleEndian>()?;
        Ok(Vec2::new(x, y))
    }

    /// Read three little-endian f32s.
    fn read_vec3(&mut self) -> Result<Vec3> {
        let x = self.read_f32::<LittleEndian>()?;
        let y = self.read_f32::<LittleEndian>()?;
        let z = self.read_f32::<LittleEndian>()?;
        Ok(Vec3::new(x, y, z))
    }

    /// Read an RGBA color stored as four f32s.
    fn read_color4f(&mut self) -> Result<Vec4> {
        let r = self.read_f32::<LittleEndian>()?;
        let g = self.read_f32::<LittleEndian>()?;
        let b = self.read_f32::<LittleEndian>()?;
        let a = self.read_f32::<LittleEndian>()?;
        Ok(Vec4::new(r, g, b, a))
    }

    /// Read an RGBA color packed as four bytes, scaled to `0.0..=1.0`.
    fn read_color4b(&mut self) -> Result<Vec4> {
        let mut c = [0u8; 4];
        self.read_exact(&mut c)?;
        Ok(Vec4::new(
            f32::from(c[0]) / 255.0,
            f32::from(c[1]) / 255.0,
            f32::from(c[2]) / 255.0,
            f32::from(c[3]) / 255.0,
        ))
    }

    /// Read a 3x4 transform (row-major 3x3 basis plus translation) and
    /// convert it into a scene-space [`Mat4`].
    fn read_matrix3x4(&mut self) -> Result<Mat4> {
        let r0 = self.read_vec3()?;
        let r1 = self.read_vec3()?;
        let r2 = self.read_vec3()?;
        let t = self.read_vec3()?;

        // Transpose the row-vector convention into glam's column vectors.
        let file = Mat4::from_cols(
            r0.extend(0.0),
            r1.extend(0.0),
            r2.extend(0.0),
            t.extend(1.0),
        );

        let basis = axis_basis();
        Ok(basis * file * basis.transpose())
    }
}

impl<R: Read + ?Sized> ReadPkgExt for R {}

/// Writer extension mirroring [`ReadPkgExt`].
pub trait WritePkgExt: Write {
    /// Write a length-prefixed string; see [`ReadPkgExt::read_angel_string`]
    /// for the layout.
    ///
    /// # Errors
    /// Returns [`Error::StringTooLong`] if the payload plus terminator does
    /// not fit the u8 length prefix (payload over 254 bytes).
    fn write_angel_string(&mut self, s: &str) -> Result<()> {
        if s.is_empty() {
            self.write_u8(0)?;
            return Ok(());
        }
        if s.len() > 254 {
            return Err(Error::StringTooLong { len: s.len() });
        }

        self.write_u8(s.len() as u8 + 1)?;
        self.write_all(s.as_bytes())?;
        self.write_u8(0)?;
        Ok(())
    }

    /// Write two little-endian f32s.
    fn write_vec2(&mut self, v: Vec2) -> Result<()> {
        self.write_f32::<LittleEndian>(v.x)?;
        self.write_f32::<LittleEndian>(v.y)?;
        Ok(())
    }

    /// Write three little-endian f32s.
    fn write_vec3(&mut self, v: Vec3) -> Result<()> {
        self.write_f32::<LittleEndian>(v.x)?;
        self.write_f32::<LittleEndian>(v.y)?;
        self.write_f32::<LittleEndian>(v.z)?;
        Ok(())
    }

    /// Write an RGBA color as four f32s.
    fn write_color4f(&mut self, c: Vec4) -> Result<()> {
        self.write_f32::<LittleEndian>(c.x)?;
        self.write_f32::<LittleEndian>(c.y)?;
        self.write_f32::<LittleEndian>(c.z)?;
        self.write_f32::<LittleEndian>(c.w)?;
        Ok(())
    }

    /// Write an RGBA color packed as four bytes.
    fn write_color4b(&mut self, c: Vec4) -> Result<()> {
        let pack = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        self.write_all(&[pack(c.x), pack(c.y), pack(c.z), pack(c.w)])?;
        Ok(())
    }

    /// Write a scene-space [`Mat4`] as the archive's 3x4 layout.
    fn write_matrix3x4(&mut self, m: Mat4) -> Result<()> {
        let basis = axis_basis();
        let file = basis.transpose() * m * basis;

        self.write_vec3(file.x_axis.truncate())?;
        self.write_vec3(file.y_axis.truncate())?;
        self.write_vec3(file.z_axis.truncate())?;
        self.write_vec3(file.w_axis.truncate())?;
        Ok(())
    }
}

impl<W: Write + ?Sized> WritePkgExt for W {}

/// Read the next chunk introducer and name, or `None` at a clean end of file.
///
/// # Errors
/// Returns [`Error::InvalidChunkTag`] if bytes are present but do not start
/// with the fixed `FILE` tag.
pub fn read_chunk_intro<R: Read + Seek>(reader: &mut R) -> Result<Option<String>> {
    let offset = reader.stream_position()?;
    let mut tag = [0u8; 4];
    let mut filled = 0;

    while filled < 4 {
        let n = reader.read(&mut tag[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    if filled == 0 {
        return Ok(None);
    }
    if filled < 4 || tag != CHUNK_TAG {
        return Err(Error::InvalidChunkTag { offset, found: tag });
    }

    Ok(Some(reader.read_angel_string()?))
}

/// Write one chunk: `FILE` tag, name, then the body produced by `body`.
///
/// With `with_length` set (PKG3 framing) a placeholder length word is
/// reserved before the body and patched once the body size is known; the
/// stream is left positioned at the end. The length is only ever written
/// after the full payload exists, so an aborted export never leaves an
/// ambiguous partial length behind.
pub fn write_chunk<W, F>(writer: &mut W, name: &str, with_length: bool, body: F) -> Result<()>
where
    W: Write + Seek,
    F: FnOnce(&mut W) -> Result<()>,
{
    writer.write_all(&CHUNK_TAG)?;
    writer.write_angel_string(name)?;

    if !with_length {
        return body(writer);
    }

    let length_pos = writer.stream_position()?;
    writer.write_u32::<LittleEndian>(0)?;

    let body_start = writer.stream_position()?;
    body(writer)?;
    let body_end = writer.stream_position()?;

    writer.seek(SeekFrom::Start(length_pos))?;
    writer.write_u32::<LittleEndian>((body_end - body_start) as u32)?;
    writer.seek(SeekFrom::Start(body_end))?;
    Ok(())
}
