//! Primitive topology codec
//!
//! Sections store their indices either as a plain triangle list or as
//! flagged triangle strips. A strip index is a u16 with two control bits:
//! bit 15 ends the current strip, bit 14 requests clockwise winding for the
//! whole strip (it is latched from the strip's first code and ignored
//! elsewhere). The low 14 bits are the vertex index.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Result;

/// End-of-strip control bit.
pub const STRIP_END: u16 = 0x8000;
/// Clockwise-winding control bit, meaningful on a strip's first code.
pub const STRIP_CW: u16 = 0x4000;
/// Mask extracting the vertex index from a strip code.
pub const STRIP_INDEX_MASK: u16 = 0x3FFF;

/// How a section's indices are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    TriangleList,
    TriangleStrip,
}

impl PrimitiveKind {
    /// Map a raw primitive type to a kind. Type 4 is a strip; everything
    /// else (3 in practice) is treated as a list.
    pub fn from_raw(raw: u32) -> Self {
        if raw == 4 {
            Self::TriangleStrip
        } else {
            Self::TriangleList
        }
    }

    pub const fn raw(self) -> u32 {
        match self {
            Self::TriangleList => 3,
            Self::TriangleStrip => 4,
        }
    }
}

/// Read `count` triangle-list indices. Indices are u16 regardless of the
/// section's compact flag; only the surrounding counts widen.
pub fn read_list_indices<R: Read>(reader: &mut R, count: usize) -> Result<Vec<u32>> {
    let mut indices = Vec::with_capacity(count);
    for _ in 0..count {
        indices.push(u32::from(reader.read_u16::<LittleEndian>()?));
    }
    Ok(indices)
}

/// Write triangle-list indices.
pub fn write_list_indices<W: Write>(writer: &mut W, indices: &[u32]) -> Result<()> {
    for &index in indices {
        writer.write_u16::<LittleEndian>(index as u16)?;
    }
    Ok(())
}

/// Decode `count` flagged strip codes into a flat triangle list.
///
/// Winding is latched from each strip's first code: a clockwise strip emits
/// `(a, c, b)` per window, a counter-clockwise one `(a, b, c)`. Alternating
/// parity flips the middle pair on odd windows, and windows containing a
/// repeated index are dropped without consuming a parity step.
pub fn read_strip_indices<R: Read>(reader: &mut R, count: usize) -> Result<Vec<u32>> {
    let mut triangles = Vec::new();
    let mut strip: Vec<u32> = Vec::new();
    let mut clockwise = false;

    for _ in 0..count {
        let code = reader.read_u16::<LittleEndian>()?;
        if strip.is_empty() {
            clockwise = code & STRIP_CW != 0;
        }
        strip.push(u32::from(code & STRIP_INDEX_MASK));
        if code & STRIP_END != 0 {
            expand_strip(&strip, clockwise, &mut triangles);
            strip.clear();
        }
    }
    // A truncated final strip still contributes its complete windows.
    if !strip.is_empty() {
        expand_strip(&strip, clockwise, &mut triangles);
    }

    Ok(triangles)
}

fn expand_strip(strip: &[u32], clockwise: bool, triangles: &mut Vec<u32>) {
    let mut flip = false;
    for window in strip.windows(3) {
        let (a, b, c) = (window[0], window[1], window[2]);
        if a == b || b == c || a == c {
            // Degenerate window: skipped, and it does not advance parity.
            continue;
        }
        let (b, c) = if clockwise != flip { (c, b) } else { (b, c) };
        triangles.extend_from_slice(&[a, b, c]);
        flip = !flip;
    }
}

/// Encode a flat triangle list as one strip code stream.
///
/// No stripification is attempted: each triangle becomes its own
/// three-code strip with the end bit on the last code, which every strip
/// decoder accepts. Returns the number of codes written.
pub fn write_triangles_as_strips<W: Write>(writer: &mut W, triangles: &[u32]) -> Result<usize> {
    for tri in triangles.chunks_exact(3) {
        writer.write_u16::<LittleEndian>(tri[0] as u16)?;
        writer.write_u16::<LittleEndian>(tri[1] as u16)?;
        writer.write_u16::<LittleEndian>(tri[2] as u16 | STRIP_END)?;
    }
    Ok(triangles.len())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn codes(codes: &[u16]) -> Vec<u8> {
        codes.iter().flat_map(|c| c.to_le_bytes()).collect()
    }

    #[test]
    fn test_ccw_strip_alternates_parity() {
        // Strip 0 1 2 3 4, counter-clockwise.
        let buf = codes(&[0, 1, 2, 3, 4 | STRIP_END]);
        let tris = read_strip_indices(&mut &buf[..], 5).unwrap();
        assert_eq!(vec![0, 1, 2, 1, 3, 2, 2, 3, 4], tris);
    }

    #[test]
    fn test_cw_strip_swaps_first_window() {
        let buf = codes(&[0 | STRIP_CW, 1, 2, 3, 4 | STRIP_END]);
        let tris = read_strip_indices(&mut &buf[..], 5).unwrap();
        assert_eq!(vec![0, 2, 1, 1, 2, 3, 2, 4, 3], tris);
    }

    #[test]
    fn test_degenerate_window_keeps_parity() {
        // Strip 0 1 1 2 3, clockwise: the two windows containing the
        // repeated index vanish and the surviving window keeps the parity
        // it would have had without them.
        let buf = codes(&[0 | STRIP_CW, 1, 1, 2, 3 | STRIP_END]);
        let tris = read_strip_indices(&mut &buf[..], 5).unwrap();
        assert_eq!(vec![1, 3, 2], tris);
    }

    #[test]
    fn test_cw_bit_latched_from_first_code_only() {
        // The CW bit on a later code of the same strip is ignored.
        let buf = codes(&[0, 1 | STRIP_CW, 2 | STRIP_END]);
        let tris = read_strip_indices(&mut &buf[..], 3).unwrap();
        assert_eq!(vec![0, 1, 2], tris);
    }

    #[test]
    fn test_multiple_strips_rewind() {
        let buf = codes(&[
            0 | STRIP_CW,
            1,
            2 | STRIP_END,
            3,
            4,
            5 | STRIP_END,
        ]);
        let tris = read_strip_indices(&mut &buf[..], 6).unwrap();
        assert_eq!(vec![0, 2, 1, 3, 4, 5], tris);
    }

    #[test]
    fn test_truncated_strip_still_expands() {
        let buf = codes(&[0, 1, 2, 3]);
        let tris = read_strip_indices(&mut &buf[..], 4).unwrap();
        assert_eq!(vec![0, 1, 2, 1, 3, 2], tris);
    }

    #[test]
    fn test_list_roundtrip() {
        let indices = vec![0u32, 1, 2, 2, 1, 3];
        let mut buf = Vec::new();
        write_list_indices(&mut buf, &indices).unwrap();
        assert_eq!(indices, read_list_indices(&mut &buf[..], 6).unwrap());
    }

    #[test]
    fn test_strip_write_roundtrips_through_reader() {
        let triangles = vec![0u32, 1, 2, 2, 1, 3];
        let mut buf = Vec::new();
        let count = write_triangles_as_strips(&mut buf, &triangles).unwrap();
        assert_eq!(6, count);
        assert_eq!(
            triangles,
            read_strip_indices(&mut &buf[..], count).unwrap()
        );
    }

    #[test]
    fn test_primitive_kind_mapping() {
        assert_eq!(PrimitiveKind::TriangleList, PrimitiveKind::from_raw(3));
        assert_eq!(PrimitiveKind::TriangleStrip, PrimitiveKind::from_raw(4));
        assert_eq!(PrimitiveKind::TriangleList, PrimitiveKind::from_raw(99));
    }
}
