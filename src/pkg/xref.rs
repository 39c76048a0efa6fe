//! External-reference chunk codec
//!
//! The `xrefs` chunk places externally stored sub-models: a u32 count
//! followed by one record per reference, each a 3x4 placement matrix and a
//! 32-byte zero-padded name. Names in shipped archives carry a `\0max`
//! marker after the terminator; it is written here too and discarded on
//! read along with the rest of the padding.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::binary::{ReadPkgExt, WritePkgExt};
use crate::error::Result;
use crate::scene::Xref;

const NAME_FIELD_LEN: usize = 32;
const NAME_MARKER: &[u8] = b"\0max";

/// Decode an `xrefs` chunk payload.
pub fn read_xrefs<R: Read>(reader: &mut R) -> Result<Vec<Xref>> {
    let count = reader.read_u32::<LittleEndian>()?;
    debug!(count, "decoding xrefs");

    let mut xrefs = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let transform = reader.read_matrix3x4()?;
        let mut raw = [0u8; NAME_FIELD_LEN];
        reader.read_exact(&mut raw)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(NAME_FIELD_LEN);
        let name = String::from_utf8(raw[..end].to_vec())?;
        xrefs.push(Xref { name, transform });
    }
    Ok(xrefs)
}

/// Encode an `xrefs` chunk payload; names longer than the marker allows
/// are truncated to fit the 32-byte field.
pub fn write_xrefs<W: Write>(writer: &mut W, xrefs: &[Xref]) -> Result<()> {
    writer.write_u32::<LittleEndian>(xrefs.len() as u32)?;
    for xref in xrefs {
        writer.write_matrix3x4(xref.transform)?;

        let mut field = [0u8; NAME_FIELD_LEN];
        let max_name = NAME_FIELD_LEN - NAME_MARKER.len();
        let name = xref.name.as_bytes();
        let len = name.len().min(max_name);
        field[..len].copy_from_slice(&name[..len]);
        field[len..len + NAME_MARKER.len()].copy_from_slice(NAME_MARKER);
        writer.write_all(&field)?;
    }
    Ok(())
}
