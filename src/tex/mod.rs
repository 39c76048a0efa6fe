//! TEX texture container
//!
//! The sibling `.tex` format holds palettized or direct-color images with
//! optional mip chains: a 14-byte header, an optional BGRA palette, then
//! the mip payloads tightly packed from largest to smallest.

pub mod decode;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::debug;

use crate::error::{Error, Result};

pub use decode::{decode_mip, tex_to_png};

/// Pixel storage formats a TEX header may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexFormat {
    /// 8-bit palette indices, palette forced opaque.
    P8,
    /// 8-bit palette index plus an 8-bit alpha byte per pixel.
    P8A8,
    /// Direct 16-bit color, 1-bit alpha and 5 bits per channel.
    A1R5G5B5,
    /// 8-bit palette indices with palette alpha.
    Pa8,
    /// 4-bit palette indices, palette forced opaque.
    P4,
    /// 4-bit palette indices with palette alpha.
    Pa4,
    /// Direct 24-bit RGB.
    Rgb888,
    /// Direct 32-bit RGBA.
    Rgba8888,
}

impl TexFormat {
    /// Map a header format code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedTexFormat`] for unknown codes.
    pub fn from_raw(raw: u16) -> Result<Self> {
        match raw {
            1 => Ok(Self::P8),
            2 => Ok(Self::P8A8),
            6 => Ok(Self::A1R5G5B5),
            14 => Ok(Self::Pa8),
            15 => Ok(Self::P4),
            16 => Ok(Self::Pa4),
            17 => Ok(Self::Rgb888),
            18 => Ok(Self::Rgba8888),
            other => Err(Error::UnsupportedTexFormat(other)),
        }
    }

    pub const fn raw(self) -> u16 {
        match self {
            Self::P8 => 1,
            Self::P8A8 => 2,
            Self::A1R5G5B5 => 6,
            Self::Pa8 => 14,
            Self::P4 => 15,
            Self::Pa4 => 16,
            Self::Rgb888 => 17,
            Self::Rgba8888 => 18,
        }
    }

    /// Bytes per pixel; negative values mean pixels per byte.
    pub const fn stride(self) -> i32 {
        match self {
            Self::P8 | Self::Pa8 => 1,
            Self::P8A8 | Self::A1R5G5B5 => 2,
            Self::P4 | Self::Pa4 => -2,
            Self::Rgb888 => 3,
            Self::Rgba8888 => 4,
        }
    }

    /// Number of palette entries, zero for direct-color formats.
    pub const fn palette_len(self) -> usize {
        match self {
            Self::P4 | Self::Pa4 => 16,
            Self::P8 | Self::P8A8 | Self::Pa8 => 256,
            Self::A1R5G5B5 | Self::Rgb888 | Self::Rgba8888 => 0,
        }
    }

    /// Formats whose palette alpha is meaningless and forced opaque.
    pub const fn forces_opaque_palette(self) -> bool {
        matches!(self, Self::P8 | Self::P4)
    }

    /// Whether decoded pixels can carry non-opaque alpha.
    pub const fn has_alpha(self) -> bool {
        !matches!(self, Self::P8 | Self::P4 | Self::Rgb888)
    }

    /// Payload size in bytes of a `width` x `height` mip.
    pub const fn mip_byte_len(self, width: u32, height: u32) -> usize {
        let pixels = (width * height) as usize;
        let stride = self.stride();
        if stride < 0 {
            pixels / ((-stride) as usize)
        } else {
            pixels * stride as usize
        }
    }
}

/// A parsed TEX file: header fields, palette in RGBA order, raw mips.
#[derive(Debug, Clone)]
pub struct TexFile {
    pub width: u16,
    pub height: u16,
    pub format: TexFormat,
    pub flags: u32,
    /// RGBA palette entries; empty for direct-color formats.
    pub palette: Vec<[u8; 4]>,
    /// Raw mip payloads, largest first.
    pub mips: Vec<Vec<u8>>,
}

impl TexFile {
    /// Pixel dimensions of a mip level (level 0 is the full image).
    pub fn mip_dimensions(&self, level: usize) -> (u32, u32) {
        (
            u32::from(self.width) >> level,
            u32::from(self.height) >> level,
        )
    }
}

/// Parse a TEX stream.
///
/// Mip levels whose computed size reaches zero end the chain early, as do
/// files whose header over-declares the count; a mip that is present but
/// short is an error.
pub fn read_tex<R: Read>(reader: &mut R) -> Result<TexFile> {
    let width = reader.read_u16::<LittleEndian>()?;
    let height = reader.read_u16::<LittleEndian>()?;
    let format = TexFormat::from_raw(reader.read_u16::<LittleEndian>()?)?;
    let mip_count = reader.read_u16::<LittleEndian>()?;
    let _reserved = reader.read_u16::<LittleEndian>()?;
    let flags = reader.read_u32::<LittleEndian>()?;

    debug!(width, height, ?format, mip_count, "decoding TEX header");

    let mut palette = Vec::with_capacity(format.palette_len());
    for _ in 0..format.palette_len() {
        let mut bgra = [0u8; 4];
        reader.read_exact(&mut bgra)?;
        let alpha = if format.forces_opaque_palette() {
            255
        } else {
            bgra[3]
        };
        palette.push([bgra[2], bgra[1], bgra[0], alpha]);
    }

    let mut mips = Vec::new();
    for level in 0..mip_count as usize {
        let (w, h) = (
            u32::from(width) >> level,
            u32::from(height) >> level,
        );
        let need = format.mip_byte_len(w, h);
        if need == 0 {
            break;
        }
        let mut data = Vec::with_capacity(need);
        reader.take(need as u64).read_to_end(&mut data)?;
        if data.len() < need {
            return Err(Error::TruncatedMip {
                level,
                need,
                have: data.len(),
            });
        }
        mips.push(data);
    }

    Ok(TexFile {
        width,
        height,
        format,
        flags,
        palette,
        mips,
    })
}

/// Parse the TEX file at `path`.
pub fn read_tex_file(path: impl AsRef<Path>) -> Result<TexFile> {
    read_tex(&mut BufReader::new(File::open(path)?))
}
