//! TEX pixel decoding to RGBA images
//!
//! Each format decodes into straight 8-bit RGBA. 5-bit channels expand by
//! bit replication and 4-bit formats take the low nibble for even columns,
//! so a repeated palette index fills a row instead of striping it.

use std::path::Path;

use image::RgbaImage;
use tracing::debug;

use crate::error::{Error, Result};

use super::{read_tex_file, TexFile, TexFormat};

/// Expand a 5-bit channel to 8 bits by bit replication.
const fn expand5(v: u8) -> u8 {
    (v << 3) | (v >> 2)
}

fn palette_entry(tex: &TexFile, index: usize) -> [u8; 4] {
    tex.palette.get(index).copied().unwrap_or([0, 0, 0, 255])
}

fn decode_pixel(tex: &TexFile, mip: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    match tex.format {
        TexFormat::P8 | TexFormat::Pa8 => {
            let idx = mip[(y * width + x) as usize];
            palette_entry(tex, idx as usize)
        }
        TexFormat::P8A8 => {
            let at = ((y * width + x) * 2) as usize;
            let mut rgba = palette_entry(tex, mip[at] as usize);
            rgba[3] = mip[at + 1];
            rgba
        }
        TexFormat::P4 | TexFormat::Pa4 => {
            let at = ((y * width + x) / 2) as usize;
            let byte = mip[at];
            let idx = if x % 2 == 0 { byte & 0x0F } else { byte >> 4 };
            palette_entry(tex, idx as usize)
        }
        TexFormat::A1R5G5B5 => {
            let at = ((y * width + x) * 2) as usize;
            let v = u16::from_le_bytes([mip[at], mip[at + 1]]);
            let a = if v & 0x8000 != 0 { 255 } else { 0 };
            [
                expand5(((v >> 10) & 0x1F) as u8),
                expand5(((v >> 5) & 0x1F) as u8),
                expand5((v & 0x1F) as u8),
                a,
            ]
        }
        TexFormat::Rgb888 => {
            let at = ((y * width + x) * 3) as usize;
            [mip[at], mip[at + 1], mip[at + 2], 255]
        }
        TexFormat::Rgba8888 => {
            let at = ((y * width + x) * 4) as usize;
            [mip[at], mip[at + 1], mip[at + 2], mip[at + 3]]
        }
    }
}

/// Decode one mip level into an RGBA image.
///
/// # Errors
///
/// Returns [`Error::TruncatedMip`] when the level is absent from the file's
/// mip chain.
pub fn decode_mip(tex: &TexFile, level: usize) -> Result<RgbaImage> {
    let (width, height) = tex.mip_dimensions(level);
    let mip = tex.mips.get(level).ok_or(Error::TruncatedMip {
        level,
        need: tex.format.mip_byte_len(width, height),
        have: 0,
    })?;

    let mut out = RgbaImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            out.put_pixel(x, y, image::Rgba(decode_pixel(tex, mip, width, x, y)));
        }
    }
    Ok(out)
}

/// Decode the TEX file at `tex_path` and write its top mip as PNG.
pub fn tex_to_png(tex_path: impl AsRef<Path>, png_path: impl AsRef<Path>) -> Result<()> {
    let tex = read_tex_file(tex_path.as_ref())?;
    let image = decode_mip(&tex, 0)?;
    debug!(
        from = %tex_path.as_ref().display(),
        to = %png_path.as_ref().display(),
        "converting TEX to PNG"
    );
    image
        .save(png_path.as_ref())
        .map_err(|e| Error::PngEncodeFailed(e.to_string()))
}
