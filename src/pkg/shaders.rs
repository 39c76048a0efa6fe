//! Shader variant-set codec
//!
//! The `shaders` chunk stores the archive's material table once per paint
//! variant. The first header word doubles as variant count and color-mode
//! marker: values above 128 mean packed byte colors and count minus 128
//! variants. Byte records have no specular slot.
//!
//! Most archives repeat near-identical tables per variant, so imports also
//! get a collapsed view: the base table plus only the records a variant
//! actually changes.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec4;
use tracing::debug;

use crate::binary::{ReadPkgExt, WritePkgExt};
use crate::error::{Error, Result};
use crate::scene::{
    CollapsedVariants, ColorMode, MaterialParams, ShaderSet, VariantOverride,
};

/// Header bias marking byte-mode color storage.
const BYTE_MODE_BIAS: u32 = 128;

fn read_record<R: Read>(reader: &mut R, mode: ColorMode) -> Result<MaterialParams> {
    let name = reader.read_angel_string()?;
    let mut params = MaterialParams {
        texture: if name.is_empty() { None } else { Some(name) },
        ..MaterialParams::default()
    };

    match mode {
        ColorMode::Float => {
            params.diffuse = reader.read_color4f()?;
            params.ambient = reader.read_color4f()?;
            params.specular = reader.read_color4f()?;
            params.emissive = reader.read_color4f()?;
        }
        ColorMode::Byte => {
            params.diffuse = reader.read_color4b()?;
            params.ambient = reader.read_color4b()?;
            params.emissive = reader.read_color4b()?;
            params.specular = Vec4::ZERO;
        }
    }
    params.shininess = reader.read_f32::<LittleEndian>()?;
    Ok(params)
}

fn write_record<W: Write>(
    writer: &mut W,
    params: &MaterialParams,
    mode: ColorMode,
) -> Result<()> {
    writer.write_angel_string(params.texture.as_deref().unwrap_or(""))?;
    match mode {
        ColorMode::Float => {
            writer.write_color4f(params.diffuse)?;
            writer.write_color4f(params.ambient)?;
            writer.write_color4f(params.specular)?;
            writer.write_color4f(params.emissive)?;
        }
        ColorMode::Byte => {
            writer.write_color4b(params.diffuse)?;
            writer.write_color4b(params.ambient)?;
            writer.write_color4b(params.emissive)?;
        }
    }
    writer.write_f32::<LittleEndian>(params.shininess)?;
    Ok(())
}

/// Decode a `shaders` chunk payload.
///
/// # Errors
///
/// Returns [`Error::EmptyShaderSet`] when the header declares zero
/// variants, besides the usual I/O and string failures.
pub fn read_shader_set<R: Read>(reader: &mut R) -> Result<ShaderSet> {
    let raw = reader.read_u32::<LittleEndian>()?;
    let slots = reader.read_u32::<LittleEndian>()? as usize;

    let (color_mode, variant_count) = if raw > BYTE_MODE_BIAS {
        (ColorMode::Byte, raw - BYTE_MODE_BIAS)
    } else {
        (ColorMode::Float, raw)
    };
    if variant_count == 0 {
        return Err(Error::EmptyShaderSet);
    }

    debug!(variant_count, slots, ?color_mode, "decoding shader set");

    let mut variants = Vec::with_capacity(variant_count as usize);
    for _ in 0..variant_count {
        let mut variant = Vec::with_capacity(slots);
        for _ in 0..slots {
            variant.push(read_record(reader, color_mode)?);
        }
        variants.push(variant);
    }

    Ok(ShaderSet {
        color_mode,
        variants,
    })
}

/// Encode a `shaders` chunk payload.
///
/// # Errors
///
/// Returns [`Error::EmptyShaderSet`] for a set with no variants and
/// [`Error::VariantShapeMismatch`] when variants disagree on slot count.
pub fn write_shader_set<W: Write>(writer: &mut W, set: &ShaderSet) -> Result<()> {
    if set.variants.is_empty() {
        return Err(Error::EmptyShaderSet);
    }
    let slots = set.slot_count();
    for (variant, records) in set.variants.iter().enumerate() {
        if records.len() != slots {
            return Err(Error::VariantShapeMismatch {
                variant,
                got: records.len(),
                expected: slots,
            });
        }
    }

    let mut raw = set.variants.len() as u32;
    if set.color_mode == ColorMode::Byte {
        raw += BYTE_MODE_BIAS;
    }
    writer.write_u32::<LittleEndian>(raw)?;
    writer.write_u32::<LittleEndian>(slots as u32)?;

    for records in &set.variants {
        for params in records {
            write_record(writer, params, set.color_mode)?;
        }
    }
    Ok(())
}

/// Collapse a variant set to its base table plus sparse overrides.
///
/// Variant 0 becomes the base; every later record is kept only where it
/// differs from the base record in the same slot.
pub fn collapse_variants(set: &ShaderSet) -> CollapsedVariants {
    let Some((base, rest)) = set.variants.split_first() else {
        return CollapsedVariants::default();
    };

    let mut overrides = Vec::new();
    for (variant, records) in rest.iter().enumerate() {
        for (slot, params) in records.iter().enumerate() {
            if base.get(slot) != Some(params) {
                overrides.push(VariantOverride {
                    variant: variant + 1,
                    slot,
                    params: params.clone(),
                });
            }
        }
    }

    CollapsedVariants {
        base: base.clone(),
        variant_count: set.variants.len(),
        overrides,
    }
}

/// Rebuild the full variant-major table from a collapsed view.
pub fn expand_variants(collapsed: &CollapsedVariants, color_mode: ColorMode) -> ShaderSet {
    let mut variants = vec![collapsed.base.clone(); collapsed.variant_count.max(1)];
    for over in &collapsed.overrides {
        if let Some(slot) = variants
            .get_mut(over.variant)
            .and_then(|v| v.get_mut(over.slot))
        {
            *slot = over.params.clone();
        }
    }
    ShaderSet {
        color_mode,
        variants,
    }
}
