//! Neutral mesh/material hand-off types
//!
//! These are the host-agnostic structures produced by an import pass and
//! consumed by an export pass. They exist only across the codec boundary;
//! nothing here knows about the on-disk layout.

use glam::{Mat4, Vec2, Vec3, Vec4};

/// One corner of a triangle: a welded vertex index plus the per-corner
/// attributes that are deliberately not part of the weld key on import.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    /// Index into [`Mesh::positions`] / [`Mesh::normals`].
    pub vertex: u32,
    pub uv: Vec2,
    pub color: Vec4,
}

/// A triangle face bound to one material slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub corners: [Corner; 3],
    /// Slot in the shared material table.
    pub material: u32,
}

/// Transform applied to a mesh from its `.mtx` side file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Bound record: only the origin moves the object.
    Bound {
        min: Vec3,
        max: Vec3,
        pivot: Vec3,
        origin: Vec3,
    },
    /// Full 3x4 transform, used for the fixed set of articulated parts.
    Matrix(Mat4),
}

/// One mesh decoded from a geometry chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Chunk name, which is also the object name.
    pub name: String,
    /// Welded vertex positions (scene space).
    pub positions: Vec<Vec3>,
    /// Welded vertex normals, parallel to `positions`; empty when the
    /// source sections carried no normals.
    pub normals: Vec<Vec3>,
    pub faces: Vec<Face>,
    /// Placement from the mesh's `.mtx` side file, when one exists.
    pub placement: Option<Placement>,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Material slots referenced by at least one face, ascending.
    pub fn used_materials(&self) -> Vec<u32> {
        let mut used: Vec<u32> = self.faces.iter().map(|f| f.material).collect();
        used.sort_unstable();
        used.dedup();
        used
    }
}

/// Shader/material parameters for one material slot in one variant.
///
/// Colors are RGBA in `0.0..=1.0` regardless of whether the archive stored
/// them as floats or packed bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialParams {
    /// Texture name without extension; `None` is a matte material.
    pub texture: Option<String>,
    pub diffuse: Vec4,
    pub ambient: Vec4,
    pub specular: Vec4,
    pub emissive: Vec4,
    pub shininess: f32,
    /// Export-side hint: a shadeless material suppresses normals for the
    /// whole archive. Always `false` on import.
    pub shadeless: bool,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            texture: None,
            diffuse: Vec4::ONE,
            ambient: Vec4::ONE,
            specular: Vec4::ZERO,
            emissive: Vec4::ZERO,
            shininess: 0.0,
            shadeless: false,
        }
    }
}

/// How shader colors are stored on disk: one choice for the whole archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Four f32s per color; carries a specular color.
    Float,
    /// Four bytes per color; the layout has no specular slot.
    #[default]
    Byte,
}

/// The full variant set of a `shaders` chunk, variant-major.
///
/// Every variant holds one [`MaterialParams`] per material slot; variant 0
/// is the base paintjob.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderSet {
    pub color_mode: ColorMode,
    pub variants: Vec<Vec<MaterialParams>>,
}

impl ShaderSet {
    /// Number of material slots per variant.
    pub fn slot_count(&self) -> usize {
        self.variants.first().map_or(0, Vec::len)
    }
}

/// A single per-variant material override produced by redundancy collapsing.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantOverride {
    /// Variant index, always non-zero (variant 0 is the base).
    pub variant: usize,
    /// Material slot the override applies to.
    pub slot: usize,
    pub params: MaterialParams,
}

/// Redundancy-collapsed view of a [`ShaderSet`]: the base records plus the
/// sparse per-variant overrides that actually differ from the base.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollapsedVariants {
    pub base: Vec<MaterialParams>,
    pub variant_count: usize,
    pub overrides: Vec<VariantOverride>,
}

/// A named placement reference to an externally stored sub-model.
#[derive(Debug, Clone, PartialEq)]
pub struct Xref {
    pub name: String,
    /// Scene-space transform.
    pub transform: Mat4,
}
