//! Flexible Vertex Format descriptor
//!
//! Each geometry chunk carries a 32-bit FVF word describing which per-vertex
//! attributes its sections contain. The bit values are the original D3D FVF
//! constants; position is implicit and always present.

/// Bitmask over the per-vertex attributes of a mesh section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fvf(u32);

impl Fvf {
    /// `D3DFVF_XYZ` - implicit, every vertex starts with a raw position.
    pub const POSITION: u32 = 0x002;
    /// `D3DFVF_NORMAL`
    pub const NORMAL: u32 = 0x010;
    /// `D3DFVF_DIFFUSE`
    pub const DIFFUSE: u32 = 0x040;
    /// `D3DFVF_SPECULAR`
    pub const SPECULAR: u32 = 0x080;
    /// `D3DFVF_TEX1`
    pub const TEX1: u32 = 0x100;

    /// Wrap a raw FVF word read from a geometry header.
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw word as written to the geometry header.
    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn has_normal(self) -> bool {
        self.0 & Self::NORMAL != 0
    }

    pub const fn has_diffuse(self) -> bool {
        self.0 & Self::DIFFUSE != 0
    }

    pub const fn has_specular(self) -> bool {
        self.0 & Self::SPECULAR != 0
    }

    /// Whether vertices carry a packed color at all (either color flag).
    pub const fn has_color(self) -> bool {
        self.has_diffuse() || self.has_specular()
    }

    pub const fn has_uv(self) -> bool {
        self.0 & Self::TEX1 != 0
    }

    /// Drop the normal attribute; used on export when a shadeless material
    /// means normals would never be consumed.
    pub fn clear_normal(&mut self) {
        self.0 &= !Self::NORMAL;
    }

    pub fn set_diffuse(&mut self) {
        self.0 |= Self::DIFFUSE;
    }

    pub fn set_specular(&mut self) {
        self.0 |= Self::SPECULAR;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_bits() {
        let fvf = Fvf::new(Fvf::POSITION | Fvf::NORMAL | Fvf::TEX1);
        assert!(fvf.has_normal());
        assert!(fvf.has_uv());
        assert!(!fvf.has_color());
        assert_eq!(0x112, fvf.bits());
    }

    #[test]
    fn test_export_mutations() {
        let mut fvf = Fvf::new(Fvf::POSITION | Fvf::NORMAL | Fvf::TEX1);
        fvf.clear_normal();
        assert!(!fvf.has_normal());

        fvf.set_diffuse();
        fvf.set_specular();
        assert!(fvf.has_diffuse() && fvf.has_specular() && fvf.has_color());
    }
}
