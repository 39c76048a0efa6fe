//! Error and diagnostic types for `angelpkg`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `angelpkg` operations.
///
/// Every variant here is fatal: the import or export pass that raised it is
/// aborted as a whole. Recoverable conditions are reported as [`Diagnostic`]
/// values instead.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with a PKG2 or PKG3 magic.
    #[error("invalid PKG magic: expected PKG2 or PKG3, found {0:?}")]
    InvalidPkgMagic([u8; 4]),

    /// A chunk did not start with the fixed `FILE` introducer tag.
    #[error("missing FILE chunk tag at offset {offset}, found {found:?}")]
    InvalidChunkTag {
        /// Absolute stream offset where the tag was expected.
        offset: u64,
        /// The four bytes actually present.
        found: [u8; 4],
    },

    /// A PKG3 chunk declared a zero payload length.
    ///
    /// A small batch of original archives shipped with this corruption; such
    /// files cannot be parsed further.
    #[error("corrupt PKG3 archive: chunk '{name}' has zero payload length")]
    ZeroLengthChunk {
        /// Name of the offending chunk.
        name: String,
    },

    /// The shaders chunk header declared a variant count of zero.
    #[error("shaders chunk declares zero variants")]
    EmptyShaderSet,

    /// A shader set record count or variant shape did not line up on export.
    #[error("shader variant {variant} has {got} records, expected {expected}")]
    VariantShapeMismatch {
        /// Index of the malformed variant.
        variant: usize,
        /// Records supplied.
        got: usize,
        /// Records required (material slot count).
        expected: usize,
    },

    /// A mesh section referenced a material slot outside the supplied table.
    #[error("mesh '{mesh}' references material slot {slot}, table has {table_len}")]
    MaterialSlotOutOfRange {
        /// Name of the mesh being exported.
        mesh: String,
        /// The out-of-range slot.
        slot: u32,
        /// Size of the material table.
        table_len: usize,
    },

    /// A string field contained invalid UTF-8.
    #[error("invalid UTF-8 in string field: {0}")]
    InvalidString(#[from] std::string::FromUtf8Error),

    /// A string was too long for the u8 length prefix (payload plus
    /// terminator must fit 255).
    #[error("string of {len} bytes does not fit a length-prefixed field")]
    StringTooLong {
        /// Payload length in bytes.
        len: usize,
    },

    /// A face corner referenced a vertex past the end of the mesh's vertex
    /// array on export.
    #[error("mesh '{mesh}' face corner references vertex {index}, mesh has {vertex_count}")]
    VertexIndexOutOfRange {
        /// Name of the mesh being exported.
        mesh: String,
        /// The out-of-range vertex index.
        index: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// A `.mtx` side file was not exactly 48 bytes.
    #[error("MTX side file {path:?} is {len} bytes, expected 48")]
    InvalidMtxSize {
        /// Path of the side file.
        path: PathBuf,
        /// Actual size on disk.
        len: u64,
    },

    /// The TEX header carried a format code this codec does not know.
    #[error("unsupported TEX format code: {0}")]
    UnsupportedTexFormat(u16),

    /// A TEX mip payload was shorter than its computed size.
    #[error("TEX mip level {level} truncated: need {need} bytes, have {have}")]
    TruncatedMip {
        /// Mip level index.
        level: usize,
        /// Bytes required by the format stride.
        need: usize,
        /// Bytes actually available.
        have: usize,
    },

    /// Failed to encode a decoded texture as PNG.
    #[error("failed to encode PNG: {0}")]
    PngEncodeFailed(String),
}

/// Non-fatal conditions collected during an import or export pass.
///
/// The pass keeps going past these, and the caller receives the full list
/// alongside the result instead of log noise.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A face referenced a vertex index past the end of its section's
    /// vertex block. The face is skipped.
    #[error("mesh '{mesh}' section {section}: face index {index} out of range (have {vertex_count} vertices)")]
    FaceIndexOutOfRange {
        /// Name of the mesh chunk.
        mesh: String,
        /// Zero-based section number within the chunk.
        section: usize,
        /// The offending index after strip expansion.
        index: u32,
        /// Number of vertices actually read for the mesh.
        vertex_count: usize,
    },

    /// A shader record referenced a texture that was not found at any
    /// searched path. The caller decides on a placeholder policy.
    #[error("texture '{name}' not found in any search root")]
    MissingTexture {
        /// Texture name as stored in the archive (no extension).
        name: String,
    },

    /// A `.mtx` side file for a mesh was looked up but does not exist.
    #[error("no MTX side file for mesh '{mesh}'")]
    MissingMtx {
        /// Name of the mesh chunk.
        mesh: String,
    },
}

/// A specialized Result type for `angelpkg` operations.
pub type Result<T> = std::result::Result<T, Error>;
