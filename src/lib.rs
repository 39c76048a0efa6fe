//! # angelpkg
//!
//! A pure-Rust codec for the Angel Studios PKG model container used by the
//! Midtown Madness and Midnight Club games, plus the sibling TEX texture
//! format.
//!
//! ## Supported Formats
//!
//! - **PKG2/PKG3 archives** - chunked model containers holding geometry,
//!   paintjob shader variant sets, external references and a model origin
//! - **MTX side files** - 48-byte bound/matrix placements next to vehicle
//!   archives
//! - **TEX textures** - palettized and direct-color images with mip chains,
//!   decodable to PNG
//!
//! ## Quick Start
//!
//! ### Importing an archive
//!
//! ```no_run
//! use angelpkg::pkg::import_pkg;
//!
//! let result = import_pkg("vpcop.pkg")?;
//! for mesh in &result.meshes {
//!     println!("{}: {} faces", mesh.name, mesh.faces.len());
//! }
//! for diagnostic in &result.diagnostics {
//!     eprintln!("warning: {diagnostic}");
//! }
//! # Ok::<(), angelpkg::Error>(())
//! ```
//!
//! ### Exporting a scene
//!
//! ```no_run
//! use angelpkg::pkg::{export_pkg, import_pkg, ExportOptions};
//! use glam::Vec3;
//!
//! let result = import_pkg("vpcop.pkg")?;
//! export_pkg(
//!     "vpcop_copy.pkg",
//!     &result.meshes,
//!     &result.shaders,
//!     &result.xrefs,
//!     result.origin.unwrap_or(Vec3::ZERO),
//!     &ExportOptions::default(),
//! )?;
//! # Ok::<(), angelpkg::Error>(())
//! ```
//!
//! ### Converting a texture
//!
//! ```no_run
//! angelpkg::tex::tex_to_png("body.tex", "body.png")?;
//! # Ok::<(), angelpkg::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `angelpkg` command-line binary

pub mod binary;
pub mod error;
pub mod fvf;
pub mod pkg;
pub mod scene;
pub mod tex;

#[cfg(feature = "cli")]
pub mod cli;

// Re-exports for convenience
pub use error::{Diagnostic, Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Diagnostic, Error, Result};
    pub use crate::fvf::Fvf;
    pub use crate::pkg::{
        export_pkg, import_pkg, import_pkg_with_context, sniff_version, ExportOptions,
        ImportContext, ImportResult, PkgReader, PkgVersion, PkgWriter,
    };
    pub use crate::scene::{
        CollapsedVariants, ColorMode, Corner, Face, MaterialParams, Mesh, Placement, ShaderSet,
        VariantOverride, Xref,
    };
    pub use crate::tex::{decode_mip, read_tex_file, tex_to_png, TexFile, TexFormat};
}
