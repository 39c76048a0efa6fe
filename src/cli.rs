//! angelpkg CLI - command-line front end for the PKG and TEX codecs

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use glam::Vec3;

use crate::pkg::{export_pkg, import_pkg, ExportOptions, PkgVersion};
use crate::scene::ColorMode;
use crate::tex::tex_to_png;

#[derive(Parser)]
#[command(name = "angelpkg")]
#[command(about = "Angel Studios PKG/TEX model and texture tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of a PKG archive
    Info {
        /// Source PKG file
        source: PathBuf,
    },

    /// Import a PKG archive and write it back out
    Rewrite {
        /// Source PKG file
        #[arg(short, long)]
        source: PathBuf,

        /// Output PKG file
        #[arg(short, long)]
        destination: PathBuf,

        /// Write PKG2 framing instead of PKG3
        #[arg(long)]
        pkg2: bool,

        /// Store shader colors as floats instead of packed bytes
        #[arg(long)]
        float_colors: bool,
    },

    /// Convert a TEX texture to PNG
    Tex2png {
        /// Source TEX file
        #[arg(short, long)]
        source: PathBuf,

        /// Output PNG file (defaults to the source with a .png extension)
        #[arg(short, long)]
        destination: Option<PathBuf>,
    },
}

impl Commands {
    fn execute(self) -> anyhow::Result<()> {
        match self {
            Self::Info { source } => {
                let result = import_pkg(&source)?;
                println!("{}", source.display());
                println!("  meshes:   {}", result.meshes.len());
                for mesh in &result.meshes {
                    println!(
                        "    {} ({} vertices, {} faces)",
                        mesh.name,
                        mesh.positions.len(),
                        mesh.faces.len()
                    );
                }
                println!(
                    "  shaders:  {} slots x {} variants ({} overrides off the base)",
                    result.shaders.slot_count(),
                    result.shaders.variants.len(),
                    result.variants.overrides.len()
                );
                println!("  xrefs:    {}", result.xrefs.len());
                if let Some(origin) = result.origin {
                    println!("  origin:   {origin}");
                }
                for diagnostic in &result.diagnostics {
                    println!("  warning:  {diagnostic}");
                }
                Ok(())
            }
            Self::Rewrite {
                source,
                destination,
                pkg2,
                float_colors,
            } => {
                let result = import_pkg(&source)?;
                let options = ExportOptions {
                    version: if pkg2 { PkgVersion::Pkg2 } else { PkgVersion::Pkg3 },
                    color_mode: if float_colors {
                        ColorMode::Float
                    } else {
                        ColorMode::Byte
                    },
                    ..ExportOptions::default()
                };
                export_pkg(
                    &destination,
                    &result.meshes,
                    &result.shaders,
                    &result.xrefs,
                    result.origin.unwrap_or(Vec3::ZERO),
                    &options,
                )?;
                println!(
                    "rewrote {} -> {} ({} meshes)",
                    source.display(),
                    destination.display(),
                    result.meshes.len()
                );
                Ok(())
            }
            Self::Tex2png {
                source,
                destination,
            } => {
                let destination =
                    destination.unwrap_or_else(|| source.with_extension("png"));
                tex_to_png(&source, &destination)?;
                println!("wrote {}", destination.display());
                Ok(())
            }
        }
    }
}

/// Run the angelpkg CLI
pub fn run_cli() -> anyhow::Result<()> {
    // Setup logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    cli.command.execute()?;

    Ok(())
}
