//! `.mtx` side file codec
//!
//! Vehicle archives place some meshes through 48-byte `.mtx` files next to
//! the archive, named `<pkgstem>_<RAWNAME>.mtx`. The raw name is the mesh
//! name uppercased with its LOD suffix stripped. The same 48 bytes mean two
//! different things: for the fixed set of articulated part names they hold
//! a 3x4 transform, for everything else a bound record of four points where
//! only the origin places the object.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use tracing::debug;

use crate::binary::{vec3_to_file, vec3_to_scene, ReadPkgExt, WritePkgExt};
use crate::error::{Error, Result};
use crate::scene::Placement;

/// Names whose `.mtx` holds a full transform instead of a bound record.
const MATRIX_OBJECTS: [&str; 14] = [
    "AXLE0", "AXLE1", "SHOCK0", "SHOCK1", "SHOCK2", "SHOCK3", "ARM0", "ARM1", "ARM2", "ARM3",
    "SHAFT2", "SHAFT3", "DRIVER", "ENGINE",
];

/// Uppercase a mesh name and strip its LOD suffix (`_VL`, `_L`, `_M`, `_H`).
pub fn raw_object_name(mesh_name: &str) -> String {
    mesh_name
        .to_uppercase()
        .replace("_VL", "")
        .replace("_L", "")
        .replace("_M", "")
        .replace("_H", "")
}

/// Whether a raw object name belongs to the articulated-part set.
pub fn is_matrix_object(raw_name: &str) -> bool {
    MATRIX_OBJECTS.contains(&raw_name)
}

/// Decode 48 bytes of `.mtx` payload for the named object.
pub fn decode_placement(raw_name: &str, payload: &[u8]) -> Result<Placement> {
    let mut cursor = Cursor::new(payload);
    if is_matrix_object(raw_name) {
        Ok(Placement::Matrix(cursor.read_matrix3x4()?))
    } else {
        Ok(Placement::Bound {
            min: vec3_to_scene(cursor.read_vec3()?),
            max: vec3_to_scene(cursor.read_vec3()?),
            pivot: vec3_to_scene(cursor.read_vec3()?),
            origin: vec3_to_scene(cursor.read_vec3()?),
        })
    }
}

/// Encode a placement back into the 48-byte payload.
pub fn encode_placement(placement: &Placement) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(48);
    match *placement {
        Placement::Matrix(m) => buf.write_matrix3x4(m)?,
        Placement::Bound {
            min,
            max,
            pivot,
            origin,
        } => {
            buf.write_vec3(vec3_to_file(min))?;
            buf.write_vec3(vec3_to_file(max))?;
            buf.write_vec3(vec3_to_file(pivot))?;
            buf.write_vec3(vec3_to_file(origin))?;
        }
    }
    Ok(buf)
}

/// Load and decode the `.mtx` side file at `path` for `mesh_name`.
///
/// # Errors
///
/// Returns [`Error::InvalidMtxSize`] if the file is not exactly 48 bytes.
pub fn load_mtx(path: &Path, mesh_name: &str) -> Result<Placement> {
    let payload = fs::read(path)?;
    if payload.len() != 48 {
        return Err(Error::InvalidMtxSize {
            path: path.to_owned(),
            len: payload.len() as u64,
        });
    }
    debug!(path = %path.display(), mesh = mesh_name, "loaded mtx side file");
    decode_placement(&raw_object_name(mesh_name), &payload)
}

/// Encode and write a `.mtx` side file.
pub fn save_mtx(path: &Path, placement: &Placement) -> Result<()> {
    fs::write(path, encode_placement(placement)?)?;
    Ok(())
}
