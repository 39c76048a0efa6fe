//! End-to-end archive round trips through the public API.

use angelpkg::prelude::*;
use glam::{Mat4, Vec2, Vec3, Vec4};
use pretty_assertions::assert_eq;

fn quad_mesh(name: &str, material: u32) -> Mesh {
    let corner = |vertex: u32, u: f32, v: f32| Corner {
        vertex,
        uv: Vec2::new(u, v),
        color: Vec4::ZERO,
    };
    Mesh {
        name: name.to_owned(),
        positions: vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ],
        normals: vec![Vec3::Z; 4],
        faces: vec![
            Face {
                corners: [corner(0, 0.0, 0.0), corner(1, 1.0, 0.0), corner(2, 0.0, 1.0)],
                material,
            },
            Face {
                corners: [corner(2, 0.0, 1.0), corner(1, 1.0, 0.0), corner(3, 1.0, 1.0)],
                material,
            },
        ],
        placement: None,
    }
}

fn vehicle_shaders() -> ShaderSet {
    let slot = |texture: Option<&str>, diffuse: Vec4| MaterialParams {
        texture: texture.map(str::to_owned),
        diffuse,
        ..MaterialParams::default()
    };
    let base = vec![
        slot(None, Vec4::new(1.0, 0.0, 0.0, 1.0)),
        slot(None, Vec4::new(0.2, 0.2, 0.2, 1.0)),
    ];
    let mut alt = base.clone();
    alt[0].diffuse = Vec4::new(0.0, 0.0, 1.0, 1.0);
    ShaderSet {
        color_mode: ColorMode::Byte,
        variants: vec![base, alt],
    }
}

#[test]
fn test_full_archive_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vpcop.pkg");

    let meshes = vec![quad_mesh("body_h", 0), quad_mesh("body_l", 1)];
    let shaders = vehicle_shaders();
    let xrefs = vec![Xref {
        name: "sp_driver_f".to_owned(),
        transform: Mat4::from_translation(Vec3::new(0.0, 0.5, 1.0)),
    }];
    let origin = Vec3::new(0.0, 0.0, 0.75);

    export_pkg(
        &path,
        &meshes,
        &shaders,
        &xrefs,
        origin,
        &ExportOptions::default(),
    )
    .unwrap();

    assert_eq!(PkgVersion::Pkg3, sniff_version(&path).unwrap());

    let result = import_pkg(&path).unwrap();
    assert_eq!(2, result.meshes.len());
    assert_eq!(Some(origin), result.origin);
    assert_eq!(xrefs, result.xrefs);

    for (expected, actual) in meshes.iter().zip(&result.meshes) {
        assert_eq!(expected.name, actual.name);
        assert_eq!(expected.positions, actual.positions);
        assert_eq!(expected.normals, actual.normals);
        assert_eq!(expected.faces.len(), actual.faces.len());
        for (ef, af) in expected.faces.iter().zip(&actual.faces) {
            for (ec, ac) in ef.corners.iter().zip(&af.corners) {
                assert_eq!(ec.uv, ac.uv);
            }
        }
    }

    // Both slots were used, so the table survives whole, variants intact.
    assert_eq!(2, result.shaders.slot_count());
    assert_eq!(2, result.shaders.variants.len());
    assert_eq!(
        Vec4::new(1.0, 0.0, 0.0, 1.0),
        result.shaders.variants[0][0].diffuse
    );
    assert_eq!(
        Vec4::new(0.0, 0.0, 1.0, 1.0),
        result.shaders.variants[1][0].diffuse
    );

    // The collapsed view keeps only the one record variant 1 changes.
    assert_eq!(1, result.variants.overrides.len());
    assert_eq!(1, result.variants.overrides[0].variant);
    assert_eq!(0, result.variants.overrides[0].slot);
}

#[test]
fn test_reexport_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.pkg");
    let second = dir.path().join("second.pkg");

    export_pkg(
        &first,
        &[quad_mesh("h", 0)],
        &vehicle_shaders(),
        &[],
        Vec3::ZERO,
        &ExportOptions::default(),
    )
    .unwrap();

    // Import and export again: the second generation must be byte-identical.
    let result = import_pkg(&first).unwrap();
    export_pkg(
        &second,
        &result.meshes,
        &result.shaders,
        &result.xrefs,
        result.origin.unwrap(),
        &ExportOptions::default(),
    )
    .unwrap();

    let a = std::fs::read(&first).unwrap();
    let b = std::fs::read(&second).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_variant_expansion_matches_import() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("variants.pkg");

    export_pkg(
        &path,
        &[quad_mesh("h", 0), quad_mesh("m", 1)],
        &vehicle_shaders(),
        &[],
        Vec3::ZERO,
        &ExportOptions::default(),
    )
    .unwrap();

    let result = import_pkg(&path).unwrap();
    let expanded = angelpkg::pkg::shaders::expand_variants(&result.variants, ColorMode::Byte);
    assert_eq!(result.shaders, expanded);
}
