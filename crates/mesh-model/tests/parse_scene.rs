//! End-to-end parse of an OBJ/MTL pair into meshes.

use mesh_model::obj::{assign_materials, normalize, parse_mtl, parse_obj};
use mesh_model::{Mesh, DEFAULT_COLOR};

const CRATE_OBJ: &str = "\
# two-material crate, normals shared per side
mtllib crate.mtl
o crate
v -1 -1 1
v 1 -1 1
v 1 1 1
v -1 1 1
v -1 -1 -1
v 1 -1 -1
v 1 1 -1
v -1 1 -1
vt 0 0
vt 1 0
vt 1 1
vn 0 0 1
vn 0 0 -1
vn 0 1 0
g front_back
usemtl wood
f 1/1/1 2/2/1 3/3/1 4/3/1
f 6//2 5//2 8//2 7//2
usemtl metal
f 4//3 3//3 7//3 8//3
usemtl wood
s 1
f 5 6 2 1
usemtl missing
f -8 -4 -1
";

const CRATE_MTL: &str = "\
# materials
newmtl wood
Ka 0.1 0.1 0.1
Kd 0.6 0.4 0.2
Ks 0 0 0
Ns 10
illum 1

newmtl metal
Kd 0.8 0.8 0.85
Ks 1 1 1
Ns 200
d 1
illum 2
";

#[test]
fn test_crate_splits_into_material_meshes() {
    let data = parse_obj(CRATE_OBJ).unwrap();
    assert_eq!(data.vertices.len(), 8);
    assert_eq!(data.normals.len(), 3);
    assert_eq!(data.faces.len(), 5);
    assert_eq!(data.mtllib.as_deref(), Some("crate.mtl"));

    let materials = parse_mtl(CRATE_MTL).unwrap();
    assert_eq!(materials.len(), 2);
    assert_eq!(materials["metal"].illum, Some(2));

    let records = assign_materials(&data, &materials);
    // wood, metal, missing in first-use order
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].diffuse_color, [0.6, 0.4, 0.2]);
    assert_eq!(records[1].diffuse_color, [0.8, 0.8, 0.85]);
    assert_eq!(records[2].diffuse_color, DEFAULT_COLOR);

    // wood: three quads over all eight corners
    assert_eq!(records[0].faces.len(), 3);
    assert_eq!(records[0].vertices.len(), 8);
    // negative indices resolve against the vertices read so far
    assert_eq!(records[2].vertices, vec![[-1.0, -1.0, 1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0]]);
}

#[test]
fn test_crate_meshes_keep_file_normals_where_complete() {
    let data = parse_obj(CRATE_OBJ).unwrap();
    let records = assign_materials(&data, &parse_mtl(CRATE_MTL).unwrap());
    let meshes: Vec<Mesh> = records
        .into_iter()
        .enumerate()
        .map(|(i, r)| Mesh::from_record(i as u32 + 1, r))
        .collect();

    let wood = &meshes[0];
    assert!(wood.normals.is_some());
    assert!(wood.faces[0].n.is_some());
    assert!(wood.faces[1].n.is_some());
    // `f 5 6 2 1` carries no normals
    assert!(wood.faces[2].n.is_none());
    assert_eq!(wood.file_normal(&wood.faces[1], 0), Some([0.0, 0.0, -1.0]));

    let missing = &meshes[2];
    assert!(missing.normals.is_none());
    assert_eq!(missing.triangle_count(), 1);
}

#[test]
fn test_crate_normalization() {
    let data = parse_obj(CRATE_OBJ).unwrap();
    let n = normalize(&data);
    assert_eq!(n.center, [0.0, 0.0, 0.0]);
    assert_eq!(n.scale, 0.5);
}
