//! Factory functions for creating test meshes.

use mesh_model::{Face, Mesh, MeshId, MeshRecord};

/// x coordinate of the triangle [`oversized_mesh`] places past the traversal caps.
pub const OVERSIZED_FAR_X: f32 = 1000.0;

fn mesh(id: MeshId, vertices: Vec<[f32; 3]>, faces: Vec<Face>, color: [f32; 3]) -> Mesh {
    Mesh::from_record(
        id,
        MeshRecord {
            vertices,
            normals: vec![],
            faces,
            diffuse_color: color,
        },
    )
}

/// Right triangle in the XY plane, facing +Z.
pub fn triangle_mesh(id: MeshId) -> Mesh {
    mesh(
        id,
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        vec![Face::new(vec![0, 1, 2])],
        [1.0, 0.0, 0.0],
    )
}

/// Unit square as a single four-vertex face, facing +Z.
pub fn quad_mesh(id: MeshId) -> Mesh {
    mesh(
        id,
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        vec![Face::new(vec![0, 1, 2, 3])],
        [0.0, 1.0, 0.0],
    )
}

/// Unit cube centered at the origin: 8 shared vertices, 6 outward quads.
pub fn cube_mesh(id: MeshId) -> Mesh {
    let vertices = vec![
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
    ];
    let faces = [
        [4, 5, 6, 7], // +Z
        [1, 0, 3, 2], // -Z
        [5, 1, 2, 6], // +X
        [0, 4, 7, 3], // -X
        [7, 6, 2, 3], // +Y
        [0, 1, 5, 4], // -Y
    ]
    .into_iter()
    .map(|f| Face::new(f.to_vec()))
    .collect();
    mesh(id, vertices, faces, [0.2, 0.4, 0.8])
}

/// Thousands of small disjoint triangles near the origin, then one far away
/// at [`OVERSIZED_FAR_X`] that a capped bounding box walk never reaches.
pub fn oversized_mesh(id: MeshId) -> Mesh {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();
    for i in 0..4_000 {
        let x = (i % 100) as f32 * 0.01;
        let y = (i / 100) as f32 * 0.01;
        let base = vertices.len();
        vertices.extend_from_slice(&[[x, y, 0.0], [x + 0.005, y, 0.0], [x, y + 0.005, 0.0]]);
        faces.push(Face::new(vec![base, base + 1, base + 2]));
    }
    let base = vertices.len();
    vertices.extend_from_slice(&[
        [OVERSIZED_FAR_X, 0.0, 0.0],
        [OVERSIZED_FAR_X + 1.0, 0.0, 0.0],
        [OVERSIZED_FAR_X, 1.0, 0.0],
    ]);
    faces.push(Face::new(vec![base, base + 1, base + 2]));
    mesh(id, vertices, faces, [0.5, 0.5, 0.5])
}

/// OBJ text with two materials: a red triangle and a blue quad.
pub const TWO_MATERIAL_OBJ: &str = "\
mtllib scene.mtl
v 0 0 0
v 1 0 0
v 0 1 0
v 2 0 0
v 3 0 0
v 3 1 0
v 2 1 0
usemtl red
f 1 2 3
usemtl blue
f 4 5 6 7
";

pub const TWO_MATERIAL_MTL: &str = "\
newmtl red
Kd 1 0 0
newmtl blue
Kd 0 0 1
";
