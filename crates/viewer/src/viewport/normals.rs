//! Smooth and flat normal computation for meshes without usable file normals.

use glam::Vec3;
use mesh_model::Face;

/// Unit normal of triangle `abc`, counter-clockwise winding; `+Z` when degenerate.
pub fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).try_normalize().unwrap_or(Vec3::Z)
}

/// Averaged per-vertex normals over the fan triangulation of every face.
///
/// A vertex touched by no face (or whose contributions cancel out) gets the
/// zero vector; overlay code skips those.
pub fn compute_per_vertex_normals(vertices: &[[f32; 3]], faces: &[Face]) -> Vec<Vec3> {
    let mut sums = vec![Vec3::ZERO; vertices.len()];

    for face in faces {
        for [a, b, c] in face.triangles() {
            let (Some(&pa), Some(&pb), Some(&pc)) = (vertices.get(a), vertices.get(b), vertices.get(c)) else {
                continue;
            };
            let n = face_normal(pa.into(), pb.into(), pc.into());
            sums[a] += n;
            sums[b] += n;
            sums[c] += n;
        }
    }

    sums.into_iter().map(Vec3::normalize_or_zero).collect()
}

/// One normal per face, from its first three vertices.
pub fn compute_flat_normals(vertices: &[[f32; 3]], faces: &[Face]) -> Vec<Vec3> {
    faces
        .iter()
        .map(|face| {
            let corner = |i: usize| face.v.get(i).and_then(|&vi| vertices.get(vi)).copied().map(Vec3::from);
            match (corner(0), corner(1), corner(2)) {
                (Some(a), Some(b), Some(c)) => face_normal(a, b, c),
                _ => Vec3::Z,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_triangle_vertex_normals_match_face_normal() {
        let vertices = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let faces = [Face::new(vec![0, 1, 2])];
        let normals = compute_per_vertex_normals(&vertices, &faces);
        let expected = face_normal(vertices[0].into(), vertices[1].into(), vertices[2].into());
        assert_eq!(expected, Vec3::Z);
        for n in normals {
            assert!((n - expected).length() < 1e-6);
        }
    }

    #[test]
    fn test_degenerate_face_falls_back_to_z() {
        let n = face_normal(Vec3::ZERO, Vec3::X, Vec3::X * 2.0);
        assert_eq!(n, Vec3::Z);
    }

    #[test]
    fn test_shared_vertex_is_averaged() {
        // two faces folded at a right angle along the X axis
        let vertices = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let faces = [Face::new(vec![0, 1, 2]), Face::new(vec![0, 3, 1])];
        let normals = compute_per_vertex_normals(&vertices, &faces);
        let expected = Vec3::new(0.0, 1.0, 1.0).normalize();
        assert!((normals[0] - expected).length() < 1e-6);
        assert!((normals[2] - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_unreferenced_vertex_gets_zero() {
        let vertices = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [4.0, 4.0, 4.0]];
        let faces = [Face::new(vec![0, 1, 2])];
        let normals = compute_per_vertex_normals(&vertices, &faces);
        assert_eq!(normals[3], Vec3::ZERO);
    }

    #[test]
    fn test_flat_normals_one_per_face() {
        let vertices = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        let faces = [Face::new(vec![0, 1, 2, 3]), Face::new(vec![0, 3, 2])];
        let normals = compute_flat_normals(&vertices, &faces);
        assert_eq!(normals, vec![Vec3::Z, Vec3::NEG_Z]);
    }
}
