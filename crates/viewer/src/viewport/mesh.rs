//! CPU-side vertex data built from a [`Mesh`] every frame.

use std::collections::HashSet;

use glam::Vec3;
use mesh_model::Mesh;

use super::bounds::{transformed_bounding_box, Aabb};
use super::normals::{compute_flat_normals, compute_per_vertex_normals};
use super::transform::{model_matrix, normal_matrix};

/// Triangle soup: interleaved [pos.x, pos.y, pos.z, norm.x, norm.y, norm.z]
#[derive(Clone, Default)]
pub struct FillMeshData {
    /// 6 floats per vertex: position(3) + normal(3)
    pub vertices: Vec<f32>,
}

impl FillMeshData {
    pub const STRIDE: usize = 6;

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / Self::STRIDE
    }
}

/// Lines or points: interleaved [pos.x, pos.y, pos.z, r, g, b, a]
#[derive(Clone, Default)]
pub struct LineMeshData {
    /// 7 floats per vertex: position(3) + color(4)
    pub vertices: Vec<f32>,
}

impl LineMeshData {
    pub const STRIDE: usize = 7;

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / Self::STRIDE
    }

    fn push(&mut self, p: Vec3, color: [f32; 4]) {
        self.vertices.extend_from_slice(&[p.x, p.y, p.z]);
        self.vertices.extend_from_slice(&color);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shading {
    Smooth,
    Flat,
}

/// Fan-triangulated fill geometry in mesh-local space.
///
/// Smooth shading takes the file normal of each corner when the face has one and
/// the averaged vertex normal otherwise; flat shading uses one normal per face.
pub fn build_fill(mesh: &Mesh, shading: Shading) -> FillMeshData {
    let mut data = FillMeshData {
        vertices: Vec::with_capacity(mesh.triangle_count() * 3 * FillMeshData::STRIDE),
    };

    let flat = match shading {
        Shading::Flat => Some(compute_flat_normals(&mesh.vertices, &mesh.faces)),
        Shading::Smooth => None,
    };
    let needs_smooth = flat.is_none() && mesh.faces.iter().any(|f| f.n.is_none());
    let smooth = needs_smooth.then(|| compute_per_vertex_normals(&mesh.vertices, &mesh.faces));

    for (fi, face) in mesh.faces.iter().enumerate() {
        for corners in face.fan_corners() {
            // a dangling index drops the whole triangle so the stream stays in threes
            let Some(points) = corners
                .iter()
                .map(|&c| face.v.get(c).and_then(|&vi| mesh.vertices.get(vi)))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            for (corner, p) in corners.into_iter().zip(points) {
                let vi = face.v[corner];
                let n = match (&flat, &smooth) {
                    (Some(flat), _) => flat[fi],
                    (None, smooth) => mesh
                        .file_normal(face, corner)
                        .map(Vec3::from)
                        .or_else(|| smooth.as_ref().map(|s| s[vi]))
                        .unwrap_or(Vec3::Z),
                };
                data.vertices.extend_from_slice(p);
                data.vertices.extend_from_slice(&[n.x, n.y, n.z]);
            }
        }
    }

    data
}

/// Unique undirected edges of the fan triangulation, in first-seen order.
pub fn wireframe_edges(mesh: &Mesh) -> Vec<(usize, usize)> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for face in &mesh.faces {
        for [a, b, c] in face.triangles() {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                let key = (u.min(v), u.max(v));
                if seen.insert(key) {
                    edges.push(key);
                }
            }
        }
    }
    edges
}

/// Wireframe line segments in mesh-local space.
pub fn build_wireframe(mesh: &Mesh, color: [f32; 4]) -> LineMeshData {
    let mut data = LineMeshData::default();
    for (a, b) in wireframe_edges(mesh) {
        let (Some(&pa), Some(&pb)) = (mesh.vertices.get(a), mesh.vertices.get(b)) else {
            continue;
        };
        data.push(pa.into(), color);
        data.push(pb.into(), color);
    }
    data
}

/// One point per vertex, in mesh-local space.
pub fn build_points(mesh: &Mesh, color: [f32; 4]) -> LineMeshData {
    let mut data = LineMeshData::default();
    for &v in &mesh.vertices {
        data.push(v.into(), color);
    }
    data
}

/// Normal segments in scene space (already through the model matrix).
///
/// Segment length is `percent` of the transformed bounding box diagonal, so it
/// tracks the mesh's on-screen size. Vertices whose normal is zero are skipped.
pub fn build_normals(mesh: &Mesh, color: [f32; 4], percent: f32) -> LineMeshData {
    let mut data = LineMeshData::default();
    let length = percent * transformed_bounding_box(mesh).diagonal();
    if length <= 0.0 || !length.is_finite() {
        return data;
    }

    let model = model_matrix(mesh);
    let nmat = normal_matrix(&model);
    for (vi, n) in vertex_normals(mesh).into_iter().enumerate() {
        let Some(n) = (nmat * n).try_normalize() else {
            continue;
        };
        let p = model.transform_point3(Vec3::from(mesh.vertices[vi]));
        data.push(p, color);
        data.push(p + n * length, color);
    }
    data
}

/// One normal per vertex: the first file normal a face assigns to it, or the
/// averaged computed normal.
fn vertex_normals(mesh: &Mesh) -> Vec<Vec3> {
    let mut normals = compute_per_vertex_normals(&mesh.vertices, &mesh.faces);
    if mesh.normals.is_some() {
        let mut assigned = vec![false; normals.len()];
        for face in &mesh.faces {
            for (corner, &vi) in face.v.iter().enumerate() {
                if assigned.get(vi).copied().unwrap_or(true) {
                    continue;
                }
                if let Some(n) = mesh.file_normal(face, corner) {
                    normals[vi] = Vec3::from(n);
                    assigned[vi] = true;
                }
            }
        }
    }
    normals
}

/// 12 edges of a box as line segments.
pub fn box_lines(aabb: &Aabb, color: [f32; 4]) -> LineMeshData {
    const EDGES: [(usize, usize); 12] = [
        (0, 1), (1, 2), (2, 3), (3, 0),
        (4, 5), (5, 6), (6, 7), (7, 4),
        (0, 4), (1, 5), (2, 6), (3, 7),
    ];
    let corners = aabb.corners();
    let mut data = LineMeshData::default();
    for (a, b) in EDGES {
        data.push(corners[a], color);
        data.push(corners[b], color);
    }
    data
}

/// Two triangles covering clip space: [x, y, u, v] per vertex.
pub fn fullscreen_quad() -> Vec<f32> {
    vec![
        -1.0, -1.0, 0.0, 0.0,
        1.0, -1.0, 1.0, 0.0,
        1.0, 1.0, 1.0, 1.0,
        -1.0, -1.0, 0.0, 0.0,
        1.0, 1.0, 1.0, 1.0,
        -1.0, 1.0, 0.0, 1.0,
    ]
}
