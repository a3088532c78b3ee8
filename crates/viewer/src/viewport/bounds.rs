use std::collections::HashSet;

use glam::{Mat4, Vec3};
use mesh_model::Mesh;

use super::transform::model_matrix;

/// Faces visited per mesh before the traversal gives up.
pub const MAX_BBOX_FACES: usize = 10_000;
/// Distinct vertices visited per mesh before the traversal stops.
pub const MAX_BBOX_VERTICES: usize = 5_000;

/// Fraction of the largest dimension a displayed box is grown by.
pub const DISPLAY_EPSILON: f32 = 0.002;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const ZERO: Self = Self {
        min: Vec3::ZERO,
        max: Vec3::ZERO,
    };

    /// Unit box around the origin, the global box of an empty scene.
    pub const UNIT: Self = Self {
        min: Vec3::splat(-0.5),
        max: Vec3::splat(0.5),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box around a point set, or `None` if the set is empty.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::new(first, first), |b, p| Self::new(b.min.min(p), b.max.max(p))))
    }

    /// Center of the bounding box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn diagonal(&self) -> f32 {
        self.size().length()
    }

    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn contains(&self, p: Vec3, eps: f32) -> bool {
        p.cmpge(self.min - Vec3::splat(eps)).all() && p.cmple(self.max + Vec3::splat(eps)).all()
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(a.x, b.y, b.z),
        ]
    }

    /// Box around the 8 transformed corners, valid under rotation.
    pub fn transformed(&self, m: &Mat4) -> Self {
        let corners = self.corners().map(|c| m.transform_point3(c));
        Self::from_points(corners).unwrap_or(*self)
    }

    /// Grow by a fraction of the largest dimension.
    pub fn expanded(&self, fraction: f32) -> Self {
        let eps = Vec3::splat(self.size().max_element() * fraction);
        Self::new(self.min - eps, self.max + eps)
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

/// Box over the face-referenced vertices of `mesh`, in its local space.
///
/// Approximate for large meshes: at most [`MAX_BBOX_FACES`] faces are read and
/// the walk stops once [`MAX_BBOX_VERTICES`] distinct vertices were seen.
pub fn local_bounding_box(mesh: &Mesh) -> Aabb {
    let mut seen: HashSet<usize> = HashSet::new();
    let mut bounds: Option<Aabb> = None;

    for face in mesh.faces.iter().take(MAX_BBOX_FACES) {
        for &index in &face.v {
            if !seen.insert(index) {
                continue;
            }
            let Some(v) = mesh.vertices.get(index) else {
                continue;
            };
            let p = Vec3::from(*v);
            if !p.is_finite() {
                continue;
            }
            bounds = Some(match bounds {
                Some(b) => Aabb::new(b.min.min(p), b.max.max(p)),
                None => Aabb::new(p, p),
            });
        }
        if seen.len() >= MAX_BBOX_VERTICES {
            break;
        }
    }

    bounds.unwrap_or(Aabb::ZERO)
}

/// Local box mapped through the mesh's model matrix.
pub fn transformed_bounding_box(mesh: &Mesh) -> Aabb {
    local_bounding_box(mesh).transformed(&model_matrix(mesh))
}

/// Union of every non-empty mesh's transformed box; [`Aabb::UNIT`] when there is none.
pub fn global_bounding_box(meshes: &[Mesh]) -> Aabb {
    meshes
        .iter()
        .filter(|m| !m.is_empty())
        .map(transformed_bounding_box)
        .filter(Aabb::is_finite)
        .reduce(|a, b| a.union(&b))
        .unwrap_or(Aabb::UNIT)
}

/// Pivot of the global rotation and reference depth for drags.
pub fn global_centroid(meshes: &[Mesh]) -> Vec3 {
    global_bounding_box(meshes).center()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use mesh_model::{Face, MeshRecord, Scale};

    #[test]
    fn test_unreferenced_vertices_are_ignored() {
        let mesh = Mesh::from_record(
            1,
            MeshRecord {
                vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [50.0, 50.0, 50.0]],
                normals: vec![],
                faces: vec![Face::new(vec![0, 1, 2])],
                diffuse_color: [1.0; 3],
            },
        );
        let b = local_bounding_box(&mesh);
        assert_eq!(b.max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_empty_mesh_has_zero_box() {
        let mesh = Mesh::from_record(1, MeshRecord::default());
        assert_eq!(local_bounding_box(&mesh), Aabb::ZERO);
    }

    #[test]
    fn test_empty_scene_has_finite_unit_box() {
        let b = global_bounding_box(&[]);
        assert!(b.is_finite());
        assert_eq!(b, Aabb::UNIT);
        assert_eq!(global_centroid(&[]), Vec3::ZERO);
    }

    #[test]
    fn test_transformed_box_contains_every_vertex() {
        let mut mesh = fixtures::cube_mesh(1);
        mesh.center = [0.2, 0.1, 0.0];
        mesh.scale = Scale::PerAxis([2.0, 0.5, 1.5]);
        mesh.translate = [1.0, -2.0, -3.0];
        let model = model_matrix(&mesh);
        let b = transformed_bounding_box(&mesh);
        for v in &mesh.vertices {
            assert!(b.contains(model.transform_point3(Vec3::from(*v)), 1e-5));
        }
    }

    #[test]
    fn test_transformed_uses_all_corners_under_rotation() {
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let r = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_4);
        let t = b.transformed(&r);
        assert!((t.max.x - 2f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_global_box_is_union() {
        let a = fixtures::triangle_mesh(1);
        let mut b = fixtures::triangle_mesh(2);
        b.translate = [5.0, 0.0, 0.0];
        let g = global_bounding_box(&[a, b]);
        assert_eq!(g.min, Vec3::ZERO);
        assert_eq!(g.max, Vec3::new(6.0, 1.0, 0.0));
    }

    #[test]
    fn test_traversal_caps_bound_the_walk() {
        let mesh = fixtures::oversized_mesh(1);
        let b = local_bounding_box(&mesh);
        // the far vertices live past the vertex cap
        assert!(b.max.x < fixtures::OVERSIZED_FAR_X);
        assert!(b.is_finite());
    }

    #[test]
    fn test_expanded_by_largest_dimension() {
        let b = Aabb::new(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0)).expanded(DISPLAY_EPSILON);
        assert!((b.min.y + 0.02).abs() < 1e-6);
    }
}
