//! Geometry model for the mesh viewer.
//!
//! Meshes are a flat list of sub-objects, one per material group. Every optional
//! field of the parser's output is resolved to an explicit default here, once,
//! so the rendering engine never re-derives defaults at its call sites.

pub mod obj;

use serde::{Deserialize, Serialize};

/// Stable mesh identifier, unique within a scene. `0` means "no mesh".
pub type MeshId = u32;

/// Largest id that survives the 24-bit pick color encoding.
pub const MAX_MESH_ID: MeshId = 0x00FF_FFFF;

/// Diffuse color used when a material is unknown or malformed.
pub const DEFAULT_COLOR: [f32; 3] = [0.7, 0.7, 0.7];

/// A polygon: vertex indices (at least three) with optional parallel normal indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub v: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<Vec<usize>>,
}

impl Face {
    pub fn new(v: Vec<usize>) -> Self {
        Self { v, n: None }
    }

    pub fn with_normals(v: Vec<usize>, n: Vec<usize>) -> Self {
        Self { v, n: Some(n) }
    }

    /// Fan triangulation as corner positions within this face: `[0, i, i + 1]`.
    pub fn fan_corners(&self) -> impl Iterator<Item = [usize; 3]> {
        (1..self.v.len().saturating_sub(1)).map(|i| [0, i, i + 1])
    }

    /// Fan triangulation as vertex indices.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.fan_corners()
            .map(move |[a, b, c]| [self.v[a], self.v[b], self.v[c]])
    }

    /// Normal index for a corner, if the face carries normal indices.
    pub fn normal_index(&self, corner: usize) -> Option<usize> {
        self.n.as_ref().and_then(|n| n.get(corner).copied())
    }
}

/// Uniform or per-axis scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scale {
    Uniform(f32),
    PerAxis([f32; 3]),
}

impl Scale {
    pub fn to_array(self) -> [f32; 3] {
        match self {
            Scale::Uniform(s) => [s, s, s],
            Scale::PerAxis(s) => s,
        }
    }

    fn sanitized(self) -> Self {
        let fix = |s: f32| if s.is_finite() { s } else { 1.0 };
        match self {
            Scale::Uniform(s) => Scale::Uniform(fix(s)),
            Scale::PerAxis([x, y, z]) => Scale::PerAxis([fix(x), fix(y), fix(z)]),
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Uniform(1.0)
    }
}

/// Mesh-construction record produced by the parser, one per material group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshRecord {
    pub vertices: Vec<[f32; 3]>,
    /// File normals referenced by `Face::n`; empty when the file has none.
    pub normals: Vec<[f32; 3]>,
    pub faces: Vec<Face>,
    pub diffuse_color: [f32; 3],
}

/// A renderable sub-object.
///
/// The model matrix is always `Translate(translate) * Scale(scale) * Translate(-center)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub id: MeshId,
    pub vertices: Vec<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<[f32; 3]>>,
    pub faces: Vec<Face>,
    pub color: [f32; 3],
    #[serde(default)]
    pub center: [f32; 3],
    #[serde(default)]
    pub scale: Scale,
    #[serde(default)]
    pub translate: [f32; 3],
}

impl Mesh {
    /// Build a mesh from a parser record.
    ///
    /// Faces with fewer than three vertices or out-of-range vertex indices are
    /// dropped. Normal indices are kept only when they are parallel to the vertex
    /// indices and in range; otherwise the face falls back to computed normals.
    pub fn from_record(id: MeshId, record: MeshRecord) -> Self {
        let MeshRecord {
            vertices,
            normals,
            faces,
            diffuse_color,
        } = record;

        let vertex_count = vertices.len();
        let normal_count = normals.len();

        let faces: Vec<Face> = faces
            .into_iter()
            .filter(|f| f.v.len() >= 3 && f.v.iter().all(|&i| i < vertex_count))
            .map(|mut f| {
                let keep_normals = f
                    .n
                    .as_ref()
                    .is_some_and(|n| n.len() == f.v.len() && n.iter().all(|&i| i < normal_count));
                if !keep_normals {
                    f.n = None;
                }
                f
            })
            .collect();

        let has_normals = faces.iter().any(|f| f.n.is_some());

        Self {
            id,
            vertices,
            normals: has_normals.then_some(normals),
            faces,
            color: sanitize_color(diffuse_color),
            center: [0.0; 3],
            scale: Scale::default(),
            translate: [0.0; 3],
        }
    }

    /// Replace any non-finite transform component with its identity default.
    pub fn sanitize_transform(&mut self) {
        let fix = |v: [f32; 3]| v.map(|c| if c.is_finite() { c } else { 0.0 });
        self.center = fix(self.center);
        self.translate = fix(self.translate);
        self.scale = self.scale.sanitized();
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(|f| f.v.len().saturating_sub(2)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// File normal for one face corner, if present.
    pub fn file_normal(&self, face: &Face, corner: usize) -> Option<[f32; 3]> {
        let normals = self.normals.as_ref()?;
        face.normal_index(corner).and_then(|i| normals.get(i).copied())
    }
}

fn sanitize_color(color: [f32; 3]) -> [f32; 3] {
    if color.iter().all(|c| c.is_finite()) {
        color.map(|c| c.clamp(0.0, 1.0))
    } else {
        DEFAULT_COLOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_record() -> MeshRecord {
        MeshRecord {
            vertices: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            normals: vec![],
            faces: vec![Face::new(vec![0, 1, 2, 3])],
            diffuse_color: [0.2, 0.4, 0.6],
        }
    }

    #[test]
    fn test_fan_triangulation_of_quad() {
        let face = Face::new(vec![0, 1, 2, 3]);
        let tris: Vec<_> = face.triangles().collect();
        assert_eq!(tris, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_degenerate_face_has_no_triangles() {
        let face = Face::new(vec![0, 1]);
        assert_eq!(face.triangles().count(), 0);
    }

    #[test]
    fn test_from_record_defaults() {
        let mesh = Mesh::from_record(1, quad_record());
        assert_eq!(mesh.id, 1);
        assert_eq!(mesh.center, [0.0; 3]);
        assert_eq!(mesh.translate, [0.0; 3]);
        assert_eq!(mesh.scale, Scale::Uniform(1.0));
        assert!(mesh.normals.is_none());
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_from_record_drops_invalid_faces() {
        let mut record = quad_record();
        record.faces.push(Face::new(vec![0, 1]));
        record.faces.push(Face::new(vec![0, 1, 9]));
        let mesh = Mesh::from_record(1, record);
        assert_eq!(mesh.faces.len(), 1);
    }

    #[test]
    fn test_from_record_drops_mismatched_normal_indices() {
        let mut record = quad_record();
        record.normals = vec![[0.0, 0.0, 1.0]];
        record.faces = vec![
            Face::with_normals(vec![0, 1, 2], vec![0, 0]),
            Face::with_normals(vec![0, 2, 3], vec![0, 0, 0]),
        ];
        let mesh = Mesh::from_record(3, record);
        assert!(mesh.faces[0].n.is_none());
        assert_eq!(mesh.faces[1].n, Some(vec![0, 0, 0]));
        assert_eq!(mesh.file_normal(&mesh.faces[1], 2), Some([0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_color_is_clamped_or_defaulted() {
        let mut record = quad_record();
        record.diffuse_color = [1.5, -0.2, 0.5];
        assert_eq!(Mesh::from_record(1, record.clone()).color, [1.0, 0.0, 0.5]);
        record.diffuse_color = [f32::NAN, 0.0, 0.0];
        assert_eq!(Mesh::from_record(1, record).color, DEFAULT_COLOR);
    }

    #[test]
    fn test_scale_deserializes_from_scalar_or_vector() {
        let s: Scale = serde_json::from_str("2.0").unwrap();
        assert_eq!(s.to_array(), [2.0, 2.0, 2.0]);
        let s: Scale = serde_json::from_str("[1.0, 2.0, 3.0]").unwrap();
        assert_eq!(s.to_array(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_missing_transform_fields_default_to_identity() {
        let json = r#"{"id":4,"vertices":[[0,0,0]],"faces":[],"color":[1,1,1]}"#;
        let mesh: Mesh = serde_json::from_str(json).unwrap();
        assert_eq!(mesh.scale, Scale::Uniform(1.0));
        assert_eq!(mesh.center, [0.0; 3]);
    }

    #[test]
    fn test_sanitize_transform() {
        let mut mesh = Mesh::from_record(1, quad_record());
        mesh.translate = [f32::NAN, 1.0, 2.0];
        mesh.scale = Scale::PerAxis([f32::INFINITY, 2.0, 1.0]);
        mesh.sanitize_transform();
        assert_eq!(mesh.translate, [0.0, 1.0, 2.0]);
        assert_eq!(mesh.scale, Scale::PerAxis([1.0, 2.0, 1.0]));
    }
}
