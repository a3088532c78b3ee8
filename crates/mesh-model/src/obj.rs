//! OBJ/MTL text parsing and material splitting.
//!
//! This is the parser collaborator of the viewer: it turns geometry and material
//! text into one [`MeshRecord`] per material group.

use std::collections::HashMap;

use crate::{Face, MeshRecord, DEFAULT_COLOR};

/// Errors raised while parsing OBJ or MTL text. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjError {
    /// A numeric token could not be parsed
    InvalidNumber { line: usize, token: String },
    /// A statement has fewer components than it needs
    MissingComponent { line: usize, keyword: String },
    /// A face index is zero or unparsable
    InvalidIndex { line: usize, token: String },
}

impl std::fmt::Display for ObjError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjError::InvalidNumber { line, token } => {
                write!(f, "line {}: invalid number '{}'", line, token)
            }
            ObjError::MissingComponent { line, keyword } => {
                write!(f, "line {}: '{}' statement is missing components", line, keyword)
            }
            ObjError::InvalidIndex { line, token } => {
                write!(f, "line {}: invalid face index '{}'", line, token)
            }
        }
    }
}

impl std::error::Error for ObjError {}

/// One `f` statement with its active material.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjFace {
    pub v: Vec<usize>,
    pub n: Option<Vec<usize>>,
    pub material: Option<String>,
}

/// Raw OBJ contents, indices already resolved to 0-based absolute values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjData {
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub faces: Vec<ObjFace>,
    pub mtllib: Option<String>,
}

/// MTL material. Only `kd` is used for rendering; the rest is kept for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub kd: [f32; 3],
    pub ka: Option<[f32; 3]>,
    pub ks: Option<[f32; 3]>,
    pub ke: Option<[f32; 3]>,
    pub ns: Option<f32>,
    pub d: Option<f32>,
    pub illum: Option<u32>,
    pub ni: Option<f32>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            kd: DEFAULT_COLOR,
            ka: None,
            ks: None,
            ke: None,
            ns: None,
            d: None,
            illum: None,
            ni: None,
        }
    }
}

/// Center and uniform scale that fit the whole object into a unit cube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub center: [f32; 3],
    pub scale: f32,
}

/// Parse OBJ text.
pub fn parse_obj(text: &str) -> Result<ObjData, ObjError> {
    let mut data = ObjData::default();
    let mut material: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let mut parts = raw.split_whitespace();
        let Some(keyword) = parts.next() else { continue };
        let rest: Vec<&str> = parts.collect();

        match keyword {
            "v" => data.vertices.push(parse_vec3(&rest, line, keyword)?),
            "vn" => data.normals.push(parse_vec3(&rest, line, keyword)?),
            "f" => {
                if rest.len() < 3 {
                    return Err(ObjError::MissingComponent {
                        line,
                        keyword: keyword.to_string(),
                    });
                }
                let mut v = Vec::with_capacity(rest.len());
                let mut n = Vec::with_capacity(rest.len());
                let mut all_normals = true;
                for token in &rest {
                    let mut comps = token.split('/');
                    let vi = comps.next().unwrap_or("");
                    v.push(resolve_index(vi, data.vertices.len(), line, token)?);
                    let _texcoord = comps.next();
                    match comps.next().filter(|s| !s.is_empty()) {
                        Some(ni) => n.push(resolve_index(ni, data.normals.len(), line, token)?),
                        None => all_normals = false,
                    }
                }
                data.faces.push(ObjFace {
                    v,
                    n: all_normals.then_some(n),
                    material: material.clone(),
                });
            }
            "usemtl" => material = rest.first().map(|s| s.to_string()),
            "mtllib" => {
                if !rest.is_empty() {
                    data.mtllib = Some(rest.join(" "));
                }
            }
            _ => {}
        }
    }

    Ok(data)
}

/// Parse MTL text into materials keyed by name.
pub fn parse_mtl(text: &str) -> Result<HashMap<String, Material>, ObjError> {
    let mut materials = HashMap::new();
    let mut current: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let mut parts = raw.split_whitespace();
        let Some(keyword) = parts.next() else { continue };
        let rest: Vec<&str> = parts.collect();

        if keyword == "newmtl" {
            if let Some(name) = rest.first() {
                materials.insert(name.to_string(), Material::default());
                current = Some(name.to_string());
            }
            continue;
        }

        let Some(mat) = current.as_ref().and_then(|name| materials.get_mut(name)) else {
            continue;
        };

        match keyword {
            "Kd" => mat.kd = parse_vec3(&rest, line, keyword)?,
            "Ka" => mat.ka = Some(parse_vec3(&rest, line, keyword)?),
            "Ks" => mat.ks = Some(parse_vec3(&rest, line, keyword)?),
            "Ke" => mat.ke = Some(parse_vec3(&rest, line, keyword)?),
            "Ns" => mat.ns = Some(parse_scalar(&rest, line, keyword)?),
            "d" => mat.d = Some(parse_scalar(&rest, line, keyword)?),
            "Ni" => mat.ni = Some(parse_scalar(&rest, line, keyword)?),
            "illum" => {
                let token = first_token(&rest, line, keyword)?;
                mat.illum = Some(token.parse().map_err(|_| ObjError::InvalidNumber {
                    line,
                    token: token.to_string(),
                })?);
            }
            _ => {}
        }
    }

    Ok(materials)
}

/// Split faces by material (in first-use order) into self-contained records.
///
/// Each record gets a compacted vertex list holding only the vertices its faces
/// reference, with indices remapped accordingly. File normals are carried along
/// the same way so faces that had them keep them.
///
/// A face pointing past the end of the vertex list is dropped, and a normal
/// list pointing past the end of the normals is dropped from its face.
pub fn assign_materials(obj: &ObjData, materials: &HashMap<String, Material>) -> Vec<MeshRecord> {
    let mut order: Vec<Option<&str>> = Vec::new();
    let mut groups: HashMap<Option<&str>, Vec<&ObjFace>> = HashMap::new();
    let resolved = |indices: &[usize], len: usize| indices.iter().all(|&i| i < len);
    for face in obj.faces.iter().filter(|f| resolved(&f.v, obj.vertices.len())) {
        let key = face.material.as_deref();
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(face);
    }

    order
        .into_iter()
        .map(|key| {
            let faces = &groups[&key];
            let mut vert_map: HashMap<usize, usize> = HashMap::new();
            let mut norm_map: HashMap<usize, usize> = HashMap::new();
            let mut record = MeshRecord {
                diffuse_color: key
                    .and_then(|name| materials.get(name))
                    .map(|m| m.kd)
                    .unwrap_or(DEFAULT_COLOR),
                ..Default::default()
            };

            for face in faces {
                let v = face
                    .v
                    .iter()
                    .map(|&orig| remap(orig, &mut vert_map, &mut record.vertices, obj.vertices[orig]))
                    .collect();
                let n = face
                    .n
                    .as_ref()
                    .filter(|n| resolved(n, obj.normals.len()))
                    .map(|n| {
                        n.iter()
                            .map(|&orig| remap(orig, &mut norm_map, &mut record.normals, obj.normals[orig]))
                            .collect()
                    });
                record.faces.push(Face { v, n });
            }

            record
        })
        .collect()
}

/// Center and scale that fit all OBJ vertices into a unit cube at the origin.
pub fn normalize(obj: &ObjData) -> Normalization {
    if obj.vertices.is_empty() {
        return Normalization {
            center: [0.0; 3],
            scale: 1.0,
        };
    }

    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for v in &obj.vertices {
        for axis in 0..3 {
            min[axis] = min[axis].min(v[axis]);
            max[axis] = max[axis].max(v[axis]);
        }
    }

    let center = [
        (min[0] + max[0]) * 0.5,
        (min[1] + max[1]) * 0.5,
        (min[2] + max[2]) * 0.5,
    ];
    let max_size = (max[0] - min[0])
        .max(max[1] - min[1])
        .max(max[2] - min[2])
        .max(0.001);

    Normalization {
        center,
        scale: 1.0 / max_size,
    }
}

// ── Helpers ──────────────────────────────────────────────────

fn remap(orig: usize, map: &mut HashMap<usize, usize>, out: &mut Vec<[f32; 3]>, value: [f32; 3]) -> usize {
    *map.entry(orig).or_insert_with(|| {
        out.push(value);
        out.len() - 1
    })
}

fn first_token<'a>(rest: &[&'a str], line: usize, keyword: &str) -> Result<&'a str, ObjError> {
    rest.first().copied().ok_or_else(|| ObjError::MissingComponent {
        line,
        keyword: keyword.to_string(),
    })
}

fn parse_scalar(rest: &[&str], line: usize, keyword: &str) -> Result<f32, ObjError> {
    let token = first_token(rest, line, keyword)?;
    token.parse().map_err(|_| ObjError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

fn parse_vec3(rest: &[&str], line: usize, keyword: &str) -> Result<[f32; 3], ObjError> {
    if rest.len() < 3 {
        return Err(ObjError::MissingComponent {
            line,
            keyword: keyword.to_string(),
        });
    }
    let mut out = [0.0; 3];
    for (slot, token) in out.iter_mut().zip(rest) {
        *slot = token.parse().map_err(|_| ObjError::InvalidNumber {
            line,
            token: token.to_string(),
        })?;
    }
    Ok(out)
}

/// Resolve a 1-based (or negative, relative) OBJ index against the current count.
fn resolve_index(text: &str, count: usize, line: usize, token: &str) -> Result<usize, ObjError> {
    let err = || ObjError::InvalidIndex {
        line,
        token: token.to_string(),
    };
    let raw: i64 = text.parse().map_err(|_| err())?;
    match raw {
        0 => Err(err()),
        r if r > 0 => Ok((r - 1) as usize),
        r => {
            let back = r.unsigned_abs() as usize;
            count.checked_sub(back).ok_or_else(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_MATERIALS: &str = "\
mtllib scene.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 5 5 5
vn 0 0 1
usemtl red
f 1//1 2//1 3//1
usemtl blue
f 1 3 4
usemtl red
f 3//1 4//1 1//1
";

    const MTL: &str = "\
# materials
newmtl red
Kd 1 0 0
Ns 10
illum 2
newmtl blue
Kd 0 0 1
d 0.5
";

    #[test]
    fn test_parse_obj_counts() {
        let obj = parse_obj(TWO_MATERIALS).unwrap();
        assert_eq!(obj.vertices.len(), 5);
        assert_eq!(obj.normals.len(), 1);
        assert_eq!(obj.faces.len(), 3);
        assert_eq!(obj.mtllib.as_deref(), Some("scene.mtl"));
        assert_eq!(obj.faces[0].n, Some(vec![0, 0, 0]));
        assert_eq!(obj.faces[1].n, None);
        assert_eq!(obj.faces[1].material.as_deref(), Some("blue"));
    }

    #[test]
    fn test_parse_obj_slash_forms_and_negative_indices() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3/1 -2/2 -1/3\nf 1/1/1 2/2/1 3/3/1\n";
        let obj = parse_obj(text).unwrap();
        assert_eq!(obj.faces[0].v, vec![0, 1, 2]);
        assert_eq!(obj.faces[0].n, None);
        assert_eq!(obj.faces[1].n, Some(vec![0, 0, 0]));
    }

    #[test]
    fn test_parse_obj_rejects_zero_index() {
        let err = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n").unwrap_err();
        assert!(matches!(err, ObjError::InvalidIndex { line: 4, .. }));
    }

    #[test]
    fn test_parse_obj_rejects_bad_number() {
        let err = parse_obj("v 0 abc 0\n").unwrap_err();
        assert_eq!(
            err,
            ObjError::InvalidNumber {
                line: 1,
                token: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_parse_obj_ignores_comments_and_unknown() {
        let obj = parse_obj("# comment\no thing\ns off\nv 1 2 3 1.0\n").unwrap();
        assert_eq!(obj.vertices, vec![[1.0, 2.0, 3.0]]);
    }

    #[test]
    fn test_parse_mtl() {
        let mats = parse_mtl(MTL).unwrap();
        assert_eq!(mats["red"].kd, [1.0, 0.0, 0.0]);
        assert_eq!(mats["red"].ns, Some(10.0));
        assert_eq!(mats["red"].illum, Some(2));
        assert_eq!(mats["blue"].d, Some(0.5));
    }

    #[test]
    fn test_assign_materials_groups_in_first_use_order() {
        let obj = parse_obj(TWO_MATERIALS).unwrap();
        let mats = parse_mtl(MTL).unwrap();
        let records = assign_materials(&obj, &mats);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].diffuse_color, [1.0, 0.0, 0.0]);
        assert_eq!(records[0].faces.len(), 2);
        // vertices 1,2,3,4 referenced; vertex 5 never appears
        assert_eq!(records[0].vertices.len(), 4);
        assert_eq!(records[0].normals.len(), 1);
        assert_eq!(records[1].diffuse_color, [0.0, 0.0, 1.0]);
        assert_eq!(records[1].vertices.len(), 3);
        assert_eq!(records[1].faces[0].v, vec![0, 1, 2]);
    }

    #[test]
    fn test_assign_materials_drops_dangling_indices() {
        let face = |v: Vec<usize>, n: Option<Vec<usize>>| ObjFace {
            v,
            n,
            material: None,
        };
        let obj = ObjData {
            vertices: vec![[1.0, 1.0, 1.0], [2.0, 1.0, 1.0], [1.0, 2.0, 1.0]],
            normals: vec![[0.0, 0.0, 1.0]],
            faces: vec![
                face(vec![0, 1, 7], None),
                face(vec![0, 1, 2], Some(vec![0, 0, 4])),
            ],
            mtllib: None,
        };
        let records = assign_materials(&obj, &HashMap::new());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].faces.len(), 1);
        assert_eq!(records[0].faces[0].n, None);
        assert!(records[0].normals.is_empty());
        // no stand-in vertex at the origin
        assert_eq!(records[0].vertices, obj.vertices);
    }

    #[test]
    fn test_unknown_material_gets_default_color() {
        let obj = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl missing\nf 1 2 3\n").unwrap();
        let records = assign_materials(&obj, &HashMap::new());
        assert_eq!(records[0].diffuse_color, DEFAULT_COLOR);
    }

    #[test]
    fn test_normalize_fits_unit_cube() {
        let obj = parse_obj("v -2 0 0\nv 2 1 0\nv 0 0 1\n").unwrap();
        let n = normalize(&obj);
        assert_eq!(n.center, [0.0, 0.5, 0.5]);
        assert!((n.scale - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_empty_is_identity() {
        let n = normalize(&ObjData::default());
        assert_eq!(n.scale, 1.0);
    }
}
