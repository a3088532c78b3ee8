//! Adding and removing meshes

use mesh_model::obj::Normalization;
use mesh_model::{Mesh, MeshId, MeshRecord, Scale};

use super::Scene;

impl Scene {
    /// Add one mesh built from a parser record and return its id.
    pub fn add_record(&mut self, record: MeshRecord) -> MeshId {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.meshes.push(Mesh::from_record(id, record));
        self.version += 1;
        id
    }

    /// Add every record of one file, sharing a fit-to-view normalization and a
    /// world placement.
    pub fn import(
        &mut self,
        records: Vec<MeshRecord>,
        normalization: Option<Normalization>,
        placement: [f32; 3],
    ) -> Vec<MeshId> {
        let ids: Vec<MeshId> = records.into_iter().map(|r| self.add_record(r)).collect();
        for id in &ids {
            if let Some(mesh) = self.meshes.iter_mut().find(|m| m.id == *id) {
                if let Some(n) = normalization {
                    mesh.center = n.center;
                    mesh.scale = Scale::Uniform(n.scale);
                }
                mesh.translate = placement;
                mesh.sanitize_transform();
            }
        }
        tracing::info!("imported {} meshes", ids.len());
        ids
    }

    /// Remove a mesh, clearing the selection if it was selected.
    pub fn remove(&mut self, id: MeshId) -> bool {
        let before = self.meshes.len();
        self.meshes.retain(|m| m.id != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        let removed = self.meshes.len() != before;
        if removed {
            self.version += 1;
        }
        removed
    }

    /// Drop every mesh and restart id assignment at 1.
    pub fn clear(&mut self) {
        self.meshes.clear();
        self.selected = None;
        self.next_id = 1;
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_model::Face;

    fn record() -> MeshRecord {
        MeshRecord {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![],
            faces: vec![Face::new(vec![0, 1, 2])],
            diffuse_color: [0.5, 0.5, 0.5],
        }
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut scene = Scene::default();
        let ids = scene.import(vec![record(), record(), record()], None, [0.0; 3]);
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_import_applies_normalization_and_placement() {
        let mut scene = Scene::default();
        let n = Normalization {
            center: [0.5, 0.5, 0.0],
            scale: 2.0,
        };
        let ids = scene.import(vec![record()], Some(n), [0.0, 0.0, -3.0]);
        let mesh = scene.mesh(ids[0]).unwrap();
        assert_eq!(mesh.center, [0.5, 0.5, 0.0]);
        assert_eq!(mesh.scale, Scale::Uniform(2.0));
        assert_eq!(mesh.translate, [0.0, 0.0, -3.0]);
    }

    #[test]
    fn test_remove_clears_selection() {
        let mut scene = Scene::default();
        let id = scene.add_record(record());
        scene.select(Some(id));
        assert!(scene.remove(id));
        assert_eq!(scene.selected(), None);
        assert!(!scene.remove(id));
    }

    #[test]
    fn test_clear_restarts_ids() {
        let mut scene = Scene::default();
        scene.add_record(record());
        scene.add_record(record());
        scene.clear();
        assert!(scene.is_empty());
        assert_eq!(scene.add_record(record()), 1);
    }

    #[test]
    fn test_select_unknown_id_clears() {
        let mut scene = Scene::default();
        let id = scene.add_record(record());
        scene.select(Some(id));
        scene.select(Some(99));
        assert_eq!(scene.selected(), None);
    }
}
