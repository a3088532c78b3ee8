//! Scene state management
//!
//! The flat list of meshes the viewer shows, plus the current selection.

mod mesh_ops;
mod transform_ops;

use mesh_model::{Mesh, MeshId};

/// Meshes and selection. Ids are assigned sequentially from 1.
pub struct Scene {
    pub meshes: Vec<Mesh>,
    selected: Option<MeshId>,
    next_id: MeshId,
    /// Monotonically increasing version counter, bumped on every mutation
    version: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            meshes: Vec::new(),
            selected: None,
            next_id: 1,
            version: 0,
        }
    }
}

impl Scene {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Get a mesh by ID
    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.id == id)
    }

    /// Get mutable mesh by ID
    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.version += 1;
        self.meshes.iter_mut().find(|m| m.id == id)
    }

    pub fn selected(&self) -> Option<MeshId> {
        self.selected
    }

    pub fn selected_mesh(&self) -> Option<&Mesh> {
        self.selected.and_then(|id| self.mesh(id))
    }

    /// Select a mesh; ids not in the scene clear the selection.
    pub fn select(&mut self, id: Option<MeshId>) {
        self.selected = id.filter(|&id| self.mesh(id).is_some());
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }
}
