//! Per-mesh edits

use glam::{Mat4, Vec3};
use mesh_model::{MeshId, Scale};

use super::Scene;
use crate::viewport::bounds::local_bounding_box;
use crate::viewport::transform::{local_to_world, translate_for_world_point};

impl Scene {
    pub fn set_color(&mut self, id: MeshId, color: [f32; 3]) {
        if let Some(mesh) = self.mesh_mut(id) {
            mesh.color = color.map(|c| if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 });
        }
    }

    pub fn set_translate(&mut self, id: MeshId, translate: [f32; 3]) {
        if let Some(mesh) = self.mesh_mut(id) {
            mesh.translate = translate;
            mesh.sanitize_transform();
        }
    }

    pub fn set_scale(&mut self, id: MeshId, scale: Scale) {
        if let Some(mesh) = self.mesh_mut(id) {
            mesh.scale = scale;
            mesh.sanitize_transform();
        }
    }

    /// World position of a mesh's local box center under the global transform.
    pub fn mesh_anchor(&self, id: MeshId, global: &Mat4) -> Option<Vec3> {
        let mesh = self.mesh(id)?;
        Some(local_to_world(mesh, global, local_bounding_box(mesh).center()))
    }

    /// Move a mesh so its local box center lands on `world`.
    pub fn place_mesh_at(&mut self, id: MeshId, global: &Mat4, world: Vec3) {
        if let Some(mesh) = self.mesh_mut(id) {
            let anchor = local_bounding_box(mesh).center();
            mesh.translate = translate_for_world_point(mesh, global, anchor, world);
            mesh.sanitize_transform();
        }
    }
}
