//! Pointer gestures over the viewport

use glam::Vec3;

use crate::state::{Scene, ViewerSettings};

use super::gl_renderer::RenderEngine;
use super::gpu::GlowGpu;
use super::rotation::GlobalRotation;
use super::transform::screen_to_world;

/// Which drag is in progress, so a gesture keeps its meaning until release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    /// Moving the selected mesh under the cursor
    MoveMesh,
    /// Rotating the whole scene
    Rotate,
    Look,
}

impl DragState {
    /// Apply this frame's pointer input. Returns the pixel (top-left origin,
    /// physical pixels) to pick at when the viewport was clicked.
    pub fn handle(
        &mut self,
        engine: &mut RenderEngine<GlowGpu>,
        response: &egui::Response,
        rect: egui::Rect,
        pixels_per_point: f32,
        scene: &mut Scene,
        settings: &ViewerSettings,
    ) -> Option<[f32; 2]> {
        let to_pixels = |pos: egui::Pos2| {
            let local = (pos - rect.min) * pixels_per_point;
            [local.x, local.y]
        };

        if response.clicked_by(egui::PointerButton::Primary) {
            return response.interact_pointer_pos().map(to_pixels);
        }

        if response.drag_started() {
            *self = if response.dragged_by(egui::PointerButton::Primary) && scene.selected().is_some() {
                DragState::MoveMesh
            } else if response.dragged_by(egui::PointerButton::Secondary) {
                // one undo step per rotation gesture
                engine.push_rotation();
                DragState::Rotate
            } else if response.dragged_by(egui::PointerButton::Middle) {
                DragState::Look
            } else {
                DragState::Idle
            };
        }

        if response.drag_stopped() {
            *self = DragState::Idle;
            return None;
        }

        let delta = response.drag_delta();
        if delta == egui::Vec2::ZERO {
            return None;
        }

        match *self {
            DragState::Idle => {}
            DragState::MoveMesh => {
                let Some(pos) = response.interact_pointer_pos() else {
                    return None;
                };
                let size = rect.size() * pixels_per_point;
                move_selected(engine, scene, to_pixels(pos - delta), to_pixels(pos), [size.x, size.y]);
            }
            DragState::Rotate => {
                let q = GlobalRotation::delta_from_drag(delta.x, delta.y, settings.rotation_sensitivity);
                engine.apply_rotation_delta(q);
            }
            DragState::Look => {
                engine.camera_mut().look(delta.x, delta.y, settings.look_sensitivity);
            }
        }
        None
    }
}

/// Shift the selected mesh by the world-space motion between two pixels on the
/// view plane through the scene centroid.
fn move_selected(engine: &RenderEngine<GlowGpu>, scene: &mut Scene, from: [f32; 2], to: [f32; 2], size: [f32; 2]) {
    let Some(id) = scene.selected() else {
        return;
    };
    let frame = engine.frame_transforms(&scene.meshes);
    let view_projection = frame.view_projection();
    let camera = engine.camera();
    let (Some(a), Some(b)) = (
        screen_to_world(camera, &view_projection, from, size, frame.pivot),
        screen_to_world(camera, &view_projection, to, size, frame.pivot),
    ) else {
        return;
    };
    let Some(anchor) = scene.mesh_anchor(id, &frame.global) else {
        return;
    };
    let target: Vec3 = anchor + (b - a);
    scene.place_mesh_at(id, &frame.global, target);
}
