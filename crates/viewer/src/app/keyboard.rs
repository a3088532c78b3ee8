//! Keyboard shortcut handling

use eframe::egui;

use crate::state::{Scene, ViewerSettings};
use crate::viewport::ViewportPanel;

/// Handle keyboard shortcuts for the application
pub fn handle_keyboard(
    ctx: &egui::Context,
    scene: &mut Scene,
    settings: &ViewerSettings,
    viewport: &ViewportPanel,
) {
    // Don't handle shortcuts when a text field is focused
    if ctx.memory(|m| m.focused().is_some()) {
        return;
    }

    ctx.input(|i| {
        // Ctrl+Z — undo the last scene rotation
        if i.modifiers.command && i.key_pressed(egui::Key::Z) && !viewport.undo_rotation() {
            tracing::debug!("Nothing to undo");
        }
        // R — reset the scene rotation
        if i.key_pressed(egui::Key::R) && !i.modifiers.command {
            viewport.reset_rotation();
        }
        // Escape — deselect
        if i.key_pressed(egui::Key::Escape) {
            scene.deselect();
        }
    });

    move_camera(ctx, settings, viewport);
}

/// W/S forward/back, A/D strafe, Q/E down/up, scaled by frame time.
fn move_camera(ctx: &egui::Context, settings: &ViewerSettings, viewport: &ViewportPanel) {
    let (forward, right, up, dt) = ctx.input(|i| {
        if i.modifiers.command {
            return (0.0, 0.0, 0.0, 0.0);
        }
        let axis = |pos: egui::Key, neg: egui::Key| {
            (i.key_down(pos) as i32 - i.key_down(neg) as i32) as f32
        };
        (
            axis(egui::Key::W, egui::Key::S),
            axis(egui::Key::D, egui::Key::A),
            axis(egui::Key::E, egui::Key::Q),
            i.stable_dt.min(0.1),
        )
    });
    if forward == 0.0 && right == 0.0 && up == 0.0 {
        return;
    }

    let step = settings.move_speed * dt;
    viewport.with_engine(|engine| {
        let camera = engine.camera_mut();
        camera.move_forward(forward * step);
        camera.strafe(right * step);
        camera.lift(up * step);
    });
    ctx.request_repaint();
}
