use egui::Ui;

use crate::state::Scene;

pub fn show(ui: &mut Ui, scene: &Scene, status: Option<&str>) {
    ui.horizontal(|ui| {
        ui.weak(format!("Meshes: {}", scene.meshes.len()));
        ui.separator();
        ui.weak(format!("Triangles: {}", scene.triangle_count()));
        ui.separator();

        match scene.selected() {
            Some(id) => ui.label(format!("Selected: mesh {id}")),
            None => ui.weak("Click a mesh to select it"),
        };

        if let Some(status) = status {
            ui.separator();
            ui.weak(status);
        }

        // Right-aligned version
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.weak(concat!("meshview v", env!("CARGO_PKG_VERSION")));
        });
    });
}
