//! Menu bar

use std::path::PathBuf;

use eframe::egui;

use crate::state::ViewerSettings;

/// What a menu click asks the application to do
#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction {
    Open(PathBuf),
    Clear,
    ResetCamera,
    ResetRotation,
    ResetSettings,
}

/// Pick an OBJ file with the native dialog.
pub fn pick_obj_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Open OBJ")
        .add_filter("Wavefront OBJ", &["obj"])
        .pick_file()
}

/// Show the file menu
pub fn file_menu(ui: &mut egui::Ui) -> Option<MenuAction> {
    let mut action = None;
    ui.menu_button("File", |ui| {
        if ui.button("Open OBJ…").clicked() {
            ui.close_menu();
            action = pick_obj_file().map(MenuAction::Open);
        }
        if ui.button("Clear scene").clicked() {
            ui.close_menu();
            action = Some(MenuAction::Clear);
        }
        ui.separator();
        if ui.button("Quit").clicked() {
            ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
        }
    });
    action
}

/// Show the view menu
pub fn view_menu(ui: &mut egui::Ui, settings: &mut ViewerSettings) -> Option<MenuAction> {
    let mut action = None;
    ui.menu_button("View", |ui| {
        let features = &mut settings.features;
        ui.checkbox(&mut features.fill, "Fill");
        ui.checkbox(&mut features.wireframe, "Wireframe");
        ui.checkbox(&mut features.vertices, "Vertices");
        ui.checkbox(&mut features.normals, "Normals");
        ui.checkbox(&mut features.local_bbox, "Selection box");
        ui.checkbox(&mut features.global_bbox, "Scene box");
        ui.separator();
        if ui.button("Reset camera").clicked() {
            ui.close_menu();
            action = Some(MenuAction::ResetCamera);
        }
        if ui.button("Reset rotation").clicked() {
            ui.close_menu();
            action = Some(MenuAction::ResetRotation);
        }
        if ui.button("Reset settings").clicked() {
            ui.close_menu();
            action = Some(MenuAction::ResetSettings);
        }
    });
    action
}
